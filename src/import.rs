use anyhow::Context;
use serde::Serialize;

use crate::calc;

pub const MIN_IMPORT_GRADE: i64 = 3;
pub const MAX_IMPORT_GRADE: i64 = 12;

pub const ROSTER_TEMPLATE: &str = "districtId,firstName,lastName,dateOfBirth,grade,school,peTeacher,classroomTeacher,sex
STU001,John,Doe,2010-05-15,6,Central Elementary,Ms. Smith,,M
STU002,Jane,Smith,2009-08-22,7,Central Elementary,Mr. Johnson,,F
STU003,Bob,Johnson,2008-03-10,8,Lincoln Middle School,Ms. Garcia,,M
";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterRow {
    pub row: usize,
    pub district_id: String,
    pub first_name: String,
    pub last_name: String,
    /// Normalized `YYYY-MM-DD`.
    pub date_of_birth: String,
    pub grade: i64,
    pub school: String,
    pub pe_teacher: String,
    pub classroom_teacher: Option<String>,
    pub sex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowError {
    pub row: usize,
    pub district_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRoster {
    pub rows: Vec<RosterRow>,
    pub errors: Vec<RowError>,
}

struct Columns {
    district_id: Option<usize>,
    first_name: Option<usize>,
    last_name: Option<usize>,
    date_of_birth: Option<usize>,
    grade: Option<usize>,
    school: Option<usize>,
    pe_teacher: Option<usize>,
    classroom_teacher: Option<usize>,
    sex: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        Self {
            district_id: find("districtId"),
            first_name: find("firstName"),
            last_name: find("lastName"),
            date_of_birth: find("dateOfBirth"),
            grade: find("grade"),
            school: find("school"),
            pe_teacher: find("peTeacher"),
            classroom_teacher: find("classroomTeacher"),
            sex: find("sex"),
        }
    }
}

fn field(record: &csv::StringRecord, idx: Option<usize>) -> String {
    idx.and_then(|i| record.get(i))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

/// Leading integer of a grade cell, so `6` and `6th` both read as 6.
fn parse_grade(raw: &str) -> Option<i64> {
    let t = raw.trim();
    let sign_len = usize::from(t.starts_with('-'));
    let digits = t[sign_len..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    t[..sign_len + digits].parse().ok()
}

/// Parse roster CSV text. Row numbers count the header as row 1. Rows that
/// fail validation are reported and left out of `rows`.
pub fn parse_roster(text: &str) -> anyhow::Result<ParsedRoster> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader.headers().context("failed to read CSV header")?.clone();
    let cols = Columns::from_headers(&headers);

    let mut out = ParsedRoster::default();
    for (i, record) in reader.records().enumerate() {
        let row = i + 2;
        let record = record.with_context(|| format!("failed to read CSV row {}", row))?;

        let district_id = field(&record, cols.district_id);
        let first_name = field(&record, cols.first_name);
        let last_name = field(&record, cols.last_name);
        let date_of_birth = field(&record, cols.date_of_birth);
        let grade = field(&record, cols.grade);
        let school = field(&record, cols.school);
        let pe_teacher = field(&record, cols.pe_teacher);

        let reject = |district_id: &str, error: &str| RowError {
            row,
            district_id: district_id.to_string(),
            error: error.to_string(),
        };

        if [
            &district_id,
            &first_name,
            &last_name,
            &date_of_birth,
            &grade,
            &school,
            &pe_teacher,
        ]
        .iter()
        .any(|v| v.is_empty())
        {
            let id = if district_id.is_empty() {
                "MISSING"
            } else {
                district_id.as_str()
            };
            out.errors.push(reject(id, "Missing required field"));
            continue;
        }

        let Some(grade) = parse_grade(&grade).filter(|g| (MIN_IMPORT_GRADE..=MAX_IMPORT_GRADE).contains(g))
        else {
            out.errors
                .push(reject(&district_id, "Grade must be between 3 and 12"));
            continue;
        };

        let Some(dob) = calc::parse_date(&date_of_birth) else {
            out.errors
                .push(reject(&district_id, "Invalid date format (use YYYY-MM-DD)"));
            continue;
        };

        let optional = |idx: Option<usize>| Some(field(&record, idx)).filter(|s| !s.is_empty());
        out.rows.push(RosterRow {
            row,
            district_id,
            first_name,
            last_name,
            date_of_birth: dob.format("%Y-%m-%d").to_string(),
            grade,
            school,
            pe_teacher,
            classroom_teacher: optional(cols.classroom_teacher),
            sex: optional(cols.sex),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_parses_cleanly() {
        let parsed = parse_roster(ROSTER_TEMPLATE).expect("parse");
        assert_eq!(parsed.rows.len(), 3);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.rows[0].row, 2);
        assert_eq!(parsed.rows[0].sex.as_deref(), Some("M"));
        assert_eq!(parsed.rows[0].classroom_teacher, None);
    }

    #[test]
    fn row_errors_carry_row_numbers() {
        let text = "districtId,firstName,lastName,dateOfBirth,grade,school,peTeacher\n\
                    S1,Ana,Ng,2012-01-05,5,Oak,Ms. Lee\n\
                    ,Bo,Li,2012-01-05,5,Oak,Ms. Lee\n\
                    S3,Cy,Ro,2012-01-05,2,Oak,Ms. Lee\n\
                    S4,Di,Su,01/05/2012,5,Oak,Ms. Lee\n\
                    S5,Ed,Wu,2013-02-28,4th,Oak,Ms. Lee\n";
        let parsed = parse_roster(text).expect("parse");
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[1].grade, 4);
        assert_eq!(
            parsed.errors,
            vec![
                RowError {
                    row: 3,
                    district_id: "MISSING".into(),
                    error: "Missing required field".into()
                },
                RowError {
                    row: 4,
                    district_id: "S3".into(),
                    error: "Grade must be between 3 and 12".into()
                },
                RowError {
                    row: 5,
                    district_id: "S4".into(),
                    error: "Invalid date format (use YYYY-MM-DD)".into()
                },
            ]
        );
    }

    #[test]
    fn missing_column_reads_as_missing_field() {
        let text = "districtId,firstName,lastName,dateOfBirth,grade,school\nS1,Ana,Ng,2012-01-05,5,Oak\n";
        let parsed = parse_roster(text).expect("parse");
        assert!(parsed.rows.is_empty());
        assert_eq!(parsed.errors[0].error, "Missing required field");
    }

    #[test]
    fn grade_parsing_takes_leading_digits() {
        assert_eq!(parse_grade("12"), Some(12));
        assert_eq!(parse_grade("6th"), Some(6));
        assert_eq!(parse_grade("-1"), Some(-1));
        assert_eq!(parse_grade("K"), None);
    }
}
