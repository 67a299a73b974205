use crate::calc;
use crate::improvement::{self, CardioTestType, PacerReading, TestMeasurements};
use crate::ipc::error::AppError;
use crate::ipc::handlers::setup::load_assessment_settings;
use crate::ipc::handlers::students::load_student;
use crate::ipc::helpers::{db_conn, new_id, now_ts, reply, require_actor, Params};
use crate::ipc::types::{AppState, Request};
use crate::standards::StandardsTable;
use crate::zones::{self, Component};
use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Season {
    Fall,
    Spring,
}

impl Season {
    pub fn parse(raw: &str) -> Option<Season> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fall" => Some(Season::Fall),
            "spring" => Some(Season::Spring),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Fall => "Fall",
            Season::Spring => "Spring",
        }
    }
}

pub const TEST_COLUMNS: &str = "id, student_id, test_date, test_season, test_year, cardio_test_type, pacer_or_mile_run, pushups, situps, sit_and_reach, trunk_lift, height, weight, bmi, shoulder_stretch_left, shoulder_stretch_right, notes, school, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitnessTest {
    pub id: String,
    pub student_id: String,
    pub test_date: String,
    pub test_season: String,
    pub test_year: i64,
    pub cardio_test_type: String,
    pub pacer_or_mile_run: Option<f64>,
    pub pushups: Option<f64>,
    pub situps: Option<f64>,
    pub sit_and_reach: Option<f64>,
    pub trunk_lift: Option<f64>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub bmi: Option<f64>,
    pub shoulder_stretch_left: Option<bool>,
    pub shoulder_stretch_right: Option<bool>,
    pub notes: Option<String>,
    pub school: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl FitnessTest {
    /// Reads the columns in `TEST_COLUMNS` order.
    pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            student_id: row.get(1)?,
            test_date: row.get(2)?,
            test_season: row.get(3)?,
            test_year: row.get(4)?,
            cardio_test_type: row.get(5)?,
            pacer_or_mile_run: row.get(6)?,
            pushups: row.get(7)?,
            situps: row.get(8)?,
            sit_and_reach: row.get(9)?,
            trunk_lift: row.get(10)?,
            height: row.get(11)?,
            weight: row.get(12)?,
            bmi: row.get(13)?,
            shoulder_stretch_left: row.get::<_, Option<i64>>(14)?.map(|v| v != 0),
            shoulder_stretch_right: row.get::<_, Option<i64>>(15)?.map(|v| v != 0),
            notes: row.get(16)?,
            school: row.get(17)?,
            created_at: row.get(18)?,
            updated_at: row.get(19)?,
        })
    }

    pub fn cardio_type(&self) -> CardioTestType {
        CardioTestType::parse(&self.cardio_test_type).unwrap_or(CardioTestType::Pacer)
    }

    pub fn season(&self) -> Option<Season> {
        Season::parse(&self.test_season)
    }

    pub fn age(&self, date_of_birth: Option<&str>) -> Option<i32> {
        calc::age_from_strs(date_of_birth, Some(&self.test_date))
    }

    /// Stored BMI, or computed from height and weight.
    pub fn effective_bmi(&self) -> Option<f64> {
        self.bmi.or_else(|| calc::bmi(self.height, self.weight))
    }

    /// The five overall components. A mile time does not fill the PACER slot.
    pub fn measurements(&self) -> TestMeasurements {
        TestMeasurements {
            pacer: match self.cardio_type() {
                CardioTestType::Pacer => self.pacer_or_mile_run,
                CardioTestType::Mile => None,
            },
            pushups: self.pushups,
            situps: self.situps,
            sit_and_reach: self.sit_and_reach,
            trunk_lift: self.trunk_lift,
        }
    }

    pub fn pacer_reading(&self, date_of_birth: Option<&str>) -> PacerReading {
        PacerReading {
            cardio_type: self.cardio_type(),
            value: self.pacer_or_mile_run,
            age: self.age(date_of_birth),
        }
    }

    /// Zone for each component measured on this test, keyed by component.
    pub fn component_zones(
        &self,
        standards: &StandardsTable,
        age: Option<i32>,
        sex: Option<&str>,
    ) -> Map<String, Value> {
        let cardio = match self.cardio_type() {
            CardioTestType::Pacer => Component::Pacer,
            CardioTestType::Mile => Component::MileRun,
        };
        let entries = [
            (cardio, self.pacer_or_mile_run),
            (Component::Pushups, self.pushups),
            (Component::Situps, self.situps),
            (Component::SitAndReach, self.sit_and_reach),
            (Component::TrunkLift, self.trunk_lift),
            (Component::Bmi, self.effective_bmi()),
        ];
        entries
            .into_iter()
            .map(|(c, value)| {
                let zone = zones::classify(standards, c, value, age, sex);
                (
                    c.as_str().to_string(),
                    json!({ "value": value, "zone": zone, "label": zone.label() }),
                )
            })
            .collect()
    }
}

pub fn test_to_json(row: &rusqlite::Row<'_>) -> rusqlite::Result<Value> {
    let t = FitnessTest::from_row(row)?;
    Ok(serde_json::to_value(t).unwrap_or(Value::Null))
}

pub fn load_test(conn: &Connection, test_id: &str) -> Result<Option<FitnessTest>, AppError> {
    conn.query_row(
        &format!("SELECT {} FROM fitness_tests WHERE id = ?", TEST_COLUMNS),
        [test_id],
        FitnessTest::from_row,
    )
    .optional()
    .map_err(|e| AppError::db("db_query_failed", e))
}

fn handle_fitness_save(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    require_actor(req)?;
    let p = Params::new(&req.params);

    let student_id = p.req_str("studentId")?;
    let test_date_raw = p.req_str("testDate")?;
    let test_date = calc::parse_date(&test_date_raw)
        .ok_or_else(|| AppError::bad_params("testDate must be YYYY-MM-DD"))?
        .format("%Y-%m-%d")
        .to_string();
    let season_raw = p.req_str("testSeason")?;
    let season = Season::parse(&season_raw)
        .ok_or_else(|| AppError::bad_params("testSeason must be Fall or Spring"))?;
    let test_year = p
        .opt_i64("testYear")?
        .ok_or_else(|| AppError::bad_params("missing testYear"))?;
    let cardio = match p.opt_str("cardioTestType")? {
        Some(raw) => CardioTestType::parse(&raw)
            .ok_or_else(|| AppError::bad_params("cardioTestType must be PACER or MILE"))?,
        None => CardioTestType::Pacer,
    };
    let cardio_value = match (cardio, p.opt_f64("pacerOrMileRun")?) {
        (_, Some(v)) => Some(v),
        (CardioTestType::Mile, None) => {
            calc::mile_time_from_parts(p.opt_i64("mileMinutes")?, p.opt_i64("mileSeconds")?)
        }
        (CardioTestType::Pacer, None) => None,
    };
    let height = p.opt_f64("height")?;
    let weight = p.opt_f64("weight")?;
    let bmi = p.opt_f64("bmi")?.or_else(|| calc::bmi(height, weight));
    let stretch = |key: &str| p.opt_bool(key).map(|v| v.map(i64::from));
    let stretch_left = stretch("shoulderStretchLeft")?;
    let stretch_right = stretch("shoulderStretchRight")?;

    let student =
        load_student(conn, &student_id)?.ok_or_else(|| AppError::not_found("Student not found"))?;
    let school = student
        .get("currentSchool")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM fitness_tests WHERE student_id = ? AND test_year = ? AND test_season = ?",
            params![student_id, test_year, season.as_str()],
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| AppError::db("db_query_failed", e))?;

    let ts = now_ts();
    let (test_id, created) = match existing {
        Some(id) => {
            conn.execute(
                "UPDATE fitness_tests
                 SET test_date = ?, cardio_test_type = ?, pacer_or_mile_run = ?, pushups = ?,
                     situps = ?, sit_and_reach = ?, trunk_lift = ?, height = ?, weight = ?, bmi = ?,
                     shoulder_stretch_left = ?, shoulder_stretch_right = ?, notes = ?, updated_at = ?
                 WHERE id = ?",
                params![
                    test_date,
                    cardio.as_str(),
                    cardio_value,
                    p.opt_f64("pushups")?,
                    p.opt_f64("situps")?,
                    p.opt_f64("sitAndReach")?,
                    p.opt_f64("trunkLift")?,
                    height,
                    weight,
                    bmi,
                    stretch_left,
                    stretch_right,
                    p.opt_str("notes")?,
                    ts,
                    id
                ],
            )
            .map_err(|e| AppError::db("db_update_failed", e))?;
            (id, false)
        }
        None => {
            let id = new_id();
            conn.execute(
                "INSERT INTO fitness_tests(
                    id, student_id, test_date, test_season, test_year, cardio_test_type,
                    pacer_or_mile_run, pushups, situps, sit_and_reach, trunk_lift, height, weight,
                    bmi, shoulder_stretch_left, shoulder_stretch_right, notes, school, created_at,
                    updated_at
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    student_id,
                    test_date,
                    season.as_str(),
                    test_year,
                    cardio.as_str(),
                    cardio_value,
                    p.opt_f64("pushups")?,
                    p.opt_f64("situps")?,
                    p.opt_f64("sitAndReach")?,
                    p.opt_f64("trunkLift")?,
                    height,
                    weight,
                    bmi,
                    stretch_left,
                    stretch_right,
                    p.opt_str("notes")?,
                    school,
                    ts,
                    ts
                ],
            )
            .map_err(|e| AppError::db("db_insert_failed", e))?;
            (id, true)
        }
    };

    let test = load_test(conn, &test_id)?.ok_or_else(|| AppError::not_found("Test not found"))?;
    Ok(json!({ "testId": test_id, "created": created, "test": test }))
}

fn handle_fitness_list(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let p = Params::new(&req.params);

    let mut where_clause = String::from("1 = 1");
    let mut values: Vec<SqlValue> = Vec::new();
    if let Some(student_id) = p.opt_str("studentId")? {
        where_clause.push_str(" AND t.student_id = ?");
        values.push(SqlValue::Text(student_id));
    }
    if let Some(year) = p.opt_i64("testYear")? {
        where_clause.push_str(" AND t.test_year = ?");
        values.push(SqlValue::Integer(year));
    }
    if let Some(raw) = p.opt_str("testSeason")? {
        let season = Season::parse(&raw)
            .ok_or_else(|| AppError::bad_params("testSeason must be Fall or Spring"))?;
        where_clause.push_str(" AND t.test_season = ?");
        values.push(SqlValue::Text(season.as_str().to_string()));
    }
    if let Some(school) = p.opt_str("school")? {
        where_clause.push_str(" AND t.school = ?");
        values.push(SqlValue::Text(school));
    }

    let columns = TEST_COLUMNS
        .split(", ")
        .map(|c| format!("t.{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {}, s.first_name, s.last_name, s.district_id, s.current_grade
         FROM fitness_tests t
         JOIN students s ON s.id = t.student_id
         WHERE {}
         ORDER BY t.test_date DESC, s.last_name",
        columns, where_clause
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| AppError::db("db_query_failed", e))?;
    let tests = stmt
        .query_map(params_from_iter(values), |row| {
            let mut v = test_to_json(row)?;
            v["student"] = json!({
                "firstName": row.get::<_, String>(20)?,
                "lastName": row.get::<_, String>(21)?,
                "districtId": row.get::<_, String>(22)?,
                "currentGrade": row.get::<_, i64>(23)?,
            });
            Ok(v)
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AppError::db("db_query_failed", e))?;
    Ok(json!({ "tests": tests }))
}

fn handle_fitness_delete(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    require_actor(req)?;
    let test_id = Params::new(&req.params).req_str("testId")?;
    let n = conn
        .execute("DELETE FROM fitness_tests WHERE id = ?", [&test_id])
        .map_err(|e| AppError::db("db_delete_failed", e))?;
    if n == 0 {
        return Err(AppError::not_found("Test not found"));
    }
    Ok(json!({ "ok": true }))
}

fn handle_fitness_evaluate(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let test_id = Params::new(&req.params).req_str("testId")?;
    let test = load_test(conn, &test_id)?.ok_or_else(|| AppError::not_found("Test not found"))?;
    let student = load_student(conn, &test.student_id)?
        .ok_or_else(|| AppError::not_found("Student not found"))?;
    let dob = student.get("dateOfBirth").and_then(|v| v.as_str());
    let sex = student.get("sex").and_then(|v| v.as_str());

    let settings = load_assessment_settings(conn);
    let age = test.age(dob);
    let bmi = test.effective_bmi();
    let zones = test.component_zones(&state.standards, age, sex);
    let overall = improvement::overall_zone(
        &state.standards,
        &test.measurements(),
        age,
        sex,
        &settings.thresholds,
    );
    let mile = match test.cardio_type() {
        CardioTestType::Mile => test.pacer_or_mile_run.map(|m| {
            let (minutes, seconds) = calc::mile_time_parts(m);
            json!({ "minutes": minutes, "seconds": seconds })
        }),
        CardioTestType::Pacer => None,
    };
    Ok(json!({
        "test": test,
        "student": student,
        "age": age,
        "bmi": bmi,
        "bmiRounded": bmi.map(calc::round_off_1_decimal),
        "mileTime": mile,
        "zones": zones,
        "overallZone": overall,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "fitness.save" => handle_fitness_save(state, req),
        "fitness.list" => handle_fitness_list(state, req),
        "fitness.delete" => handle_fitness_delete(state, req),
        "fitness.evaluate" => handle_fitness_evaluate(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
