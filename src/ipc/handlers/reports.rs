use crate::calc;
use crate::improvement::{
    self, class_improvement_stats, compare_measurements, elementary_pacer_status, ElementaryStatus,
    SeasonTest,
};
use crate::ipc::error::AppError;
use crate::ipc::handlers::accounts::{actor_teacher, period_for_actor, period_roster};
use crate::ipc::handlers::fitness::{FitnessTest, Season, TEST_COLUMNS};
use crate::ipc::handlers::setup::{load_assessment_settings, AssessmentSettings};
use crate::ipc::handlers::students::{load_student, student_to_json, STUDENT_COLUMNS};
use crate::ipc::helpers::{db_conn, reply, require_actor, today, Params};
use crate::ipc::types::{AppState, Request};
use crate::standards::{Band, SexKey, StandardsTable};
use crate::zones::{self, Component};
use rusqlite::{params_from_iter, types::Value as SqlValue, Connection};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// `schoolYear` param as a start year, or the school year containing today.
fn resolve_school_year(p: &Params<'_>, settings: &AssessmentSettings) -> Result<i32, AppError> {
    match p.opt_str("schoolYear")? {
        Some(raw) => calc::parse_school_year(&raw)
            .ok_or_else(|| AppError::bad_params("schoolYear must look like 2024-2025")),
        None => Ok(calc::school_year_start(
            today(),
            settings.school_year_start_month,
        )),
    }
}

/// The student's Fall and Spring tests within one school year. When a season
/// was entered more than once, the latest test date wins.
fn season_pair(
    conn: &Connection,
    student_id: &str,
    school_year: i32,
    start_month: u32,
) -> Result<(Option<FitnessTest>, Option<FitnessTest>), AppError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM fitness_tests WHERE student_id = ? ORDER BY test_date",
            TEST_COLUMNS
        ))
        .map_err(|e| AppError::db("db_query_failed", e))?;
    let tests = stmt
        .query_map([student_id], FitnessTest::from_row)
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AppError::db("db_query_failed", e))?;

    let mut fall = None;
    let mut spring = None;
    for t in tests {
        let Some(date) = calc::parse_date(&t.test_date) else {
            continue;
        };
        if calc::school_year_start(date, start_month) != school_year {
            continue;
        }
        match t.season() {
            Some(Season::Fall) => fall = Some(t),
            Some(Season::Spring) => spring = Some(t),
            None => {}
        }
    }
    Ok((fall, spring))
}

fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key).and_then(|s| s.as_str())
}

fn pacer_band(standards: &StandardsTable, sex: Option<&str>, age: Option<i32>) -> Band {
    match (sex.and_then(SexKey::resolve), age) {
        (Some(sex), Some(age)) => standards.band(sex, age, Component::Pacer).unwrap_or_default(),
        _ => Band::default(),
    }
}

fn test_summary(
    standards: &StandardsTable,
    test: &FitnessTest,
    dob: Option<&str>,
    sex: Option<&str>,
) -> Value {
    let age = test.age(dob);
    let zone = zones::classify(
        standards,
        Component::Pacer,
        test.measurements().pacer,
        age,
        sex,
    );
    json!({
        "testId": test.id,
        "testDate": test.test_date,
        "cardioTestType": test.cardio_test_type,
        "laps": test.pacer_or_mile_run,
        "age": age,
        "zone": zone,
        "label": zone.label(),
    })
}

fn handle_pacer_comparison(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let p = Params::new(&req.params);
    let settings = load_assessment_settings(conn);
    let school_year = resolve_school_year(&p, &settings)?;

    let mut school = p.opt_str("school")?;
    if school.is_none() {
        if let Some(actor) = req.actor.as_ref().filter(|a| !a.is_admin()) {
            school = actor_teacher(conn, actor)?.map(|t| t.school);
        }
    }
    let mut where_clause = String::from("1 = 1");
    let mut values: Vec<SqlValue> = Vec::new();
    if let Some(school) = school {
        where_clause.push_str(" AND current_school = ?");
        values.push(SqlValue::Text(school));
    }
    if let Some(grade) = p.opt_i64("grade")? {
        where_clause.push_str(" AND current_grade = ?");
        values.push(SqlValue::Integer(grade));
    }
    if let Some(t) = p.opt_str("classroomTeacher")? {
        where_clause.push_str(" AND classroom_teacher = ?");
        values.push(SqlValue::Text(t));
    }
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM students WHERE {} ORDER BY last_name, first_name",
            STUDENT_COLUMNS, where_clause
        ))
        .map_err(|e| AppError::db("db_query_failed", e))?;
    let students = stmt
        .query_map(params_from_iter(values), student_to_json)
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AppError::db("db_query_failed", e))?;

    let standards = &state.standards;
    let thresholds = &settings.thresholds;
    let mut rows = Vec::with_capacity(students.len());
    let mut comparisons = Vec::with_capacity(students.len());
    let mut status_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for student in students {
        let student_id = str_field(&student, "id").unwrap_or_default().to_string();
        let dob = str_field(&student, "dateOfBirth");
        let sex = str_field(&student, "sex");
        let (fall, spring) =
            season_pair(conn, &student_id, school_year, settings.school_year_start_month)?;

        let fall_reading = fall.as_ref().map(|t| t.pacer_reading(dob));
        let spring_reading = spring.as_ref().map(|t| t.pacer_reading(dob));
        let status = elementary_pacer_status(
            standards,
            sex,
            fall_reading.as_ref(),
            spring_reading.as_ref(),
            thresholds,
        );
        let band = pacer_band(standards, sex, fall_reading.and_then(|r| r.age));
        let comparison = compare_measurements(
            fall.as_ref().and_then(|t| t.measurements().pacer),
            spring.as_ref().and_then(|t| t.measurements().pacer),
            band,
            thresholds,
        );
        *status_counts.entry(status.label).or_default() += 1;

        rows.push(json!({
            "student": student,
            "fall": fall.as_ref().map(|t| test_summary(standards, t, dob, sex)),
            "spring": spring.as_ref().map(|t| test_summary(standards, t, dob, sex)),
            "comparison": comparison,
            "status": status,
        }));
        comparisons.push(comparison);
    }

    let significant = status_counts
        .get(ElementaryStatus::SignificantImprovement.label())
        .copied()
        .unwrap_or(0);
    Ok(json!({
        "schoolYear": calc::school_year_label(school_year),
        "students": rows,
        "stats": class_improvement_stats(&comparisons),
        "statusCounts": status_counts,
        "significantImprovement": significant,
    }))
}

fn handle_secondary_class_summary(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_actor(req)?;
    let p = Params::new(&req.params);
    let period = period_for_actor(conn, actor, &p.req_str("periodId")?)?;
    let settings = load_assessment_settings(conn);
    let school_year = match calc::parse_school_year(&period.school_year) {
        Some(y) => y,
        None => resolve_school_year(&p, &settings)?,
    };

    let standards = &state.standards;
    let roster = period_roster(conn, &period)?;
    let mut rows = Vec::with_capacity(roster.len());
    let mut outcomes = Vec::with_capacity(roster.len());
    for student in roster {
        let student_id = str_field(&student, "id").unwrap_or_default().to_string();
        let dob = str_field(&student, "dateOfBirth");
        let sex = str_field(&student, "sex");
        let (fall, spring) =
            season_pair(conn, &student_id, school_year, settings.school_year_start_month)?;
        let season = |t: &FitnessTest| SeasonTest {
            measurements: t.measurements(),
            age: t.age(dob),
        };
        let fall_season = fall.as_ref().map(season);
        let spring_season = spring.as_ref().map(season);
        let outcome = improvement::secondary_status(
            standards,
            sex,
            fall_season.as_ref(),
            spring_season.as_ref(),
            &settings.thresholds,
        );
        rows.push(json!({
            "student": student,
            "fall": fall,
            "spring": spring,
            "outcome": outcome,
        }));
        outcomes.push(outcome);
    }

    Ok(json!({
        "period": period,
        "schoolYear": calc::school_year_label(school_year),
        "students": rows,
        "summary": improvement::secondary_class_summary(&outcomes),
    }))
}

fn season_card(
    standards: &StandardsTable,
    settings: &AssessmentSettings,
    test: &FitnessTest,
    dob: Option<&str>,
    sex: Option<&str>,
) -> Value {
    let age = test.age(dob);
    let bmi = test.effective_bmi();
    json!({
        "test": test,
        "age": age,
        "bmi": bmi.map(calc::round_off_1_decimal),
        "zones": test.component_zones(standards, age, sex),
        "overallZone": improvement::overall_zone(
            standards,
            &test.measurements(),
            age,
            sex,
            &settings.thresholds,
        ),
    })
}

fn handle_student_card(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let p = Params::new(&req.params);
    let settings = load_assessment_settings(conn);
    let school_year = resolve_school_year(&p, &settings)?;
    let student_id = p.req_str("studentId")?;
    let student =
        load_student(conn, &student_id)?.ok_or_else(|| AppError::not_found("Student not found"))?;
    let dob = str_field(&student, "dateOfBirth");
    let sex = str_field(&student, "sex");
    let (fall, spring) =
        season_pair(conn, &student_id, school_year, settings.school_year_start_month)?;

    let standards = &state.standards;
    let fall_age = fall.as_ref().and_then(|t| t.age(dob));
    let sex_key = sex.and_then(SexKey::resolve);
    let mut comparisons = Map::new();
    for c in Component::OVERALL {
        let band = match (sex_key, fall_age) {
            (Some(s), Some(a)) => standards.band(s, a, c).unwrap_or_default(),
            _ => Band::default(),
        };
        let cmp = compare_measurements(
            fall.as_ref().and_then(|t| t.measurements().get(c)),
            spring.as_ref().and_then(|t| t.measurements().get(c)),
            band,
            &settings.thresholds,
        );
        comparisons.insert(c.as_str().to_string(), json!(cmp));
    }

    Ok(json!({
        "student": student,
        "schoolYear": calc::school_year_label(school_year),
        "fall": fall.as_ref().map(|t| season_card(standards, &settings, t, dob, sex)),
        "spring": spring.as_ref().map(|t| season_card(standards, &settings, t, dob, sex)),
        "comparisons": comparisons,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "reports.pacerComparison" => handle_pacer_comparison(state, req),
        "reports.secondaryClassSummary" => handle_secondary_class_summary(state, req),
        "reports.studentCard" => handle_student_card(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
