use crate::calc;
use crate::import::{self, RosterRow, MAX_IMPORT_GRADE, MIN_IMPORT_GRADE};
use crate::ipc::error::AppError;
use crate::ipc::handlers::accounts::actor_teacher;
use crate::ipc::handlers::fitness::{test_to_json, TEST_COLUMNS};
use crate::ipc::helpers::{db_conn, log_admin_action, new_id, now_ts, reply, require_admin, Params};
use crate::ipc::types::{AppState, Request};
use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension};
use serde_json::{json, Value};

pub const STUDENT_COLUMNS: &str = "id, district_id, first_name, last_name, date_of_birth, sex, current_grade, current_school, pe_teacher, classroom_teacher, created_at, updated_at";

pub fn student_to_json(row: &rusqlite::Row<'_>) -> rusqlite::Result<Value> {
    Ok(json!({
        "id": row.get::<_, String>(0)?,
        "districtId": row.get::<_, String>(1)?,
        "firstName": row.get::<_, String>(2)?,
        "lastName": row.get::<_, String>(3)?,
        "dateOfBirth": row.get::<_, Option<String>>(4)?,
        "sex": row.get::<_, Option<String>>(5)?,
        "currentGrade": row.get::<_, i64>(6)?,
        "currentSchool": row.get::<_, String>(7)?,
        "peTeacher": row.get::<_, String>(8)?,
        "classroomTeacher": row.get::<_, Option<String>>(9)?,
        "createdAt": row.get::<_, String>(10)?,
        "updatedAt": row.get::<_, String>(11)?,
    }))
}

pub fn load_student(conn: &Connection, student_id: &str) -> Result<Option<Value>, AppError> {
    conn.query_row(
        &format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS),
        [student_id],
        student_to_json,
    )
    .optional()
    .map_err(|e| AppError::db("db_query_failed", e))
}

/// Insert a roster row, or update the student with the same district id.
/// Returns the student id and whether it was created. A blank sex keeps the
/// stored value.
pub fn upsert_student(conn: &Connection, s: &RosterRow) -> rusqlite::Result<(String, bool)> {
    let ts = now_ts();
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM students WHERE district_id = ?",
            [&s.district_id],
            |r| r.get(0),
        )
        .optional()?;
    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE students
                 SET first_name = ?, last_name = ?, date_of_birth = ?, sex = COALESCE(?, sex),
                     current_grade = ?, current_school = ?, pe_teacher = ?, classroom_teacher = ?,
                     updated_at = ?
                 WHERE id = ?",
                params![
                    s.first_name,
                    s.last_name,
                    s.date_of_birth,
                    s.sex,
                    s.grade,
                    s.school,
                    s.pe_teacher,
                    s.classroom_teacher,
                    ts,
                    id
                ],
            )?;
            Ok((id, false))
        }
        None => {
            let id = new_id();
            conn.execute(
                "INSERT INTO students(
                    id, district_id, first_name, last_name, date_of_birth, sex, current_grade,
                    current_school, pe_teacher, classroom_teacher, created_at, updated_at
                 ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    s.district_id,
                    s.first_name,
                    s.last_name,
                    s.date_of_birth,
                    s.sex,
                    s.grade,
                    s.school,
                    s.pe_teacher,
                    s.classroom_teacher,
                    ts,
                    ts
                ],
            )?;
            Ok((id, true))
        }
    }
}

fn handle_students_list(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let p = Params::new(&req.params);

    let mut school = p.opt_str("school")?;
    if school.is_none() {
        if let Some(actor) = req.actor.as_ref().filter(|a| !a.is_admin()) {
            school = actor_teacher(conn, actor)?.map(|t| t.school);
        }
    }
    let grade = p.opt_i64("grade")?;
    let pe_teacher = p.opt_str("peTeacher")?;
    let classroom_teacher = p.opt_str("classroomTeacher")?;
    let search = p.opt_str("search")?;

    let mut where_clause = String::from("1 = 1");
    let mut values: Vec<SqlValue> = Vec::new();
    if let Some(school) = school {
        where_clause.push_str(" AND current_school = ?");
        values.push(SqlValue::Text(school));
    }
    if let Some(grade) = grade {
        where_clause.push_str(" AND current_grade = ?");
        values.push(SqlValue::Integer(grade));
    }
    if let Some(t) = pe_teacher {
        where_clause.push_str(" AND pe_teacher = ?");
        values.push(SqlValue::Text(t));
    }
    if let Some(t) = classroom_teacher {
        where_clause.push_str(" AND classroom_teacher = ?");
        values.push(SqlValue::Text(t));
    }
    if let Some(q) = search {
        where_clause.push_str(
            " AND (first_name LIKE ? COLLATE NOCASE OR last_name LIKE ? COLLATE NOCASE OR district_id LIKE ? COLLATE NOCASE)",
        );
        let pattern = format!("%{}%", q);
        for _ in 0..3 {
            values.push(SqlValue::Text(pattern.clone()));
        }
    }

    let sql = format!(
        "SELECT {} FROM students WHERE {} ORDER BY last_name, first_name",
        STUDENT_COLUMNS, where_clause
    );
    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| AppError::db("db_query_failed", e))?;
    let students = stmt
        .query_map(params_from_iter(values), student_to_json)
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AppError::db("db_query_failed", e))?;
    Ok(json!({ "students": students }))
}

fn resolve_student_id(conn: &Connection, p: &Params<'_>) -> Result<String, AppError> {
    if let Some(id) = p.opt_str("studentId")? {
        return Ok(id);
    }
    let Some(district_id) = p.opt_str("districtId")? else {
        return Err(AppError::bad_params("missing studentId"));
    };
    conn.query_row(
        "SELECT id FROM students WHERE district_id = ?",
        [&district_id],
        |r| r.get(0),
    )
    .optional()
    .map_err(|e| AppError::db("db_query_failed", e))?
    .ok_or_else(|| AppError::not_found("Student not found"))
}

fn handle_students_get(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let p = Params::new(&req.params);
    let student_id = resolve_student_id(conn, &p)?;
    let student =
        load_student(conn, &student_id)?.ok_or_else(|| AppError::not_found("Student not found"))?;

    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM fitness_tests WHERE student_id = ? ORDER BY test_date DESC",
            TEST_COLUMNS
        ))
        .map_err(|e| AppError::db("db_query_failed", e))?;
    let tests = stmt
        .query_map([&student_id], test_to_json)
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AppError::db("db_query_failed", e))?;
    Ok(json!({ "student": student, "fitnessTests": tests }))
}

/// Validate an upsert payload with the same rules as a roster import row.
fn roster_row_from_params(p: &Params<'_>) -> Result<RosterRow, AppError> {
    let district_id = p.req_str("districtId")?;
    let first_name = p.req_str("firstName")?;
    let last_name = p.req_str("lastName")?;
    let dob_raw = p.req_str("dateOfBirth")?;
    let school = p.req_str("school")?;
    let pe_teacher = p.req_str("peTeacher")?;
    let grade = p
        .opt_i64("grade")?
        .ok_or_else(|| AppError::bad_params("missing grade"))?;
    if !(MIN_IMPORT_GRADE..=MAX_IMPORT_GRADE).contains(&grade) {
        return Err(AppError::bad_params("Grade must be between 3 and 12"));
    }
    let dob = calc::parse_date(&dob_raw)
        .ok_or_else(|| AppError::bad_params("Invalid date format (use YYYY-MM-DD)"))?;
    Ok(RosterRow {
        row: 0,
        district_id,
        first_name,
        last_name,
        date_of_birth: dob.format("%Y-%m-%d").to_string(),
        grade,
        school,
        pe_teacher,
        classroom_teacher: p.opt_str("classroomTeacher")?,
        sex: p.opt_str("sex")?,
    })
}

fn handle_students_upsert(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_admin(req)?;
    let row = roster_row_from_params(&Params::new(&req.params))?;
    let (id, created) =
        upsert_student(conn, &row).map_err(|e| AppError::db("db_update_failed", e))?;
    log_admin_action(
        conn,
        actor,
        if created { "student_create" } else { "student_update" },
        json!({ "studentId": id, "districtId": row.district_id }),
    );
    Ok(json!({ "studentId": id, "created": created }))
}

fn handle_students_import_csv(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_admin(req)?;
    let text = req
        .params
        .get("csv")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::bad_params("missing csv"))?;

    let parsed = import::parse_roster(text).map_err(|e| AppError::Import(format!("{e:#}")))?;
    if parsed.rows.is_empty() && parsed.errors.is_empty() {
        return Err(AppError::Import("CSV file is empty".to_string()));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| AppError::db("db_tx_failed", e))?;
    let mut imported_students = Vec::with_capacity(parsed.rows.len());
    for row in &parsed.rows {
        if let Err(e) = upsert_student(&tx, row) {
            let _ = tx.rollback();
            return Err(AppError::db("db_update_failed", format!("row {}: {}", row.row, e)));
        }
        imported_students.push(json!({
            "districtId": row.district_id,
            "name": format!("{} {}", row.first_name, row.last_name),
        }));
    }
    tx.commit().map_err(|e| AppError::db("db_commit_failed", e))?;

    let imported = parsed.rows.len();
    let skipped = parsed.errors.len();
    tracing::info!(imported, skipped, "roster import complete");
    log_admin_action(
        conn,
        actor,
        "students_import",
        json!({ "imported": imported, "skipped": skipped }),
    );
    Ok(json!({
        "imported": imported,
        "skipped": skipped,
        "errors": parsed.errors,
        "importedStudents": imported_students,
        "message": format!("Import complete: {} students imported, {} skipped", imported, skipped),
    }))
}

fn handle_students_import_template(_state: &mut AppState, _req: &Request) -> Result<Value, AppError> {
    Ok(json!({
        "filename": "student-import-template.csv",
        "csv": import::ROSTER_TEMPLATE,
    }))
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_admin(req)?;
    let student_id = resolve_student_id(conn, &Params::new(&req.params))?;
    if load_student(conn, &student_id)?.is_none() {
        return Err(AppError::not_found("Student not found"));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| AppError::db("db_tx_failed", e))?;
    // No ON DELETE CASCADE; children first.
    for table in ["fitness_tests", "period_assignments"] {
        if let Err(e) = tx.execute(
            &format!("DELETE FROM {} WHERE student_id = ?", table),
            [&student_id],
        ) {
            let _ = tx.rollback();
            return Err(AppError::db("db_delete_failed", format!("{}: {}", table, e)));
        }
    }
    if let Err(e) = tx.execute("DELETE FROM students WHERE id = ?", [&student_id]) {
        let _ = tx.rollback();
        return Err(AppError::db("db_delete_failed", e));
    }
    tx.commit().map_err(|e| AppError::db("db_commit_failed", e))?;

    log_admin_action(conn, actor, "student_delete", json!({ "studentId": student_id }));
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "students.list" => handle_students_list(state, req),
        "students.get" => handle_students_get(state, req),
        "students.upsert" => handle_students_upsert(state, req),
        "students.importCsv" => handle_students_import_csv(state, req),
        "students.importTemplate" => handle_students_import_template(state, req),
        "students.delete" => handle_students_delete(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
