use crate::calc;
use crate::ipc::error::AppError;
use crate::ipc::handlers::setup::load_assessment_settings;
use crate::ipc::handlers::students::{student_to_json, STUDENT_COLUMNS};
use crate::ipc::helpers::{
    db_conn, log_admin_action, new_id, now_ts, reply, require_actor, require_admin, today, Params,
};
use crate::ipc::types::{Actor, AppState, Request};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension};
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

pub const TEACHER_PENDING: &str = "pending";
pub const TEACHER_ACTIVE: &str = "active";
pub const TEACHER_LOCKED: &str = "locked";

const LEVEL_ELEMENTARY: &str = "ELEMENTARY";
const LEVEL_SECONDARY: &str = "SECONDARY";

const MAX_PERIOD_NUMBER: i64 = 20;
const DEFAULT_LOG_PAGE_SIZE: i64 = 20;
const MAX_LOG_PAGE_SIZE: i64 = 100;

const TEACHER_COLUMNS: &str = "id, email, name, school, school_level, grade, department, status, activation_code_id, created_at, updated_at";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub email: String,
    pub name: String,
    pub school: String,
    pub school_level: Option<String>,
    pub grade: Option<String>,
    pub department: Option<String>,
    pub status: String,
    pub activation_code_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Teacher {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            name: row.get(2)?,
            school: row.get(3)?,
            school_level: row.get(4)?,
            grade: row.get(5)?,
            department: row.get(6)?,
            status: row.get(7)?,
            activation_code_id: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }
}

fn load_teacher(conn: &Connection, where_sql: &str, key: &str) -> Result<Option<Teacher>, AppError> {
    conn.query_row(
        &format!("SELECT {} FROM teachers WHERE {}", TEACHER_COLUMNS, where_sql),
        [key],
        Teacher::from_row,
    )
    .optional()
    .map_err(|e| AppError::db("db_query_failed", e))
}

/// The teacher record behind an actor, by id first and then by email.
pub fn actor_teacher(conn: &Connection, actor: &Actor) -> Result<Option<Teacher>, AppError> {
    if let Some(id) = actor.teacher_id.as_deref().filter(|s| !s.trim().is_empty()) {
        return load_teacher(conn, "id = ?", id.trim());
    }
    match actor.email.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(email) => load_teacher(conn, "email = ? COLLATE NOCASE", email),
        None => Ok(None),
    }
}

/// Teacher targeted by a request: `teacherId` for admins, otherwise the actor.
fn target_teacher(conn: &Connection, req: &Request) -> Result<Teacher, AppError> {
    let actor = require_actor(req)?;
    let p = Params::new(&req.params);
    let teacher = match p.opt_str("teacherId")? {
        Some(id) if actor.is_admin() => load_teacher(conn, "id = ?", &id)?,
        _ => actor_teacher(conn, actor)?,
    };
    teacher.ok_or_else(|| AppError::not_found("Teacher not found"))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassPeriod {
    pub id: String,
    pub teacher_id: String,
    pub period_number: i64,
    pub school_year: String,
    pub name: Option<String>,
    pub created_at: String,
}

impl ClassPeriod {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            teacher_id: row.get(1)?,
            period_number: row.get(2)?,
            school_year: row.get(3)?,
            name: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

/// A period the actor may see. Teachers only reach their own periods; a
/// period owned by someone else reads as missing.
pub fn period_for_actor(
    conn: &Connection,
    actor: &Actor,
    period_id: &str,
) -> Result<ClassPeriod, AppError> {
    let period = conn
        .query_row(
            "SELECT id, teacher_id, period_number, school_year, name, created_at
             FROM class_periods WHERE id = ?",
            [period_id],
            ClassPeriod::from_row,
        )
        .optional()
        .map_err(|e| AppError::db("db_query_failed", e))?
        .ok_or_else(|| AppError::not_found("Period not found"))?;
    if actor.is_admin() {
        return Ok(period);
    }
    match actor_teacher(conn, actor)? {
        Some(t) if t.id == period.teacher_id => Ok(period),
        _ => Err(AppError::not_found("Period not found")),
    }
}

/// Students currently assigned to a period for its school year, by last name.
pub fn period_roster(conn: &Connection, period: &ClassPeriod) -> Result<Vec<Value>, AppError> {
    let columns = STUDENT_COLUMNS
        .split(", ")
        .map(|c| format!("s.{}", c))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {}
             FROM period_assignments a
             JOIN students s ON s.id = a.student_id
             WHERE a.period_id = ? AND a.school_year = ? AND a.drop_date IS NULL
             ORDER BY s.last_name, s.first_name",
            columns
        ))
        .map_err(|e| AppError::db("db_query_failed", e))?;
    stmt.query_map(params![period.id, period.school_year], student_to_json)
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AppError::db("db_query_failed", e))
}

fn handle_teachers_list(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    require_admin(req)?;
    let p = Params::new(&req.params);

    let mut where_clause = String::from("1 = 1");
    let mut values: Vec<SqlValue> = Vec::new();
    if let Some(status) = p.opt_str("status")? {
        where_clause.push_str(" AND status = ?");
        values.push(SqlValue::Text(status.to_ascii_lowercase()));
    }
    if let Some(school) = p.opt_str("school")? {
        where_clause.push_str(" AND school = ?");
        values.push(SqlValue::Text(school));
    }
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM teachers WHERE {} ORDER BY name",
            TEACHER_COLUMNS, where_clause
        ))
        .map_err(|e| AppError::db("db_query_failed", e))?;
    let teachers = stmt
        .query_map(params_from_iter(values), Teacher::from_row)
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AppError::db("db_query_failed", e))?;
    Ok(json!({ "teachers": teachers }))
}

fn parse_teacher_status(raw: &str) -> Result<&'static str, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        TEACHER_PENDING => Ok(TEACHER_PENDING),
        TEACHER_ACTIVE => Ok(TEACHER_ACTIVE),
        TEACHER_LOCKED => Ok(TEACHER_LOCKED),
        _ => Err(AppError::bad_params(
            "status must be one of: pending, active, locked",
        )),
    }
}

fn handle_teachers_create(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_admin(req)?;
    let p = Params::new(&req.params);
    let email = p.req_str("email")?.to_ascii_lowercase();
    let name = p.req_str("name")?;
    let school = p.req_str("school")?;
    let status = match p.opt_str("status")? {
        Some(raw) => parse_teacher_status(&raw)?,
        None => TEACHER_PENDING,
    };

    if load_teacher(conn, "email = ? COLLATE NOCASE", &email)?.is_some() {
        return Err(AppError::Conflict(
            "A teacher with this email already exists".to_string(),
        ));
    }
    let id = new_id();
    let ts = now_ts();
    conn.execute(
        "INSERT INTO teachers(id, email, name, school, status, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        params![id, email, name, school, status, ts, ts],
    )
    .map_err(|e| AppError::db("db_insert_failed", e))?;
    log_admin_action(
        conn,
        actor,
        "teacher_create",
        json!({ "teacherId": id, "email": email }),
    );
    Ok(json!({ "teacherId": id }))
}

fn parse_period_numbers(v: Option<&Value>) -> Result<Vec<i64>, AppError> {
    let Some(v) = v.filter(|v| !v.is_null()) else {
        return Ok(Vec::new());
    };
    let arr = v
        .as_array()
        .ok_or_else(|| AppError::bad_params("periods must be an array of numbers"))?;
    let mut out = Vec::with_capacity(arr.len());
    for item in arr {
        let n = item
            .as_i64()
            .filter(|n| (1..=MAX_PERIOD_NUMBER).contains(n))
            .ok_or_else(|| {
                AppError::bad_params(format!(
                    "periods must be numbers in 1..={}",
                    MAX_PERIOD_NUMBER
                ))
            })?;
        if !out.contains(&n) {
            out.push(n);
        }
    }
    out.sort_unstable();
    Ok(out)
}

fn handle_teachers_setup(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let teacher = target_teacher(conn, req)?;
    let p = Params::new(&req.params);

    let level = p.opt_str("schoolLevel")?.map(|s| s.to_ascii_uppercase());
    let level = match level.as_deref() {
        Some(LEVEL_ELEMENTARY) => LEVEL_ELEMENTARY,
        Some(LEVEL_SECONDARY) => LEVEL_SECONDARY,
        _ => return Err(AppError::bad_params("Invalid school level")),
    };
    if teacher.school_level.is_some() {
        return Err(AppError::Conflict("Already setup".to_string()));
    }
    let (grade, department) = if level == LEVEL_ELEMENTARY {
        (p.opt_str("grade")?, None)
    } else {
        (None, p.opt_str("department")?)
    };
    let periods = if level == LEVEL_SECONDARY {
        parse_period_numbers(p.raw("periods"))?
    } else {
        Vec::new()
    };
    let start_month = load_assessment_settings(conn).school_year_start_month;
    let school_year = calc::school_year_label(calc::school_year_start(today(), start_month));

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| AppError::db("db_tx_failed", e))?;
    if let Err(e) = tx.execute(
        "UPDATE teachers SET school_level = ?, grade = ?, department = ?, updated_at = ? WHERE id = ?",
        params![level, grade, department, now_ts(), teacher.id],
    ) {
        let _ = tx.rollback();
        return Err(AppError::db("db_update_failed", e));
    }
    let mut created = Vec::with_capacity(periods.len());
    for n in &periods {
        let period_id = new_id();
        if let Err(e) = tx.execute(
            "INSERT INTO class_periods(id, teacher_id, period_number, school_year, name, created_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            params![period_id, teacher.id, n, school_year, format!("Period {}", n), now_ts()],
        ) {
            let _ = tx.rollback();
            return Err(AppError::db("db_insert_failed", e));
        }
        created.push(json!({ "id": period_id, "periodNumber": n, "schoolYear": school_year }));
    }
    tx.commit().map_err(|e| AppError::db("db_commit_failed", e))?;

    let teacher = load_teacher(conn, "id = ?", &teacher.id)?
        .ok_or_else(|| AppError::not_found("Teacher not found"))?;
    Ok(json!({ "teacher": teacher, "periods": created }))
}

fn handle_teachers_set_status(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_admin(req)?;
    let p = Params::new(&req.params);
    let teacher_id = p.req_str("teacherId")?;
    let status = parse_teacher_status(&p.req_str("status")?)?;
    let n = conn
        .execute(
            "UPDATE teachers SET status = ?, updated_at = ? WHERE id = ?",
            params![status, now_ts(), teacher_id],
        )
        .map_err(|e| AppError::db("db_update_failed", e))?;
    if n == 0 {
        return Err(AppError::not_found("Teacher not found"));
    }
    log_admin_action(
        conn,
        actor,
        "teacher_status_update",
        json!({ "teacherId": teacher_id, "status": status }),
    );
    Ok(json!({ "ok": true }))
}

fn handle_periods_list(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_actor(req)?;
    let p = Params::new(&req.params);

    let mut where_clause = String::from("1 = 1");
    let mut values: Vec<SqlValue> = Vec::new();
    let teacher_id = if actor.is_admin() {
        p.opt_str("teacherId")?
    } else {
        let t = actor_teacher(conn, actor)?.ok_or_else(|| AppError::not_found("Teacher not found"))?;
        Some(t.id)
    };
    if let Some(id) = teacher_id {
        where_clause.push_str(" AND teacher_id = ?");
        values.push(SqlValue::Text(id));
    }
    if let Some(year) = p.opt_str("schoolYear")? {
        let start = calc::parse_school_year(&year)
            .ok_or_else(|| AppError::bad_params("schoolYear must look like 2024-2025"))?;
        where_clause.push_str(" AND school_year = ?");
        values.push(SqlValue::Text(calc::school_year_label(start)));
    }
    let mut stmt = conn
        .prepare(&format!(
            "SELECT id, teacher_id, period_number, school_year, name, created_at
             FROM class_periods WHERE {}
             ORDER BY school_year DESC, period_number",
            where_clause
        ))
        .map_err(|e| AppError::db("db_query_failed", e))?;
    let periods = stmt
        .query_map(params_from_iter(values), ClassPeriod::from_row)
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AppError::db("db_query_failed", e))?;
    Ok(json!({ "periods": periods }))
}

fn handle_periods_students(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_actor(req)?;
    let period_id = Params::new(&req.params).req_str("periodId")?;
    let period = period_for_actor(conn, actor, &period_id)?;
    let students = period_roster(conn, &period)?;
    Ok(json!({ "period": period, "students": students }))
}

fn handle_periods_assign(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_actor(req)?;
    let p = Params::new(&req.params);
    let period = period_for_actor(conn, actor, &p.req_str("periodId")?)?;
    let student_ids = p.strings("studentIds")?;
    if student_ids.is_empty() {
        return Err(AppError::bad_params("studentIds must contain at least one id"));
    }
    let assigned_date = today().format("%Y-%m-%d").to_string();

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| AppError::db("db_tx_failed", e))?;
    let mut assigned = 0usize;
    let mut skipped = Vec::new();
    for student_id in &student_ids {
        let counts = tx
            .query_row(
                "SELECT
                    (SELECT COUNT(*) FROM students WHERE id = ?1),
                    (SELECT COUNT(*) FROM period_assignments
                     WHERE period_id = ?2 AND student_id = ?1 AND school_year = ?3 AND drop_date IS NULL)",
                params![student_id, period.id, period.school_year],
                |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)),
            );
        let (exists, active) = match counts {
            Ok(v) => v,
            Err(e) => {
                let _ = tx.rollback();
                return Err(AppError::db("db_query_failed", e));
            }
        };
        if exists == 0 || active > 0 {
            skipped.push(student_id.clone());
            continue;
        }
        if let Err(e) = tx.execute(
            "INSERT INTO period_assignments(id, period_id, student_id, school_year, assigned_date, drop_date)
             VALUES(?, ?, ?, ?, ?, NULL)",
            params![new_id(), period.id, student_id, period.school_year, assigned_date],
        ) {
            let _ = tx.rollback();
            return Err(AppError::db("db_insert_failed", e));
        }
        assigned += 1;
    }
    tx.commit().map_err(|e| AppError::db("db_commit_failed", e))?;
    Ok(json!({ "assigned": assigned, "skipped": skipped }))
}

fn handle_periods_drop(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_actor(req)?;
    let p = Params::new(&req.params);
    let period = period_for_actor(conn, actor, &p.req_str("periodId")?)?;
    let student_id = p.req_str("studentId")?;
    let n = conn
        .execute(
            "UPDATE period_assignments SET drop_date = ?
             WHERE period_id = ? AND student_id = ? AND school_year = ? AND drop_date IS NULL",
            params![
                today().format("%Y-%m-%d").to_string(),
                period.id,
                student_id,
                period.school_year
            ],
        )
        .map_err(|e| AppError::db("db_update_failed", e))?;
    if n == 0 {
        return Err(AppError::not_found("Assignment not found"));
    }
    Ok(json!({ "ok": true }))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivationCode {
    id: String,
    code: String,
    active: bool,
    max_uses: i64,
    uses_count: i64,
    expires_at: Option<String>,
    created_by: String,
    created_at: String,
}

impl ActivationCode {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            code: row.get(1)?,
            active: row.get::<_, i64>(2)? != 0,
            max_uses: row.get(3)?,
            uses_count: row.get(4)?,
            expires_at: row.get(5)?,
            created_by: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

const CODE_COLUMNS: &str = "id, code, active, max_uses, uses_count, expires_at, created_by, created_at";

/// Eight uppercase hex characters.
fn generate_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_ascii_uppercase()
}

/// Date-only expiries last through the end of that day.
fn is_expired(expires_at: &str, now: DateTime<Utc>) -> bool {
    let t = expires_at.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return now > dt.with_timezone(&Utc);
    }
    match calc::parse_date(t) {
        Some(d) => now.date_naive() > d,
        None => false,
    }
}

fn normalize_expiry(raw: &str) -> Result<String, AppError> {
    let t = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Ok(dt
            .with_timezone(&Utc)
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
    }
    NaiveDate::parse_from_str(t, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| AppError::bad_params("expiresAt must be YYYY-MM-DD or an RFC 3339 timestamp"))
}

fn handle_codes_list(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    require_admin(req)?;
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM activation_codes ORDER BY created_at DESC",
            CODE_COLUMNS
        ))
        .map_err(|e| AppError::db("db_query_failed", e))?;
    let codes = stmt
        .query_map([], ActivationCode::from_row)
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AppError::db("db_query_failed", e))?;
    Ok(json!({ "codes": codes }))
}

fn handle_codes_create(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_admin(req)?;
    let p = Params::new(&req.params);
    let max_uses = p.opt_i64("maxUses")?.unwrap_or(1);
    if max_uses < 1 {
        return Err(AppError::bad_params("maxUses must be >= 1"));
    }
    let expires_at = p
        .opt_str("expiresAt")?
        .map(|s| normalize_expiry(&s))
        .transpose()?;

    let id = new_id();
    let code = generate_code();
    conn.execute(
        "INSERT INTO activation_codes(id, code, active, max_uses, uses_count, expires_at, created_by, created_at)
         VALUES(?, ?, 1, ?, 0, ?, 'admin', ?)",
        params![id, code, max_uses, expires_at, now_ts()],
    )
    .map_err(|e| AppError::db("db_insert_failed", e))?;
    log_admin_action(
        conn,
        actor,
        "activation_code_create",
        json!({
            "code": code,
            "maxUses": max_uses,
            "expiresAt": expires_at,
            "activationCodeId": id,
        }),
    );
    let created = conn
        .query_row(
            &format!("SELECT {} FROM activation_codes WHERE id = ?", CODE_COLUMNS),
            [&id],
            ActivationCode::from_row,
        )
        .map_err(|e| AppError::db("db_query_failed", e))?;
    Ok(json!({ "code": created }))
}

fn handle_codes_redeem(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let teacher = target_teacher(conn, req)?;
    let raw = Params::new(&req.params).req_str("code")?;
    let code = conn
        .query_row(
            &format!(
                "SELECT {} FROM activation_codes WHERE code = ?",
                CODE_COLUMNS
            ),
            [raw.to_ascii_uppercase()],
            ActivationCode::from_row,
        )
        .optional()
        .map_err(|e| AppError::db("db_query_failed", e))?
        .filter(|c| c.active)
        .ok_or_else(|| AppError::not_found("Invalid activation code"))?;
    if code.expires_at.as_deref().is_some_and(|e| is_expired(e, Utc::now())) {
        return Err(AppError::Conflict("Activation code has expired".to_string()));
    }
    if code.uses_count >= code.max_uses {
        return Err(AppError::Conflict(
            "Activation code has reached its usage limit".to_string(),
        ));
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| AppError::db("db_tx_failed", e))?;
    if let Err(e) = tx.execute(
        "UPDATE activation_codes SET uses_count = uses_count + 1 WHERE id = ?",
        [&code.id],
    ) {
        let _ = tx.rollback();
        return Err(AppError::db("db_update_failed", e));
    }
    if let Err(e) = tx.execute(
        "UPDATE teachers SET status = ?, activation_code_id = ?, updated_at = ? WHERE id = ?",
        params![TEACHER_ACTIVE, code.id, now_ts(), teacher.id],
    ) {
        let _ = tx.rollback();
        return Err(AppError::db("db_update_failed", e));
    }
    tx.commit().map_err(|e| AppError::db("db_commit_failed", e))?;
    tracing::info!(teacher = %teacher.id, "activation code redeemed");
    Ok(json!({ "ok": true, "teacherId": teacher.id, "status": TEACHER_ACTIVE }))
}

fn handle_admin_logs_list(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    require_admin(req)?;
    let p = Params::new(&req.params);
    let page = p.opt_i64("page")?.unwrap_or(1).max(1);
    let page_size = p
        .opt_i64("pageSize")?
        .unwrap_or(DEFAULT_LOG_PAGE_SIZE)
        .clamp(1, MAX_LOG_PAGE_SIZE);

    let mut where_clause = String::from("1 = 1");
    let mut values: Vec<SqlValue> = Vec::new();
    if let Some(action) = p.opt_str("action")? {
        where_clause.push_str(" AND action LIKE ? COLLATE NOCASE");
        values.push(SqlValue::Text(format!("%{}%", action)));
    }
    if let Some(email) = p.opt_str("adminEmail")? {
        where_clause.push_str(" AND admin_email LIKE ? COLLATE NOCASE");
        values.push(SqlValue::Text(format!("%{}%", email)));
    }
    if let Some(search) = p.opt_str("search")? {
        where_clause.push_str(
            " AND (action LIKE ? COLLATE NOCASE OR admin_email LIKE ? COLLATE NOCASE OR details LIKE ? COLLATE NOCASE)",
        );
        let pattern = format!("%{}%", search);
        for _ in 0..3 {
            values.push(SqlValue::Text(pattern.clone()));
        }
    }
    if let Some(from) = p.opt_str("from")? {
        where_clause.push_str(" AND created_at >= ?");
        values.push(SqlValue::Text(from));
    }
    if let Some(to) = p.opt_str("to")? {
        where_clause.push_str(" AND created_at <= ?");
        values.push(SqlValue::Text(to));
    }

    let total: i64 = conn
        .query_row(
            &format!("SELECT COUNT(*) FROM admin_logs WHERE {}", where_clause),
            params_from_iter(values.iter()),
            |r| r.get(0),
        )
        .map_err(|e| AppError::db("db_query_failed", e))?;

    values.push(SqlValue::Integer(page_size));
    values.push(SqlValue::Integer((page - 1) * page_size));
    let mut stmt = conn
        .prepare(&format!(
            "SELECT id, action, admin_email, details, created_at
             FROM admin_logs WHERE {}
             ORDER BY created_at DESC, rowid DESC
             LIMIT ? OFFSET ?",
            where_clause
        ))
        .map_err(|e| AppError::db("db_query_failed", e))?;
    let logs = stmt
        .query_map(params_from_iter(values), |row| {
            let details: String = row.get(3)?;
            let details =
                serde_json::from_str::<Value>(&details).unwrap_or(Value::String(details));
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "action": row.get::<_, String>(1)?,
                "adminEmail": row.get::<_, String>(2)?,
                "details": details,
                "createdAt": row.get::<_, String>(4)?,
            }))
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AppError::db("db_query_failed", e))?;

    Ok(json!({
        "total": total,
        "page": page,
        "pageSize": page_size,
        "logs": logs,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "teachers.list" => handle_teachers_list(state, req),
        "teachers.create" => handle_teachers_create(state, req),
        "teachers.setup" => handle_teachers_setup(state, req),
        "teachers.setStatus" => handle_teachers_set_status(state, req),
        "periods.list" => handle_periods_list(state, req),
        "periods.students" => handle_periods_students(state, req),
        "periods.assign" => handle_periods_assign(state, req),
        "periods.drop" => handle_periods_drop(state, req),
        "activationCodes.list" => handle_codes_list(state, req),
        "activationCodes.create" => handle_codes_create(state, req),
        "activationCodes.redeem" => handle_codes_redeem(state, req),
        "adminLogs.list" => handle_admin_logs_list(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
