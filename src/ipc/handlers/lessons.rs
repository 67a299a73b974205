use crate::curriculum::{self, Band};
use crate::ipc::error::AppError;
use crate::ipc::handlers::setup::{load_lesson_settings, LessonSettings, STATUS_DRAFT, STATUS_PUBLISHED};
use crate::ipc::helpers::{
    db_conn, json_array_string, new_id, now_ts, parse_json_array_string, reply, require_actor,
    Params,
};
use crate::ipc::types::{Actor, AppState, Request};
use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension};
use serde_json::{json, Map, Value};

/// Free-text lesson sections: (request key, column).
const TEXT_FIELDS: [(&str, &str); 13] = [
    ("objectives", "objectives"),
    ("standards", "standards"),
    ("equipment", "equipment"),
    ("warmUp", "warm_up"),
    ("mainActivity", "main_activity"),
    ("modifications", "modifications"),
    ("assessment", "assessment"),
    ("closure", "closure"),
    ("notes", "notes"),
    ("progressionLevel", "progression_level"),
    ("teacherLookFors", "teacher_look_fors"),
    ("commonMistakes", "common_mistakes"),
    ("coachingLanguage", "coaching_language"),
];

const TEXT_OFFSET: usize = 7;

fn lesson_columns() -> String {
    let mut cols = vec![
        "id",
        "title",
        "band",
        "grade_group",
        "unit",
        "skill_focus",
        "duration_minutes",
    ];
    cols.extend(TEXT_FIELDS.iter().map(|(_, c)| *c));
    cols.extend([
        "resource_ids_json",
        "status",
        "created_by_email",
        "created_at",
        "updated_at",
    ]);
    cols.join(", ")
}

fn lesson_to_json(row: &rusqlite::Row<'_>) -> rusqlite::Result<Value> {
    let mut obj = Map::new();
    obj.insert("id".into(), json!(row.get::<_, String>(0)?));
    obj.insert("title".into(), json!(row.get::<_, String>(1)?));
    obj.insert("band".into(), json!(row.get::<_, String>(2)?));
    obj.insert("gradeGroup".into(), json!(row.get::<_, String>(3)?));
    obj.insert("unit".into(), json!(row.get::<_, Option<String>>(4)?));
    obj.insert("skillFocus".into(), json!(row.get::<_, Option<String>>(5)?));
    obj.insert("durationMinutes".into(), json!(row.get::<_, i64>(6)?));
    for (i, (key, _)) in TEXT_FIELDS.iter().enumerate() {
        obj.insert(
            (*key).to_string(),
            json!(row.get::<_, Option<String>>(TEXT_OFFSET + i)?),
        );
    }
    let tail = TEXT_OFFSET + TEXT_FIELDS.len();
    let resource_ids = parse_json_array_string(&row.get::<_, String>(tail)?);
    obj.insert("resourceIds".into(), json!(resource_ids));
    obj.insert("status".into(), json!(row.get::<_, String>(tail + 1)?));
    obj.insert("createdByEmail".into(), json!(row.get::<_, String>(tail + 2)?));
    obj.insert("createdAt".into(), json!(row.get::<_, String>(tail + 3)?));
    obj.insert("updatedAt".into(), json!(row.get::<_, String>(tail + 4)?));
    Ok(Value::Object(obj))
}

fn load_lesson(conn: &Connection, lesson_id: &str) -> Result<Option<Value>, AppError> {
    conn.query_row(
        &format!("SELECT {} FROM lessons WHERE id = ?", lesson_columns()),
        [lesson_id],
        lesson_to_json,
    )
    .optional()
    .map_err(|e| AppError::db("db_query_failed", e))
}

fn owner_of(lesson: &Value) -> &str {
    lesson
        .get("createdByEmail")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
}

fn is_owner(actor: &Actor, lesson: &Value) -> bool {
    actor.is_admin() || owner_of(lesson).eq_ignore_ascii_case(&actor.identity())
}

fn parse_status(raw: &str) -> Result<&'static str, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        STATUS_DRAFT => Ok(STATUS_DRAFT),
        STATUS_PUBLISHED => Ok(STATUS_PUBLISHED),
        _ => Err(AppError::bad_params("status must be one of: draft, published")),
    }
}

/// A validated lesson body, ready to write.
struct LessonFields {
    title: String,
    band: Band,
    grade_group: String,
    unit: Option<String>,
    skill_focus: Option<String>,
    duration_minutes: i64,
    texts: Vec<Option<String>>,
    resource_ids: Vec<String>,
}

fn validate_lesson(p: &Params<'_>, defaults: &LessonSettings) -> Result<LessonFields, AppError> {
    let title = p
        .opt_str("title")?
        .ok_or_else(|| AppError::bad_params("Title is required"))?;
    let band = match p.opt_str("band")? {
        Some(raw) => Band::parse(&raw)
            .ok_or_else(|| AppError::bad_params("band must be one of: ELEMENTARY, MIDDLE, HIGH"))?,
        None => defaults.default_band,
    };
    let grade_group = match p.opt_str("gradeGroup")? {
        Some(g) if band.grade_groups().contains(&g.as_str()) => g,
        Some(g) if curriculum::is_grade_group(&g) => {
            return Err(AppError::bad_params(format!(
                "gradeGroup {} does not belong to band {}",
                g,
                band.as_str()
            )))
        }
        Some(_) => {
            return Err(AppError::bad_params(
                "gradeGroup must be one of: K-2, 3-5, 6-8, 9-12",
            ))
        }
        None => band.grade_groups()[0].to_string(),
    };
    let unit = p.opt_str("unit")?;
    let skill_focus = p.opt_str("skillFocus")?;
    if let Some(sf) = skill_focus.as_deref() {
        let unit_key = unit.as_deref().unwrap_or_default();
        if !curriculum::is_skill_focus_valid_for_unit(unit_key, sf) {
            return Err(AppError::bad_params(format!(
                "skillFocus {} is not valid for unit {}",
                sf, unit_key
            )));
        }
    }
    let duration_minutes = match p.opt_i64("durationMinutes")? {
        Some(v) if v > 0 => v,
        Some(_) => return Err(AppError::bad_params("durationMinutes must be > 0")),
        None => defaults.default_duration_minutes,
    };
    let texts = TEXT_FIELDS
        .iter()
        .map(|(key, _)| p.opt_str(key))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LessonFields {
        title,
        band,
        grade_group,
        unit,
        skill_focus,
        duration_minutes,
        texts,
        resource_ids: p.strings("resourceIds")?,
    })
}

fn insert_lesson(
    conn: &Connection,
    fields: &LessonFields,
    status: &str,
    owner: &str,
) -> Result<String, AppError> {
    let id = new_id();
    let ts = now_ts();
    let mut values: Vec<SqlValue> = vec![
        SqlValue::Text(id.clone()),
        SqlValue::Text(fields.title.clone()),
        SqlValue::Text(fields.band.as_str().to_string()),
        SqlValue::Text(fields.grade_group.clone()),
        fields.unit.clone().map(SqlValue::Text).unwrap_or(SqlValue::Null),
        fields
            .skill_focus
            .clone()
            .map(SqlValue::Text)
            .unwrap_or(SqlValue::Null),
        SqlValue::Integer(fields.duration_minutes),
    ];
    values.extend(
        fields
            .texts
            .iter()
            .map(|t| t.clone().map(SqlValue::Text).unwrap_or(SqlValue::Null)),
    );
    values.extend([
        SqlValue::Text(json_array_string(&fields.resource_ids)),
        SqlValue::Text(status.to_string()),
        SqlValue::Text(owner.to_string()),
        SqlValue::Text(ts.clone()),
        SqlValue::Text(ts),
    ]);
    let placeholders = vec!["?"; values.len()].join(", ");
    conn.execute(
        &format!(
            "INSERT INTO lessons({}) VALUES({})",
            lesson_columns(),
            placeholders
        ),
        params_from_iter(values),
    )
    .map_err(|e| AppError::db("db_insert_failed", e))?;
    Ok(id)
}

fn handle_lessons_list(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_actor(req)?;
    let p = Params::new(&req.params);

    let mut where_clause = String::from("1 = 1");
    let mut values: Vec<SqlValue> = Vec::new();
    if !actor.is_admin() {
        where_clause.push_str(" AND (created_by_email = ? COLLATE NOCASE OR status = ?)");
        values.push(SqlValue::Text(actor.identity()));
        values.push(SqlValue::Text(STATUS_PUBLISHED.to_string()));
    }
    if let Some(raw) = p.opt_str("band")? {
        let band = Band::parse(&raw)
            .ok_or_else(|| AppError::bad_params("band must be one of: ELEMENTARY, MIDDLE, HIGH"))?;
        where_clause.push_str(" AND band = ?");
        values.push(SqlValue::Text(band.as_str().to_string()));
    }
    if let Some(g) = p.opt_str("gradeGroup")? {
        where_clause.push_str(" AND grade_group = ?");
        values.push(SqlValue::Text(g));
    }
    if let Some(u) = p.opt_str("unit")? {
        where_clause.push_str(" AND unit = ?");
        values.push(SqlValue::Text(u));
    }
    if let Some(s) = p.opt_str("status")? {
        where_clause.push_str(" AND status = ?");
        values.push(SqlValue::Text(parse_status(&s)?.to_string()));
    }
    if let Some(owner) = p.opt_str("createdBy")? {
        where_clause.push_str(" AND created_by_email = ? COLLATE NOCASE");
        values.push(SqlValue::Text(owner));
    }

    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM lessons WHERE {} ORDER BY updated_at DESC",
            lesson_columns(),
            where_clause
        ))
        .map_err(|e| AppError::db("db_query_failed", e))?;
    let lessons = stmt
        .query_map(params_from_iter(values), lesson_to_json)
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AppError::db("db_query_failed", e))?;
    Ok(json!({ "lessons": lessons }))
}

fn handle_lessons_get(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_actor(req)?;
    let lesson_id = Params::new(&req.params).req_str("lessonId")?;
    let lesson = load_lesson(conn, &lesson_id)?
        .filter(|l| is_owner(actor, l) || l.get("status").and_then(|s| s.as_str()) == Some(STATUS_PUBLISHED))
        .ok_or_else(|| AppError::not_found("Lesson not found"))?;
    Ok(json!({ "lesson": lesson }))
}

fn handle_lessons_create(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_actor(req)?;
    let defaults = load_lesson_settings(conn);
    let input = req
        .params
        .get("input")
        .filter(|v| v.is_object())
        .ok_or_else(|| AppError::bad_params("missing input"))?;
    let p = Params::nested(input, "input.");
    let fields = validate_lesson(&p, &defaults)?;
    let status = match p.opt_str("status")? {
        Some(s) => parse_status(&s)?,
        None => parse_status(&defaults.default_status)?,
    };
    let id = insert_lesson(conn, &fields, status, &actor.identity())?;
    let lesson = load_lesson(conn, &id)?.ok_or_else(|| AppError::not_found("Lesson not found"))?;
    Ok(json!({ "lessonId": id, "lesson": lesson }))
}

/// Lesson the actor may change; someone else's lesson is forbidden.
fn owned_lesson(conn: &Connection, actor: &Actor, lesson_id: &str) -> Result<Value, AppError> {
    let lesson =
        load_lesson(conn, lesson_id)?.ok_or_else(|| AppError::not_found("Lesson not found"))?;
    if !is_owner(actor, &lesson) {
        return Err(AppError::forbidden(
            "Forbidden. You can only change your own lessons.",
        ));
    }
    Ok(lesson)
}

fn handle_lessons_update(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_actor(req)?;
    let defaults = load_lesson_settings(conn);
    let lesson_id = Params::new(&req.params).req_str("lessonId")?;
    let patch = req
        .params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| AppError::bad_params("patch must be an object"))?;
    let current = owned_lesson(conn, actor, &lesson_id)?;

    // Patch over the stored lesson, then validate the whole body.
    let mut merged = current.as_object().cloned().unwrap_or_default();
    for (k, v) in patch {
        if matches!(
            k.as_str(),
            "id" | "status" | "createdByEmail" | "createdAt" | "updatedAt"
        ) {
            return Err(AppError::bad_params(format!("patch.{} cannot be changed", k)));
        }
        merged.insert(k.clone(), v.clone());
    }
    let merged = Value::Object(merged);
    let fields = validate_lesson(&Params::nested(&merged, "patch."), &defaults)?;

    let mut set_parts = vec![
        "title = ?",
        "band = ?",
        "grade_group = ?",
        "unit = ?",
        "skill_focus = ?",
        "duration_minutes = ?",
    ];
    let text_sets: Vec<String> = TEXT_FIELDS.iter().map(|(_, c)| format!("{} = ?", c)).collect();
    set_parts.extend(text_sets.iter().map(String::as_str));
    set_parts.extend(["resource_ids_json = ?", "updated_at = ?"]);

    let mut values: Vec<SqlValue> = vec![
        SqlValue::Text(fields.title),
        SqlValue::Text(fields.band.as_str().to_string()),
        SqlValue::Text(fields.grade_group),
        fields.unit.map(SqlValue::Text).unwrap_or(SqlValue::Null),
        fields.skill_focus.map(SqlValue::Text).unwrap_or(SqlValue::Null),
        SqlValue::Integer(fields.duration_minutes),
    ];
    values.extend(
        fields
            .texts
            .into_iter()
            .map(|t| t.map(SqlValue::Text).unwrap_or(SqlValue::Null)),
    );
    values.push(SqlValue::Text(json_array_string(&fields.resource_ids)));
    values.push(SqlValue::Text(now_ts()));
    values.push(SqlValue::Text(lesson_id.clone()));

    conn.execute(
        &format!("UPDATE lessons SET {} WHERE id = ?", set_parts.join(", ")),
        params_from_iter(values),
    )
    .map_err(|e| AppError::db("db_update_failed", e))?;
    let lesson =
        load_lesson(conn, &lesson_id)?.ok_or_else(|| AppError::not_found("Lesson not found"))?;
    Ok(json!({ "lesson": lesson }))
}

fn handle_lessons_delete(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_actor(req)?;
    let lesson_id = Params::new(&req.params).req_str("lessonId")?;
    owned_lesson(conn, actor, &lesson_id)?;
    conn.execute("DELETE FROM lessons WHERE id = ?", [&lesson_id])
        .map_err(|e| AppError::db("db_delete_failed", e))?;
    Ok(json!({ "ok": true }))
}

fn handle_lessons_copy(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_actor(req)?;
    let defaults = load_lesson_settings(conn);
    let lesson_id = Params::new(&req.params).req_str("lessonId")?;
    let source =
        load_lesson(conn, &lesson_id)?.ok_or_else(|| AppError::not_found("Lesson not found"))?;
    if !is_owner(actor, &source) {
        return Err(AppError::forbidden(
            "Forbidden. You can only copy your own lessons.",
        ));
    }

    let mut fields = validate_lesson(&Params::new(&source), &defaults)?;
    fields.title = format!("Copy of {}", fields.title);
    let id = insert_lesson(conn, &fields, STATUS_DRAFT, &actor.identity())?;
    let lesson = load_lesson(conn, &id)?.ok_or_else(|| AppError::not_found("Lesson not found"))?;
    Ok(json!({ "lessonId": id, "lesson": lesson }))
}

fn handle_lessons_set_status(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_actor(req)?;
    let p = Params::new(&req.params);
    let lesson_id = p.req_str("lessonId")?;
    let status = parse_status(&p.req_str("status")?)?;
    owned_lesson(conn, actor, &lesson_id)?;
    conn.execute(
        "UPDATE lessons SET status = ?, updated_at = ? WHERE id = ?",
        params![status, now_ts(), lesson_id],
    )
    .map_err(|e| AppError::db("db_update_failed", e))?;
    Ok(json!({ "ok": true, "status": status }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "lessons.list" => handle_lessons_list(state, req),
        "lessons.get" => handle_lessons_get(state, req),
        "lessons.create" => handle_lessons_create(state, req),
        "lessons.update" => handle_lessons_update(state, req),
        "lessons.delete" => handle_lessons_delete(state, req),
        "lessons.copy" => handle_lessons_copy(state, req),
        "lessons.setStatus" => handle_lessons_set_status(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
