use crate::curriculum::{self, ActivityQuery, Band, Intent, ResourceType};
use crate::ipc::error::AppError;
use crate::ipc::helpers::{db_conn, log_admin_action, new_id, now_ts, reply, require_admin, Params};
use crate::ipc::types::{AppState, Request};
use rusqlite::{params, params_from_iter, types::Value as SqlValue, Connection, OptionalExtension};
use serde_json::{json, Value};

const RESOURCE_COLUMNS: &str = "id, title, description, band, grade, unit, subject, tags, type, external_url, created_by, uploaded_at";

fn resource_to_json(row: &rusqlite::Row<'_>) -> rusqlite::Result<Value> {
    Ok(json!({
        "id": row.get::<_, String>(0)?,
        "title": row.get::<_, String>(1)?,
        "description": row.get::<_, Option<String>>(2)?,
        "band": row.get::<_, String>(3)?,
        "grade": row.get::<_, Option<String>>(4)?,
        "unit": row.get::<_, Option<String>>(5)?,
        "subject": row.get::<_, Option<String>>(6)?,
        "tags": row.get::<_, Option<String>>(7)?,
        "type": row.get::<_, String>(8)?,
        "externalUrl": row.get::<_, Option<String>>(9)?,
        "createdBy": row.get::<_, String>(10)?,
        "uploadedAt": row.get::<_, String>(11)?,
    }))
}

fn load_resource(conn: &Connection, id: &str) -> Result<Option<Value>, AppError> {
    conn.query_row(
        &format!("SELECT {} FROM curriculum_resources WHERE id = ?", RESOURCE_COLUMNS),
        [id],
        resource_to_json,
    )
    .optional()
    .map_err(|e| AppError::db("db_query_failed", e))
}

fn parse_band(raw: Option<String>) -> Result<Option<Band>, AppError> {
    raw.map(|b| {
        Band::parse(&b).ok_or_else(|| AppError::bad_params("band must be one of: ELEMENTARY, MIDDLE, HIGH"))
    })
    .transpose()
}

fn handle_curriculum_list(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let p = Params::new(&req.params);

    let mut where_clause = String::from("1 = 1");
    let mut values: Vec<SqlValue> = Vec::new();
    if let Some(band) = parse_band(p.opt_str("band")?)? {
        where_clause.push_str(" AND band = ?");
        values.push(SqlValue::Text(band.as_str().to_string()));
    }
    for (param, column) in [("grade", "grade"), ("unit", "unit"), ("subject", "subject")] {
        if let Some(v) = p.opt_str(param)? {
            where_clause.push_str(&format!(" AND {} = ?", column));
            values.push(SqlValue::Text(v));
        }
    }
    if let Some(raw) = p.opt_str("type")? {
        let t = ResourceType::parse(&raw)
            .ok_or_else(|| AppError::bad_params("type must be one of: pdf, doc, link"))?;
        where_clause.push_str(" AND type = ?");
        values.push(SqlValue::Text(t.as_str().to_string()));
    }
    if let Some(search) = p.opt_str("search")? {
        where_clause.push_str(
            " AND (title LIKE ? COLLATE NOCASE OR description LIKE ? COLLATE NOCASE OR tags LIKE ? COLLATE NOCASE)",
        );
        let pattern = format!("%{}%", search);
        for _ in 0..3 {
            values.push(SqlValue::Text(pattern.clone()));
        }
    }

    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM curriculum_resources WHERE {} ORDER BY uploaded_at DESC",
            RESOURCE_COLUMNS, where_clause
        ))
        .map_err(|e| AppError::db("db_query_failed", e))?;
    let resources = stmt
        .query_map(params_from_iter(values), resource_to_json)
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(|e| AppError::db("db_query_failed", e))?;
    Ok(json!({ "resources": resources }))
}

fn handle_curriculum_create(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_admin(req)?;
    let p = Params::new(&req.params);

    let (Some(title), Some(type_raw)) = (p.opt_str("title")?, p.opt_str("type")?) else {
        return Err(AppError::bad_params("Title and type are required"));
    };
    let resource_type = ResourceType::parse(&type_raw)
        .ok_or_else(|| AppError::bad_params("type must be one of: pdf, doc, link"))?;
    let band = parse_band(p.opt_str("band")?)?.unwrap_or(Band::Elementary);
    let external_url = match resource_type {
        ResourceType::Link => p.opt_str("externalUrl")?,
        ResourceType::Pdf | ResourceType::Doc => None,
    };

    let id = new_id();
    conn.execute(
        "INSERT INTO curriculum_resources(
            id, title, description, band, grade, unit, subject, tags, type, external_url, created_by, uploaded_at
         ) VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'admin', ?)",
        params![
            id,
            title,
            p.opt_str("description")?,
            band.as_str(),
            p.opt_str("grade")?,
            p.opt_str("unit")?,
            p.opt_str("subject")?,
            p.opt_str("tags")?,
            resource_type.as_str(),
            external_url,
            now_ts()
        ],
    )
    .map_err(|e| AppError::db("db_insert_failed", e))?;
    log_admin_action(
        conn,
        actor,
        "curriculum_create",
        json!({ "resourceId": id, "title": title }),
    );
    let resource = load_resource(conn, &id)?.ok_or_else(|| AppError::not_found("Resource not found"))?;
    Ok(json!({ "resource": resource }))
}

fn handle_curriculum_update(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_admin(req)?;
    let resource_id = Params::new(&req.params).req_str("resourceId")?;
    let patch = req
        .params
        .get("patch")
        .filter(|v| v.is_object())
        .ok_or_else(|| AppError::bad_params("patch must be an object"))?;
    let p = Params::nested(patch, "patch.");

    let current =
        load_resource(conn, &resource_id)?.ok_or_else(|| AppError::not_found("Resource not found"))?;

    let mut set_parts: Vec<&str> = Vec::new();
    let mut values: Vec<SqlValue> = Vec::new();
    if p.has("title") {
        let title = p.req_str("title")?;
        set_parts.push("title = ?");
        values.push(SqlValue::Text(title));
    }
    if p.has("band") {
        let band = parse_band(p.opt_str("band")?)?.unwrap_or(Band::Elementary);
        set_parts.push("band = ?");
        values.push(SqlValue::Text(band.as_str().to_string()));
    }
    for (key, column) in [
        ("description", "description = ?"),
        ("grade", "grade = ?"),
        ("unit", "unit = ?"),
        ("subject", "subject = ?"),
        ("tags", "tags = ?"),
    ] {
        if p.has(key) {
            set_parts.push(column);
            values.push(p.opt_str(key)?.map(SqlValue::Text).unwrap_or(SqlValue::Null));
        }
    }

    let current_type = current
        .get("type")
        .and_then(|v| v.as_str())
        .and_then(ResourceType::parse)
        .unwrap_or(ResourceType::Pdf);
    let resource_type = match p.opt_str("type")? {
        Some(raw) => {
            let t = ResourceType::parse(&raw)
                .ok_or_else(|| AppError::bad_params("type must be one of: pdf, doc, link"))?;
            set_parts.push("type = ?");
            values.push(SqlValue::Text(t.as_str().to_string()));
            t
        }
        None => current_type,
    };
    if resource_type != ResourceType::Link {
        set_parts.push("external_url = NULL");
    } else if p.has("externalUrl") {
        set_parts.push("external_url = ?");
        values.push(
            p.opt_str("externalUrl")?
                .map(SqlValue::Text)
                .unwrap_or(SqlValue::Null),
        );
    }

    if !set_parts.is_empty() {
        values.push(SqlValue::Text(resource_id.clone()));
        let sql = format!(
            "UPDATE curriculum_resources SET {} WHERE id = ?",
            set_parts.join(", ")
        );
        conn.execute(&sql, params_from_iter(values))
            .map_err(|e| AppError::db("db_update_failed", e))?;
        log_admin_action(
            conn,
            actor,
            "curriculum_update",
            json!({ "resourceId": resource_id }),
        );
    }
    let resource =
        load_resource(conn, &resource_id)?.ok_or_else(|| AppError::not_found("Resource not found"))?;
    Ok(json!({ "resource": resource }))
}

fn handle_curriculum_delete(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_admin(req)?;
    let resource_id = Params::new(&req.params).req_str("resourceId")?;
    let n = conn
        .execute("DELETE FROM curriculum_resources WHERE id = ?", [&resource_id])
        .map_err(|e| AppError::db("db_delete_failed", e))?;
    if n == 0 {
        return Err(AppError::not_found("Resource not found"));
    }
    log_admin_action(
        conn,
        actor,
        "curriculum_delete",
        json!({ "resourceId": resource_id }),
    );
    Ok(json!({ "ok": true }))
}

fn handle_skill_focus_options(_state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let unit = Params::new(&req.params).opt_str("unit")?.unwrap_or_default();
    Ok(json!({ "options": curriculum::skill_focus_options(&unit) }))
}

fn handle_activity_suggestions(_state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let p = Params::new(&req.params);
    let intent = match p.opt_str("intent")? {
        Some(raw) => Some(Intent::parse(&raw).ok_or_else(|| {
            AppError::bad_params("intent must be one of: Introduce, Practice, Apply, Review-Assess")
        })?),
        None => None,
    };
    let query = ActivityQuery {
        unit: p.opt_str("unit")?,
        skill_focus: p.opt_str("skillFocus")?,
        grade_band: p.opt_str("gradeBand")?,
        intent,
    };
    Ok(json!({ "suggestions": curriculum::activity_suggestions(&query) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "curriculum.list" => handle_curriculum_list(state, req),
        "curriculum.create" => handle_curriculum_create(state, req),
        "curriculum.update" => handle_curriculum_update(state, req),
        "curriculum.delete" => handle_curriculum_delete(state, req),
        "curriculum.skillFocusOptions" => handle_skill_focus_options(state, req),
        "curriculum.activitySuggestions" => handle_activity_suggestions(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
