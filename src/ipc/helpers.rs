use chrono::{NaiveDate, SecondsFormat, Utc};
use rusqlite::Connection;
use serde_json::Value;
use uuid::Uuid;

use crate::ipc::error::{ok, AppError};
use crate::ipc::types::{Actor, AppState, Request};

pub fn db_conn(state: &AppState) -> Result<&Connection, AppError> {
    state.db.as_ref().ok_or(AppError::NoWorkspace)
}

/// Millisecond UTC timestamps; they sort lexicographically.
pub fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn parse_bool(v: Option<&Value>, default: bool) -> Result<bool, &'static str> {
    match v {
        None => Ok(default),
        Some(v) if v.is_null() => Ok(default),
        Some(v) => v.as_bool().ok_or("must be boolean"),
    }
}

pub fn parse_opt_string(v: Option<&Value>) -> Result<Option<String>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => {
            let s = v.as_str().ok_or("must be string or null")?.trim().to_string();
            if s.is_empty() {
                Ok(None)
            } else {
                Ok(Some(s))
            }
        }
    }
}

pub fn parse_opt_i64(v: Option<&Value>) -> Result<Option<i64>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        // Form fields often arrive as strings.
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(|_| "must be integer or null"),
        Some(v) => v.as_i64().map(Some).ok_or("must be integer or null"),
    }
}

pub fn parse_opt_f64(v: Option<&Value>) -> Result<Option<f64>, &'static str> {
    match v {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(Some)
            .ok_or("must be number or null"),
        Some(v) => v.as_f64().map(Some).ok_or("must be number or null"),
    }
}

pub fn parse_string_array(v: Option<&Value>) -> Result<Vec<String>, &'static str> {
    match v {
        None => Ok(Vec::new()),
        Some(v) if v.is_null() => Ok(Vec::new()),
        Some(v) => {
            let arr = v.as_array().ok_or("must be array of strings")?;
            let mut out = Vec::with_capacity(arr.len());
            for item in arr {
                let s = item
                    .as_str()
                    .ok_or("must be array of strings")?
                    .trim()
                    .to_string();
                if !s.is_empty() {
                    out.push(s);
                }
            }
            Ok(out)
        }
    }
}

/// Field accessors over a params object that name the offending key.
pub struct Params<'a> {
    obj: &'a Value,
    prefix: &'a str,
}

impl<'a> Params<'a> {
    pub fn new(obj: &'a Value) -> Self {
        Self { obj, prefix: "" }
    }

    pub fn nested(obj: &'a Value, prefix: &'a str) -> Self {
        Self { obj, prefix }
    }

    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.obj.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.obj.get(key).is_some()
    }

    fn bad(&self, key: &str, m: &str) -> AppError {
        AppError::bad_params(format!("{}{} {}", self.prefix, key, m))
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<String>, AppError> {
        parse_opt_string(self.obj.get(key)).map_err(|m| self.bad(key, m))
    }

    pub fn req_str(&self, key: &str) -> Result<String, AppError> {
        self.opt_str(key)?
            .ok_or_else(|| AppError::bad_params(format!("missing {}{}", self.prefix, key)))
    }

    pub fn opt_i64(&self, key: &str) -> Result<Option<i64>, AppError> {
        parse_opt_i64(self.obj.get(key)).map_err(|m| self.bad(key, m))
    }

    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>, AppError> {
        parse_opt_f64(self.obj.get(key)).map_err(|m| self.bad(key, m))
    }

    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>, AppError> {
        match self.obj.get(key) {
            None => Ok(None),
            Some(v) if v.is_null() => Ok(None),
            v => parse_bool(v, false).map(Some).map_err(|m| self.bad(key, m)),
        }
    }

    pub fn strings(&self, key: &str) -> Result<Vec<String>, AppError> {
        parse_string_array(self.obj.get(key)).map_err(|m| self.bad(key, m))
    }
}

pub fn json_array_string(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

pub fn parse_json_array_string(raw: &str) -> Vec<String> {
    serde_json::from_str::<Vec<String>>(raw).unwrap_or_default()
}

pub fn require_actor(req: &Request) -> Result<&Actor, AppError> {
    req.actor
        .as_ref()
        .ok_or_else(|| AppError::forbidden("Unauthorized"))
}

pub fn require_admin(req: &Request) -> Result<&Actor, AppError> {
    let actor = require_actor(req)?;
    if !actor.is_admin() {
        return Err(AppError::forbidden("Forbidden. Admin access required."));
    }
    Ok(actor)
}

/// Record an administrative action. Best-effort: a failed audit write never
/// fails the request that caused it.
pub fn log_admin_action(conn: &Connection, actor: &Actor, action: &str, details: Value) {
    let details = serde_json::to_string(&details).unwrap_or_else(|_| "{}".to_string());
    if let Err(e) = conn.execute(
        "INSERT INTO admin_logs(id, action, admin_email, details, created_at) VALUES(?, ?, ?, ?, ?)",
        (new_id(), action, actor.identity(), details, now_ts()),
    ) {
        tracing::warn!(action, error = %e, "failed to write admin log");
    }
}

/// Wrap a handler result in the response envelope, logging failures.
pub fn reply(req: &Request, result: Result<Value, AppError>) -> Value {
    match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => {
            tracing::warn!(method = %req.method, code = e.code(), error = %e, "request failed");
            e.to_response(&req.id)
        }
    }
}
