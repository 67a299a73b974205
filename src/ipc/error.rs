use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Handler failure, mapped onto a stable protocol error code.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadParams(String),
    #[error("select a workspace first")]
    NoWorkspace,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{message}")]
    Db { code: &'static str, message: String },
    #[error("{0}")]
    Import(String),
}

impl AppError {
    pub fn bad_params(msg: impl Into<String>) -> Self {
        AppError::BadParams(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn db(code: &'static str, e: impl std::fmt::Display) -> Self {
        AppError::Db {
            code,
            message: e.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::BadParams(_) => "bad_params",
            AppError::NoWorkspace => "no_workspace",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::Db { code, .. } => code,
            AppError::Import(_) => "import_failed",
        }
    }

    pub fn to_response(&self, id: &str) -> serde_json::Value {
        err(id, self.code(), self.to_string(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_carry_codes_and_messages() {
        let e = AppError::db("db_insert_failed", "UNIQUE constraint failed");
        let v = e.to_response("7");
        assert_eq!(v["id"], "7");
        assert_eq!(v["ok"], false);
        assert_eq!(v["error"]["code"], "db_insert_failed");
        assert_eq!(v["error"]["message"], "UNIQUE constraint failed");

        assert_eq!(AppError::NoWorkspace.code(), "no_workspace");
        assert_eq!(AppError::NoWorkspace.to_string(), "select a workspace first");
        assert_eq!(AppError::Import("bad".into()).code(), "import_failed");
    }

    #[test]
    fn details_are_optional() {
        let v = err("1", "bad_params", "missing x", Some(json!({"field": "x"})));
        assert_eq!(v["error"]["details"]["field"], "x");
        assert!(err("1", "bad_params", "m", None)["error"].get("details").is_none());
    }
}
