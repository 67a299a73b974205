use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::standards::StandardsTable;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
}

/// Who is making the request. Carried per request; the sidecar keeps no
/// session state.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub role: Role,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub teacher_id: Option<String>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Identity recorded on owned rows and admin log entries.
    pub fn identity(&self) -> String {
        match self.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
            Some(email) => email.to_string(),
            None if self.is_admin() => "admin".to_string(),
            None => self.teacher_id.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub actor: Option<Actor>,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub standards: StandardsTable,
}
