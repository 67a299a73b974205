use crate::db;
use crate::ipc::error::AppError;
use crate::ipc::helpers::reply;
use crate::ipc::types::{AppState, Request};
use crate::standards::SexKey;
use serde_json::{json, Value};
use std::path::PathBuf;

fn handle_health(state: &mut AppState, _req: &Request) -> Result<Value, AppError> {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
        "standards": state.standards.source(),
    }))
}

/// Open (or create) a workspace and make it current.
pub fn open_workspace(state: &mut AppState, path: PathBuf) -> anyhow::Result<()> {
    let conn = db::open_db(&path)?;
    tracing::info!(workspace = %path.display(), "workspace opened");
    state.workspace = Some(path);
    state.db = Some(conn);
    Ok(())
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let path = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| AppError::bad_params("missing params.path"))?;

    open_workspace(state, path.clone()).map_err(|e| AppError::db("db_open_failed", format!("{e:?}")))?;
    Ok(json!({ "workspacePath": path.to_string_lossy() }))
}

fn handle_standards_info(state: &mut AppState, _req: &Request) -> Result<Value, AppError> {
    let s = &state.standards;
    Ok(json!({
        "source": s.source(),
        "fingerprint": s.fingerprint(),
        "ageKeys": {
            "boys": s.age_keys(SexKey::Boys),
            "girls": s.age_keys(SexKey::Girls),
        }
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state, req),
        "workspace.select" => handle_workspace_select(state, req),
        "standards.info" => handle_standards_info(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
