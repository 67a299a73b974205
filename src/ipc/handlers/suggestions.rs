use crate::curriculum::Band;
use crate::ipc::error::AppError;
use crate::ipc::helpers::{reply, Params};
use crate::ipc::types::{AppState, Request};
use crate::suggestions::{self, DraftInput, PlanMyGameInput, MAX_VARIANTS};
use serde_json::{json, Value};

fn draft_input(req: &Request) -> Result<DraftInput, AppError> {
    let mut input: DraftInput = serde_json::from_value(req.params.clone())
        .map_err(|e| AppError::bad_params(format!("invalid draft input: {}", e)))?;
    let band = Band::parse(&input.band)
        .ok_or_else(|| AppError::bad_params("band must be one of: ELEMENTARY, MIDDLE, HIGH"))?;
    input.band = band.as_str().to_string();
    if input.duration_minutes <= 0 {
        return Err(AppError::bad_params("durationMinutes must be > 0"));
    }
    Ok(input)
}

fn handle_draft(_state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let input = draft_input(req)?;
    Ok(json!({ "draft": suggestions::lesson_draft(&input) }))
}

fn handle_variants(_state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let input = draft_input(req)?;
    let p = Params::new(&req.params);
    let count = p.opt_i64("count")?.unwrap_or(3).clamp(1, MAX_VARIANTS as i64) as usize;
    let seed = match p.opt_i64("seed")? {
        Some(s) => Some(
            u32::try_from(s).map_err(|_| AppError::bad_params("seed must be a 32-bit unsigned integer"))?,
        ),
        None => None,
    };
    Ok(json!(suggestions::draft_variants(&input, count, seed)))
}

fn handle_plan_my_game(_state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let input: PlanMyGameInput = serde_json::from_value(req.params.clone())
        .map_err(|e| AppError::bad_params(format!("invalid game input: {}", e)))?;
    if input.game.trim().is_empty() {
        return Err(AppError::bad_params("game is required"));
    }
    if input.duration_minutes <= 0 {
        return Err(AppError::bad_params("durationMinutes must be > 0"));
    }
    Ok(json!({ "lesson": suggestions::plan_my_game(&input) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "suggestions.draft" => handle_draft(state, req),
        "suggestions.variants" => handle_variants(state, req),
        "suggestions.planMyGame" => handle_plan_my_game(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
