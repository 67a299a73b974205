use crate::calc;
use crate::improvement::compare_measurements;
use crate::ipc::error::AppError;
use crate::ipc::handlers::setup::{load_assessment_settings, AssessmentSettings};
use crate::ipc::helpers::{reply, today, Params};
use crate::ipc::types::{AppState, Request};
use crate::standards::{Band, SexKey};
use crate::zones::{self, Component};
use serde_json::{json, Value};

/// Age from `age`, or from `dateOfBirth` on `testDate` (today when absent).
fn resolve_age(p: &Params<'_>) -> Result<Option<i32>, AppError> {
    if let Some(age) = p.opt_i64("age")? {
        return i32::try_from(age)
            .map(Some)
            .map_err(|_| AppError::bad_params("age out of range"));
    }
    let dob = p.opt_str("dateOfBirth")?;
    let on = p
        .opt_str("testDate")?
        .unwrap_or_else(|| today().format("%Y-%m-%d").to_string());
    Ok(calc::age_from_strs(dob.as_deref(), Some(&on)))
}

fn component_param(p: &Params<'_>, default: Option<Component>) -> Result<Component, AppError> {
    match p.opt_str("component")? {
        Some(raw) => Component::parse(&raw)
            .ok_or_else(|| AppError::bad_params(format!("unknown component: {}", raw))),
        None => default.ok_or_else(|| AppError::bad_params("missing component")),
    }
}

fn handle_age(_state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let p = Params::new(&req.params);
    let dob = p.req_str("dateOfBirth")?;
    let on = p.opt_str("on")?;
    let on = on.or(p.opt_str("testDate")?);
    let age = match on {
        Some(on) => calc::age_from_strs(Some(&dob), Some(&on)),
        None => calc::age_on(calc::parse_date(&dob), Some(today())),
    };
    Ok(json!({ "age": age }))
}

fn handle_bmi(_state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let p = Params::new(&req.params);
    let bmi = calc::bmi(p.opt_f64("height")?, p.opt_f64("weight")?);
    Ok(json!({
        "bmi": bmi,
        "rounded": bmi.map(calc::round_off_1_decimal),
    }))
}

fn handle_zone(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let p = Params::new(&req.params);
    let component = component_param(&p, None)?;
    let value = p.opt_f64("value")?;
    let age = resolve_age(&p)?;
    let sex = p.opt_str("sex")?;
    let zone = zones::classify(&state.standards, component, value, age, sex.as_deref());
    let sex_key = sex.as_deref().and_then(SexKey::resolve);
    let band = match (age, sex_key) {
        (Some(age), Some(sex)) => state.standards.band(sex, age, component),
        _ => None,
    };
    Ok(json!({
        "component": component.as_str(),
        "age": age,
        "sexKey": sex_key.map(SexKey::as_str),
        "zone": zone,
        "label": zone.label(),
        "band": band,
    }))
}

fn handle_compare(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let p = Params::new(&req.params);
    let fall = p.opt_f64("fall")?;
    let spring = p.opt_f64("spring")?;
    let band = match p.raw("band").filter(|v| !v.is_null()) {
        Some(raw) => serde_json::from_value::<Band>(raw.clone())
            .map_err(|e| AppError::bad_params(format!("band {}", e)))?,
        None => {
            let component = component_param(&p, Some(Component::Pacer))?;
            let age = resolve_age(&p)?;
            let sex = p.opt_str("sex")?;
            match (age, sex.as_deref().and_then(SexKey::resolve)) {
                (Some(age), Some(sex)) => state
                    .standards
                    .band(sex, age, component)
                    .unwrap_or_default(),
                _ => Band::default(),
            }
        }
    };
    let settings = state
        .db
        .as_ref()
        .map(load_assessment_settings)
        .unwrap_or_else(AssessmentSettings::default);
    let cmp = compare_measurements(fall, spring, band, &settings.thresholds);
    Ok(json!({ "band": band, "comparison": cmp }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "scoring.age" => handle_age(state, req),
        "scoring.bmi" => handle_bmi(state, req),
        "scoring.zone" => handle_zone(state, req),
        "scoring.compare" => handle_compare(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
