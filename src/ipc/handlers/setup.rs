use crate::curriculum;
use crate::db;
use crate::improvement::ImprovementThresholds;
use crate::ipc::error::AppError;
use crate::ipc::helpers::{db_conn, log_admin_action, reply, require_admin};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Map, Value};

pub const STATUS_DRAFT: &str = "draft";
pub const STATUS_PUBLISHED: &str = "published";

#[derive(Clone, Copy)]
enum SetupSection {
    Assessment,
    Lessons,
}

impl SetupSection {
    const ALL: [SetupSection; 2] = [SetupSection::Assessment, SetupSection::Lessons];

    fn parse(s: &str) -> Option<Self> {
        match s {
            "assessment" => Some(Self::Assessment),
            "lessons" => Some(Self::Lessons),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Assessment => "assessment",
            Self::Lessons => "lessons",
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Assessment => "setup.assessment",
            Self::Lessons => "setup.lessons",
        }
    }
}

fn default_section(section: SetupSection) -> Value {
    match section {
        SetupSection::Assessment => {
            let t = ImprovementThresholds::default();
            json!({
                "significantLapDelta": t.significant_lap_delta,
                "significantPercent": t.significant_percent,
                "clearChangeLaps": t.clear_change_laps,
                "overallHfzComponents": t.overall_hfz_components,
                "improvedComponents": t.improved_components,
                "schoolYearStartMonth": 8
            })
        }
        SetupSection::Lessons => json!({
            "defaultDurationMinutes": 45,
            "defaultStatus": STATUS_DRAFT,
            "defaultBand": "ELEMENTARY"
        }),
    }
}

fn as_object_mut(value: &mut Value) -> Result<&mut Map<String, Value>, String> {
    value
        .as_object_mut()
        .ok_or_else(|| "internal setup object must be a JSON object".to_string())
}

fn parse_i64_range(v: &Value, key: &str, min: i64, max: i64) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_f64_range(v: &Value, key: &str, min: f64, max: f64) -> Result<f64, String> {
    let n = v
        .as_f64()
        .ok_or_else(|| format!("{} must be a number", key))?;
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_string_max(v: &Value, key: &str, max_len: usize) -> Result<String, String> {
    let s = v.as_str().ok_or_else(|| format!("{} must be string", key))?;
    let s = s.trim();
    if s.len() > max_len {
        return Err(format!("{} length must be <= {}", key, max_len));
    }
    Ok(s.to_string())
}

fn merge_section_patch(
    section: SetupSection,
    current: &mut Value,
    patch: &Map<String, Value>,
) -> Result<(), String> {
    let obj = as_object_mut(current)?;
    for (k, v) in patch {
        match section {
            SetupSection::Assessment => match k.as_str() {
                "significantLapDelta" | "clearChangeLaps" => {
                    obj.insert(k.clone(), Value::from(parse_f64_range(v, k, 0.0, 100.0)?));
                }
                "significantPercent" => {
                    obj.insert(k.clone(), Value::from(parse_f64_range(v, k, 0.0, 100.0)?));
                }
                "overallHfzComponents" | "improvedComponents" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 5)?));
                }
                "schoolYearStartMonth" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 1, 12)?));
                }
                _ => return Err(format!("unknown assessment field: {}", k)),
            },
            SetupSection::Lessons => match k.as_str() {
                "defaultDurationMinutes" => {
                    obj.insert(k.clone(), Value::from(parse_i64_range(v, k, 5, 240)?));
                }
                "defaultStatus" => {
                    let s = parse_string_max(v, k, 16)?.to_ascii_lowercase();
                    if s != STATUS_DRAFT && s != STATUS_PUBLISHED {
                        return Err("defaultStatus must be one of: draft, published".into());
                    }
                    obj.insert(k.clone(), Value::String(s));
                }
                "defaultBand" => {
                    let s = parse_string_max(v, k, 16)?;
                    let band = curriculum::Band::parse(&s).ok_or_else(|| {
                        "defaultBand must be one of: ELEMENTARY, MIDDLE, HIGH".to_string()
                    })?;
                    obj.insert(k.clone(), Value::String(band.as_str().to_string()));
                }
                _ => return Err(format!("unknown lessons field: {}", k)),
            },
        }
    }
    Ok(())
}

fn load_section(conn: &rusqlite::Connection, section: SetupSection) -> anyhow::Result<Value> {
    let mut current = default_section(section);
    if let Some(saved) = db::settings_get_json(conn, section.key())? {
        if let Some(saved_obj) = saved.as_object() {
            // Malformed historical values must not block setup.
            let _ = merge_section_patch(section, &mut current, saved_obj);
        }
    }
    Ok(current)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssessmentSettings {
    pub thresholds: ImprovementThresholds,
    pub school_year_start_month: u32,
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        Self {
            thresholds: ImprovementThresholds::default(),
            school_year_start_month: 8,
        }
    }
}

/// Assessment thresholds for this workspace. Unreadable settings fall back
/// to defaults.
pub fn load_assessment_settings(conn: &rusqlite::Connection) -> AssessmentSettings {
    let Ok(obj) = load_section(conn, SetupSection::Assessment) else {
        return AssessmentSettings::default();
    };
    let thresholds = serde_json::from_value(obj.clone()).unwrap_or_default();
    let school_year_start_month = obj
        .get("schoolYearStartMonth")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .filter(|m| (1..=12).contains(m))
        .unwrap_or(8);
    AssessmentSettings {
        thresholds,
        school_year_start_month,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LessonSettings {
    pub default_duration_minutes: i64,
    pub default_status: String,
    pub default_band: curriculum::Band,
}

pub fn load_lesson_settings(conn: &rusqlite::Connection) -> LessonSettings {
    let obj = load_section(conn, SetupSection::Lessons)
        .unwrap_or_else(|_| default_section(SetupSection::Lessons));
    LessonSettings {
        default_duration_minutes: obj
            .get("defaultDurationMinutes")
            .and_then(|v| v.as_i64())
            .filter(|v| *v > 0)
            .unwrap_or(45),
        default_status: obj
            .get("defaultStatus")
            .and_then(|v| v.as_str())
            .unwrap_or(STATUS_DRAFT)
            .to_string(),
        default_band: obj
            .get("defaultBand")
            .and_then(|v| v.as_str())
            .and_then(curriculum::Band::parse)
            .unwrap_or(curriculum::Band::Elementary),
    }
}

fn handle_setup_get(state: &mut AppState, _req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let mut out = Map::new();
    for section in SetupSection::ALL {
        let v = load_section(conn, section).map_err(|e| AppError::db("db_query_failed", e))?;
        out.insert(section.name().to_string(), v);
    }
    Ok(Value::Object(out))
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> Result<Value, AppError> {
    let conn = db_conn(state)?;
    let actor = require_admin(req)?;
    let section_raw = req
        .params
        .get("section")
        .and_then(|v| v.as_str())
        .ok_or_else(|| AppError::bad_params("missing section"))?;
    let section =
        SetupSection::parse(section_raw).ok_or_else(|| AppError::bad_params("unknown section"))?;
    let patch_obj = req
        .params
        .get("patch")
        .and_then(|v| v.as_object())
        .ok_or_else(|| AppError::bad_params("patch must be an object"))?;

    let mut current = load_section(conn, section).map_err(|e| AppError::db("db_query_failed", e))?;
    merge_section_patch(section, &mut current, patch_obj).map_err(AppError::BadParams)?;
    db::settings_set_json(conn, section.key(), &current)
        .map_err(|e| AppError::db("db_update_failed", e))?;
    tracing::info!(section = section.name(), "setup section updated");
    log_admin_action(
        conn,
        actor,
        "setup_update",
        json!({ "section": section.name(), "patch": patch_obj }),
    );
    Ok(json!({ "ok": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "setup.get" => handle_setup_get(state, req),
        "setup.update" => handle_setup_update(state, req),
        _ => return None,
    };
    Some(reply(req, result))
}
