use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use crate::zones::Component;

const BUNDLED_STANDARDS: &str = include_str!("../assets/fitnessgram-standards.json");

/// Ages at or above this share the adult-normed `17+` rows.
pub const ADULT_AGE: i32 = 17;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Band {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Band {
    #[cfg(test)]
    pub fn min(min: f64) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    #[cfg(test)]
    pub fn range(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Inclusive membership used by the Fall/Spring tracker. A missing bound is
    /// treated as open.
    pub fn contains(&self, v: f64) -> bool {
        self.min.map(|m| v >= m).unwrap_or(true) && self.max.map(|m| v <= m).unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardioRow {
    #[serde(default)]
    pacer20: Option<Band>,
    #[serde(default)]
    one_mile_run: Option<Band>,
    #[serde(default)]
    bmi: Option<Band>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MuscularRow {
    #[serde(default)]
    curlup: Option<Band>,
    #[serde(default)]
    trunk_lift: Option<Band>,
    #[serde(default)]
    pushup90: Option<Band>,
    #[serde(default)]
    sit_and_reach: Option<Band>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SexTable {
    #[serde(default)]
    cardio: BTreeMap<String, CardioRow>,
    #[serde(default)]
    muscular: BTreeMap<String, MuscularRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SexKey {
    Boys,
    Girls,
}

impl SexKey {
    /// `M...` (any case) maps to boys, every other non-blank value to girls.
    pub fn resolve(sex: &str) -> Option<SexKey> {
        let t = sex.trim();
        if t.is_empty() {
            return None;
        }
        if t.to_ascii_uppercase().starts_with('M') {
            Some(SexKey::Boys)
        } else {
            Some(SexKey::Girls)
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SexKey::Boys => "boys",
            SexKey::Girls => "girls",
        }
    }
}

pub fn age_key(age: i32) -> String {
    if age >= ADULT_AGE {
        "17+".to_string()
    } else {
        age.to_string()
    }
}

/// FitnessGram healthy-fitness-zone bands keyed by sex, age and component.
#[derive(Debug, Clone)]
pub struct StandardsTable {
    boys: SexTable,
    girls: SexTable,
    source: String,
    fingerprint: String,
}

#[derive(Deserialize)]
struct StandardsDoc {
    #[serde(default)]
    boys: SexTable,
    #[serde(default)]
    girls: SexTable,
}

impl StandardsTable {
    pub fn bundled() -> anyhow::Result<Self> {
        Self::from_json_str(BUNDLED_STANDARDS, "bundled")
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read standards file {}", path.to_string_lossy()))?;
        Self::from_json_str(&raw, &path.to_string_lossy())
    }

    pub fn from_json_str(raw: &str, source: &str) -> anyhow::Result<Self> {
        let doc: StandardsDoc =
            serde_json::from_str(raw).context("standards document is not valid JSON")?;
        let digest = Sha256::digest(raw.as_bytes());
        Ok(Self {
            boys: doc.boys,
            girls: doc.girls,
            source: source.to_string(),
            fingerprint: format!("{:x}", digest),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn sex_table(&self, sex: SexKey) -> &SexTable {
        match sex {
            SexKey::Boys => &self.boys,
            SexKey::Girls => &self.girls,
        }
    }

    /// Band for (sex, age, component). `None` when the table has no row or no
    /// bound for it.
    pub fn band(&self, sex: SexKey, age: i32, component: Component) -> Option<Band> {
        let table = self.sex_table(sex);
        let key = age_key(age);
        let band = match component {
            Component::Pacer => table.cardio.get(&key).and_then(|r| r.pacer20),
            Component::MileRun => table.cardio.get(&key).and_then(|r| r.one_mile_run),
            Component::Bmi => table.cardio.get(&key).and_then(|r| r.bmi),
            Component::Pushups => table.muscular.get(&key).and_then(|r| r.pushup90),
            Component::Situps => table.muscular.get(&key).and_then(|r| r.curlup),
            Component::TrunkLift => table.muscular.get(&key).and_then(|r| r.trunk_lift),
            Component::SitAndReach => table.muscular.get(&key).and_then(|r| r.sit_and_reach),
        };
        band.filter(|b| b.min.is_some() || b.max.is_some())
    }

    /// Age keys present for a sex, in numeric order with `17+` last.
    pub fn age_keys(&self, sex: SexKey) -> Vec<String> {
        let table = self.sex_table(sex);
        let mut keys: Vec<String> = table
            .cardio
            .keys()
            .chain(table.muscular.keys())
            .cloned()
            .collect();
        keys.sort_by_key(|k| k.trim_end_matches('+').parse::<i32>().unwrap_or(i32::MAX));
        keys.dedup();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_table_loads_both_sexes() {
        let t = StandardsTable::bundled().expect("bundled standards");
        assert_eq!(t.fingerprint().len(), 64);
        let boys = t.age_keys(SexKey::Boys);
        assert_eq!(boys.first().map(String::as_str), Some("5"));
        assert_eq!(boys.last().map(String::as_str), Some("17+"));
        assert!(t.band(SexKey::Girls, 10, Component::Pacer).is_some());
        assert!(t.band(SexKey::Boys, 12, Component::SitAndReach).is_some());
    }

    #[test]
    fn bundled_mile_bands_cover_secondary_ages() {
        let t = StandardsTable::bundled().expect("bundled standards");
        for sex in [SexKey::Boys, SexKey::Girls] {
            for age in 10..=17 {
                let band = t
                    .band(sex, age, Component::MileRun)
                    .unwrap_or_else(|| panic!("no mile band for {} age {}", sex.as_str(), age));
                let (Some(fast), Some(slow)) = (band.min, band.max) else {
                    panic!("mile band for {} age {} needs both bounds", sex.as_str(), age);
                };
                assert!(fast < slow);
            }
        }
        assert_eq!(t.band(SexKey::Girls, 9, Component::MileRun), None);
    }

    #[test]
    fn adult_ages_collapse_to_one_row() {
        let t = StandardsTable::bundled().expect("bundled standards");
        let at17 = t.band(SexKey::Boys, 17, Component::Pushups);
        assert!(at17.is_some());
        assert_eq!(at17, t.band(SexKey::Boys, 18, Component::Pushups));
        assert_eq!(at17, t.band(SexKey::Boys, 40, Component::Pushups));
    }

    #[test]
    fn sex_resolution_is_prefix_based() {
        assert_eq!(SexKey::resolve("M"), Some(SexKey::Boys));
        assert_eq!(SexKey::resolve("male"), Some(SexKey::Boys));
        assert_eq!(SexKey::resolve("F"), Some(SexKey::Girls));
        assert_eq!(SexKey::resolve("X"), Some(SexKey::Girls));
        assert_eq!(SexKey::resolve("  "), None);
    }

    #[test]
    fn empty_bands_read_as_missing() {
        let t = StandardsTable::from_json_str(
            r#"{"girls":{"cardio":{"10":{"pacer20":{"min":null}}}}}"#,
            "inline",
        )
        .expect("parse");
        assert_eq!(t.band(SexKey::Girls, 10, Component::Pacer), None);
        assert_eq!(t.band(SexKey::Boys, 10, Component::Pacer), None);
    }
}
