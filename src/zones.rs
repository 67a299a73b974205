use serde::Serialize;

use crate::standards::{Band, SexKey, StandardsTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Component {
    Pacer,
    MileRun,
    Pushups,
    Situps,
    SitAndReach,
    TrunkLift,
    Bmi,
}

impl Component {
    /// The five components counted by the secondary overall-HFZ rule.
    pub const OVERALL: [Component; 5] = [
        Component::Pacer,
        Component::Pushups,
        Component::Situps,
        Component::SitAndReach,
        Component::TrunkLift,
    ];

    pub fn parse(raw: &str) -> Option<Component> {
        match raw.trim() {
            "pacer" | "pacerOrMileRun" | "pacer20" => Some(Component::Pacer),
            "mileRun" | "mile_run" | "oneMileRun" => Some(Component::MileRun),
            "pushups" | "pushup90" => Some(Component::Pushups),
            "situps" | "curlup" => Some(Component::Situps),
            "sitAndReach" | "sit_and_reach" => Some(Component::SitAndReach),
            "trunkLift" | "trunk_lift" => Some(Component::TrunkLift),
            "bmi" => Some(Component::Bmi),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Component::Pacer => "pacer",
            Component::MileRun => "mileRun",
            Component::Pushups => "pushups",
            Component::Situps => "situps",
            Component::SitAndReach => "sitAndReach",
            Component::TrunkLift => "trunkLift",
            Component::Bmi => "bmi",
        }
    }

    /// Lower measurements are better.
    fn inverted(self) -> bool {
        matches!(self, Component::MileRun)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Zone {
    HealthyFitnessZone,
    NeedsImprovementLow,
    NeedsImprovementHigh,
    NeedsImprovement,
    NeedsImprovementSlow,
    NeedsImprovementFast,
    NoStandard,
    NoResult,
}

impl Zone {
    pub fn label(self) -> &'static str {
        match self {
            Zone::HealthyFitnessZone => "Healthy Fitness Zone",
            Zone::NeedsImprovementLow => "Needs Improvement (Low)",
            Zone::NeedsImprovementHigh => "Needs Improvement (High)",
            Zone::NeedsImprovement => "Needs Improvement",
            Zone::NeedsImprovementSlow => "Needs Improvement (Slow)",
            Zone::NeedsImprovementFast => "Needs Improvement (Fast)",
            Zone::NoStandard => "No standard",
            Zone::NoResult => "—",
        }
    }

    pub fn is_healthy(self) -> bool {
        self == Zone::HealthyFitnessZone
    }

    pub fn needs_improvement(self) -> bool {
        matches!(
            self,
            Zone::NeedsImprovement
                | Zone::NeedsImprovementLow
                | Zone::NeedsImprovementHigh
                | Zone::NeedsImprovementSlow
                | Zone::NeedsImprovementFast
        )
    }
}

/// Classify a measured value against a band. Total: every input maps to one
/// zone.
pub fn classify_band(component: Component, value: f64, band: Option<Band>) -> Zone {
    let Some(band) = band else {
        return Zone::NoStandard;
    };
    if value.is_nan() {
        return Zone::NoResult;
    }
    match (band.min, band.max) {
        (Some(min), Some(max)) => {
            if component.inverted() {
                if value > max {
                    Zone::NeedsImprovementSlow
                } else if value < min {
                    Zone::NeedsImprovementFast
                } else {
                    Zone::HealthyFitnessZone
                }
            } else if value < min {
                Zone::NeedsImprovementLow
            } else if value > max {
                Zone::NeedsImprovementHigh
            } else {
                Zone::HealthyFitnessZone
            }
        }
        (None, Some(max)) if component == Component::Bmi => {
            if value <= max {
                Zone::HealthyFitnessZone
            } else {
                Zone::NeedsImprovementHigh
            }
        }
        (Some(min), None) => {
            if component.inverted() {
                if value > min {
                    Zone::HealthyFitnessZone
                } else {
                    Zone::NeedsImprovement
                }
            } else if value < min {
                Zone::NeedsImprovement
            } else {
                Zone::HealthyFitnessZone
            }
        }
        _ => Zone::NoStandard,
    }
}

pub fn classify(
    standards: &StandardsTable,
    component: Component,
    value: Option<f64>,
    age: Option<i32>,
    sex: Option<&str>,
) -> Zone {
    let (Some(value), Some(age), Some(sex)) = (value, age, sex.and_then(SexKey::resolve)) else {
        return Zone::NoResult;
    };
    classify_band(component, value, standards.band(sex, age, component))
}

/// `value >= band.min` for the secondary overall-HFZ count. Upper bounds are
/// not consulted.
pub fn meets_minimum(
    standards: &StandardsTable,
    component: Component,
    value: Option<f64>,
    age: Option<i32>,
    sex: Option<&str>,
) -> bool {
    let (Some(value), Some(age), Some(sex)) = (value, age, sex.and_then(SexKey::resolve)) else {
        return false;
    };
    standards
        .band(sex, age, component)
        .and_then(|b| b.min)
        .map(|min| value >= min)
        .unwrap_or(false)
}
