//! Fall/Spring comparisons and the class-level reductions built on them.
//!
//! Three policies live here:
//! - the per-measurement tracker (`compare_measurements`) with its class stats,
//! - the elementary PACER status shown next to each student,
//! - the secondary overall-HFZ status used by the period class summary.

use serde::{Deserialize, Serialize};

use crate::calc;
use crate::standards::{Band, StandardsTable};
use crate::zones::{self, Component};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImprovementThresholds {
    /// Lap gain that alone counts as significant (elementary).
    pub significant_lap_delta: f64,
    /// Percent gain that alone counts as significant.
    pub significant_percent: f64,
    /// Below this many laps (and below the percent threshold) a change is noise.
    pub clear_change_laps: f64,
    /// Components at or above their minimum for an overall HFZ (secondary).
    pub overall_hfz_components: usize,
    /// Components with a significant percent gain for a significant
    /// improvement (secondary).
    pub improved_components: usize,
}

impl Default for ImprovementThresholds {
    fn default() -> Self {
        Self {
            significant_lap_delta: 5.0,
            significant_percent: 10.0,
            clear_change_laps: 3.0,
            overall_hfz_components: 4,
            improved_components: 3,
        }
    }
}

const GOOD_PROGRESS_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeStatus {
    Improved,
    Declined,
    NoChange,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementComparison {
    pub fall: Option<f64>,
    pub spring: Option<f64>,
    pub difference: f64,
    pub percent_change: f64,
    pub status: ChangeStatus,
    pub significant: bool,
    pub message: String,
    pub has_both: bool,
}

/// Compare one Fall/Spring pair against a healthy-zone band.
pub fn compare_measurements(
    fall: Option<f64>,
    spring: Option<f64>,
    band: Band,
    thresholds: &ImprovementThresholds,
) -> MeasurementComparison {
    let (Some(f), Some(s)) = (fall, spring) else {
        return MeasurementComparison {
            fall,
            spring,
            difference: 0.0,
            percent_change: 0.0,
            status: ChangeStatus::NoChange,
            significant: false,
            message: "Missing Fall or Spring test data".to_string(),
            has_both: false,
        };
    };

    let difference = s - f;
    let percent_change = calc::percent_change(f, s);
    let moved_to_hfz = !band.contains(f) && band.contains(s);

    let (status, significant, message) = if difference > 0.0 {
        if percent_change >= thresholds.significant_percent {
            (
                ChangeStatus::Improved,
                true,
                format!(
                    "Significant improvement! +{} laps (+{:.1}%)",
                    difference, percent_change
                ),
            )
        } else if moved_to_hfz {
            (
                ChangeStatus::Improved,
                true,
                format!("Moved to Healthy Fitness Zone! +{} laps", difference),
            )
        } else if percent_change >= GOOD_PROGRESS_PERCENT {
            (
                ChangeStatus::Improved,
                false,
                format!("Good progress! +{} laps (+{:.1}%)", difference, percent_change),
            )
        } else {
            (
                ChangeStatus::Improved,
                false,
                format!("Small improvement. +{} laps (+{:.1}%)", difference, percent_change),
            )
        }
    } else if difference < 0.0 {
        (
            ChangeStatus::Declined,
            false,
            format!(
                "Performance declined. {} laps ({:.1}%)",
                difference, percent_change
            ),
        )
    } else {
        (
            ChangeStatus::NoChange,
            false,
            "No change from Fall to Spring".to_string(),
        )
    };

    MeasurementComparison {
        fall,
        spring,
        difference,
        percent_change,
        status,
        significant,
        message,
        has_both: true,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassImprovementStats {
    pub total_students_with_both_tests: usize,
    pub students_with_significant_improvement: usize,
    pub students_with_some_improvement: usize,
    pub students_with_no_change: usize,
    pub students_with_decline: usize,
    pub percentage_improved: f64,
    pub percentage_significantly_improved: f64,
    pub average_percentage_change: f64,
}

/// Reduce comparisons to class statistics. Only pairs with both seasons count.
pub fn class_improvement_stats<'a, I>(comparisons: I) -> ClassImprovementStats
where
    I: IntoIterator<Item = &'a MeasurementComparison>,
{
    let mut stats = ClassImprovementStats::default();
    let mut pct_sum = 0.0;
    for c in comparisons.into_iter().filter(|c| c.has_both) {
        stats.total_students_with_both_tests += 1;
        pct_sum += c.percent_change;
        match c.status {
            ChangeStatus::Improved if c.significant => {
                stats.students_with_significant_improvement += 1
            }
            ChangeStatus::Improved => stats.students_with_some_improvement += 1,
            ChangeStatus::NoChange => stats.students_with_no_change += 1,
            ChangeStatus::Declined => stats.students_with_decline += 1,
        }
    }
    let total = stats.total_students_with_both_tests;
    if total == 0 {
        return stats;
    }
    let improved =
        stats.students_with_significant_improvement + stats.students_with_some_improvement;
    stats.percentage_improved = improved as f64 / total as f64 * 100.0;
    stats.percentage_significantly_improved =
        stats.students_with_significant_improvement as f64 / total as f64 * 100.0;
    stats.average_percentage_change = pct_sum / total as f64;
    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CardioTestType {
    Pacer,
    Mile,
}

impl CardioTestType {
    pub fn parse(raw: &str) -> Option<CardioTestType> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PACER" => Some(CardioTestType::Pacer),
            "MILE" => Some(CardioTestType::Mile),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CardioTestType::Pacer => "PACER",
            CardioTestType::Mile => "MILE",
        }
    }
}

/// One season's cardio reading with the student's age on the test date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacerReading {
    pub cardio_type: CardioTestType,
    pub value: Option<f64>,
    pub age: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementaryStatus {
    NoData,
    NotComparable,
    SignificantImprovement,
    ModerateImprovement,
    NoClearChange,
    Declined,
    NoChange,
}

impl ElementaryStatus {
    pub fn label(self) -> &'static str {
        match self {
            ElementaryStatus::NoData => "No Data",
            ElementaryStatus::NotComparable => "Not Comparable",
            ElementaryStatus::SignificantImprovement => "Significant Improvement",
            ElementaryStatus::ModerateImprovement => "Moderate Improvement",
            ElementaryStatus::NoClearChange => "No Clear Change",
            ElementaryStatus::Declined => "Declined",
            ElementaryStatus::NoChange => "No Change",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementaryOutcome {
    pub status: ElementaryStatus,
    pub label: &'static str,
    pub change: f64,
    pub percent_change: f64,
    pub reason: String,
}

impl ElementaryOutcome {
    fn new(status: ElementaryStatus, change: f64, percent_change: f64, reason: String) -> Self {
        Self {
            status,
            label: status.label(),
            change,
            percent_change,
            reason,
        }
    }
}

fn signed(v: f64) -> String {
    if v > 0.0 {
        format!("+{}", v)
    } else {
        format!("{}", v)
    }
}

/// Per-student PACER status on the elementary assessment screen. A blank lap
/// count reads as zero.
pub fn elementary_pacer_status(
    standards: &StandardsTable,
    sex: Option<&str>,
    fall: Option<&PacerReading>,
    spring: Option<&PacerReading>,
    thresholds: &ImprovementThresholds,
) -> ElementaryOutcome {
    let (Some(fall), Some(spring)) = (fall, spring) else {
        return ElementaryOutcome::new(
            ElementaryStatus::NoData,
            0.0,
            0.0,
            "Missing Fall or Spring test".to_string(),
        );
    };
    if fall.cardio_type != CardioTestType::Pacer || spring.cardio_type != CardioTestType::Pacer {
        return ElementaryOutcome::new(
            ElementaryStatus::NotComparable,
            0.0,
            0.0,
            "Only PACER tests can be compared".to_string(),
        );
    }

    let fall_laps = fall.value.unwrap_or(0.0);
    let spring_laps = spring.value.unwrap_or(0.0);
    let change = spring_laps - fall_laps;
    let pct = if fall_laps > 0.0 {
        change / fall_laps * 100.0
    } else {
        0.0
    };

    let fall_zone = zones::classify(standards, Component::Pacer, Some(fall_laps), fall.age, sex);
    let spring_zone =
        zones::classify(standards, Component::Pacer, Some(spring_laps), spring.age, sex);
    let moved_to_hfz = fall_zone.needs_improvement() && spring_zone.is_healthy();

    let lap_gain = change >= thresholds.significant_lap_delta;
    let pct_gain = pct >= thresholds.significant_percent;
    if lap_gain || pct_gain || moved_to_hfz {
        let mut parts = Vec::new();
        if lap_gain {
            parts.push(format!("+{} laps", change));
        }
        if pct_gain {
            parts.push(format!("({:.1}%)", pct));
        }
        if moved_to_hfz {
            parts.push("(Moved to HFZ)".to_string());
        }
        return ElementaryOutcome::new(
            ElementaryStatus::SignificantImprovement,
            change,
            pct,
            parts.join(" "),
        );
    }

    if change.abs() < thresholds.clear_change_laps && pct.abs() < thresholds.significant_percent {
        return ElementaryOutcome::new(
            ElementaryStatus::NoClearChange,
            change,
            pct,
            format!("{} ({:.1}%)", signed(change), pct),
        );
    }
    if change > 0.0 {
        return ElementaryOutcome::new(
            ElementaryStatus::ModerateImprovement,
            change,
            pct,
            format!("+{} ({:.1}%)", change, pct),
        );
    }
    if change < 0.0 {
        return ElementaryOutcome::new(
            ElementaryStatus::Declined,
            change,
            pct,
            format!("{} ({:.1}%)", change, pct),
        );
    }
    ElementaryOutcome::new(
        ElementaryStatus::NoChange,
        0.0,
        0.0,
        "Same as Fall".to_string(),
    )
}

/// The five components scored by the overall-HFZ rule, for one test.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TestMeasurements {
    pub pacer: Option<f64>,
    pub pushups: Option<f64>,
    pub situps: Option<f64>,
    pub sit_and_reach: Option<f64>,
    pub trunk_lift: Option<f64>,
}

impl TestMeasurements {
    pub fn get(&self, c: Component) -> Option<f64> {
        match c {
            Component::Pacer => self.pacer,
            Component::Pushups => self.pushups,
            Component::Situps => self.situps,
            Component::SitAndReach => self.sit_and_reach,
            Component::TrunkLift => self.trunk_lift,
            Component::MileRun | Component::Bmi => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverallZone {
    #[serde(rename = "HFZ")]
    Hfz,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

/// Overall HFZ when enough components meet their minimum. Unknown age reads
/// as needs improvement.
pub fn overall_zone(
    standards: &StandardsTable,
    m: &TestMeasurements,
    age: Option<i32>,
    sex: Option<&str>,
    thresholds: &ImprovementThresholds,
) -> OverallZone {
    if age.is_none() {
        return OverallZone::NeedsImprovement;
    }
    let count = Component::OVERALL
        .iter()
        .filter(|c| zones::meets_minimum(standards, **c, m.get(**c), age, sex))
        .count();
    if count >= thresholds.overall_hfz_components {
        OverallZone::Hfz
    } else {
        OverallZone::NeedsImprovement
    }
}

/// Components with a percent gain at or above the threshold. A zero baseline
/// counts any gain.
pub fn improved_component_count(
    fall: &TestMeasurements,
    spring: &TestMeasurements,
    thresholds: &ImprovementThresholds,
) -> usize {
    Component::OVERALL
        .iter()
        .filter(|c| match (fall.get(**c), spring.get(**c)) {
            (Some(f), Some(s)) if f == 0.0 => s > 0.0,
            (Some(f), Some(s)) => calc::percent_change(f, s) >= thresholds.significant_percent,
            _ => false,
        })
        .count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SecondaryStatus {
    NoData,
    SignificantImprovement,
    MaintainedHfz,
    Declined,
    NoClearChange,
}

impl SecondaryStatus {
    pub fn label(self) -> &'static str {
        match self {
            SecondaryStatus::NoData => "No Data",
            SecondaryStatus::SignificantImprovement => "Significant Improvement",
            SecondaryStatus::MaintainedHfz => "Maintained HFZ",
            SecondaryStatus::Declined => "Declined",
            SecondaryStatus::NoClearChange => "No Clear Change",
        }
    }
}

/// One season's measurements with the student's age on the test date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonTest {
    pub measurements: TestMeasurements,
    pub age: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryOutcome {
    pub fall_zone: Option<OverallZone>,
    pub spring_zone: Option<OverallZone>,
    pub improved_components: usize,
    pub status: SecondaryStatus,
    pub label: &'static str,
}

pub fn secondary_status(
    standards: &StandardsTable,
    sex: Option<&str>,
    fall: Option<&SeasonTest>,
    spring: Option<&SeasonTest>,
    thresholds: &ImprovementThresholds,
) -> SecondaryOutcome {
    let zone_of = |t: &SeasonTest| overall_zone(standards, &t.measurements, t.age, sex, thresholds);
    let fall_zone = fall.map(zone_of);
    let spring_zone = spring.map(zone_of);

    let outcome = |status: SecondaryStatus, improved_components: usize| SecondaryOutcome {
        fall_zone,
        spring_zone,
        improved_components,
        status,
        label: status.label(),
    };

    let (Some(f), Some(s), Some(fz), Some(sz)) = (fall, spring, fall_zone, spring_zone) else {
        return outcome(SecondaryStatus::NoData, 0);
    };

    let improved = improved_component_count(&f.measurements, &s.measurements, thresholds);
    match (fz, sz) {
        (OverallZone::NeedsImprovement, OverallZone::Hfz) => {
            outcome(SecondaryStatus::SignificantImprovement, improved)
        }
        (OverallZone::Hfz, OverallZone::Hfz) => outcome(SecondaryStatus::MaintainedHfz, improved),
        _ if improved >= thresholds.improved_components => {
            outcome(SecondaryStatus::SignificantImprovement, improved)
        }
        (OverallZone::Hfz, OverallZone::NeedsImprovement) => {
            outcome(SecondaryStatus::Declined, improved)
        }
        _ => outcome(SecondaryStatus::NoClearChange, improved),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecondaryClassSummary {
    pub total_students: usize,
    pub students_with_both_tests: usize,
    pub significant_improvement: usize,
    pub maintained_hfz: usize,
    pub declined: usize,
    pub no_clear_change: usize,
    pub no_data: usize,
    pub fall_hfz: usize,
    pub spring_hfz: usize,
    pub percent_significant_improvement: f64,
    pub percent_maintained_hfz: f64,
    pub percent_declined: f64,
    pub percent_spring_hfz: f64,
}

/// Percentages use students with both seasons as the denominator; `fall_hfz`
/// and `spring_hfz` count every student with that season on file.
pub fn secondary_class_summary<'a, I>(outcomes: I) -> SecondaryClassSummary
where
    I: IntoIterator<Item = &'a SecondaryOutcome>,
{
    let mut s = SecondaryClassSummary::default();
    let mut spring_hfz_with_both = 0usize;
    for o in outcomes {
        s.total_students += 1;
        if o.fall_zone == Some(OverallZone::Hfz) {
            s.fall_hfz += 1;
        }
        if o.spring_zone == Some(OverallZone::Hfz) {
            s.spring_hfz += 1;
        }
        match o.status {
            SecondaryStatus::NoData => {
                s.no_data += 1;
                continue;
            }
            SecondaryStatus::SignificantImprovement => s.significant_improvement += 1,
            SecondaryStatus::MaintainedHfz => s.maintained_hfz += 1,
            SecondaryStatus::Declined => s.declined += 1,
            SecondaryStatus::NoClearChange => s.no_clear_change += 1,
        }
        s.students_with_both_tests += 1;
        if o.spring_zone == Some(OverallZone::Hfz) {
            spring_hfz_with_both += 1;
        }
    }
    let total = s.students_with_both_tests;
    if total > 0 {
        let pct = |n: usize| n as f64 / total as f64 * 100.0;
        s.percent_significant_improvement = pct(s.significant_improvement);
        s.percent_maintained_hfz = pct(s.maintained_hfz);
        s.percent_declined = pct(s.declined);
        s.percent_spring_hfz = pct(spring_hfz_with_both);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn th() -> ImprovementThresholds {
        ImprovementThresholds::default()
    }

    fn table() -> StandardsTable {
        StandardsTable::from_json_str(
            r#"{
              "boys": {
                "cardio": { "14": { "pacer20": { "min": 40, "max": 80 } } },
                "muscular": { "14": {
                  "pushup90": { "min": 14, "max": 30 },
                  "curlup": { "min": 24, "max": 45 },
                  "sitAndReach": { "min": 8 },
                  "trunkLift": { "min": 9, "max": 12 }
                } }
              },
              "girls": {
                "cardio": { "10": { "pacer20": { "min": 15, "max": 41 } } }
              }
            }"#,
            "inline",
        )
        .expect("parse")
    }

    #[test]
    fn tracker_reports_delta_and_percent() {
        let c = compare_measurements(Some(20.0), Some(25.0), Band::range(15.0, 41.0), &th());
        assert_eq!(c.difference, 5.0);
        assert_eq!(c.percent_change, 25.0);
        assert_eq!(c.status, ChangeStatus::Improved);
        assert!(c.significant);
        assert_eq!(c.message, "Significant improvement! +5 laps (+25.0%)");
    }

    #[test]
    fn tracker_zone_move_is_significant_under_ten_percent() {
        let c = compare_measurements(Some(38.0), Some(41.0), Band::range(40.0, 80.0), &th());
        assert!(c.percent_change < 10.0);
        assert!(c.significant);
        assert_eq!(c.message, "Moved to Healthy Fitness Zone! +3 laps");
    }

    #[test]
    fn tracker_declined_and_missing() {
        let c = compare_measurements(Some(30.0), Some(27.0), Band::min(20.0), &th());
        assert_eq!(c.status, ChangeStatus::Declined);
        assert_eq!(c.message, "Performance declined. -3 laps (-10.0%)");

        let m = compare_measurements(Some(30.0), None, Band::min(20.0), &th());
        assert!(!m.has_both);
        assert_eq!(m.status, ChangeStatus::NoChange);
        assert_eq!(m.message, "Missing Fall or Spring test data");
    }

    #[test]
    fn class_stats_skip_partial_pairs() {
        let band = Band::range(15.0, 41.0);
        let rows = vec![
            compare_measurements(Some(20.0), Some(25.0), band, &th()),
            compare_measurements(Some(30.0), Some(31.0), band, &th()),
            compare_measurements(Some(30.0), Some(30.0), band, &th()),
            compare_measurements(Some(30.0), Some(24.0), band, &th()),
            compare_measurements(None, Some(24.0), band, &th()),
        ];
        let s = class_improvement_stats(&rows);
        assert_eq!(s.total_students_with_both_tests, 4);
        assert_eq!(s.students_with_significant_improvement, 1);
        assert_eq!(s.students_with_some_improvement, 1);
        assert_eq!(s.students_with_no_change, 1);
        assert_eq!(s.students_with_decline, 1);
        assert_eq!(s.percentage_improved, 50.0);
        assert_eq!(s.percentage_significantly_improved, 25.0);
        let expected_avg = (25.0 + 100.0 / 30.0 + 0.0 - 20.0) / 4.0;
        assert!((s.average_percentage_change - expected_avg).abs() < 1e-9);

        assert_eq!(class_improvement_stats(&[]), ClassImprovementStats::default());
    }

    fn pacer(value: f64, age: i32) -> PacerReading {
        PacerReading {
            cardio_type: CardioTestType::Pacer,
            value: Some(value),
            age: Some(age),
        }
    }

    #[test]
    fn elementary_status_ladder() {
        let t = table();
        let sig = elementary_pacer_status(&t, Some("F"), Some(&pacer(20.0, 10)), Some(&pacer(25.0, 10)), &th());
        assert_eq!(sig.status, ElementaryStatus::SignificantImprovement);
        assert_eq!(sig.reason, "+5 laps (25.0%)");

        let moved = elementary_pacer_status(&t, Some("F"), Some(&pacer(13.0, 10)), Some(&pacer(15.0, 10)), &th());
        assert_eq!(moved.status, ElementaryStatus::SignificantImprovement);
        assert!(moved.reason.contains("(Moved to HFZ)"));

        let flat = elementary_pacer_status(&t, Some("F"), Some(&pacer(40.0, 10)), Some(&pacer(41.0, 10)), &th());
        assert_eq!(flat.status, ElementaryStatus::NoClearChange);
        assert_eq!(flat.reason, "+1 (2.5%)");

        let moderate = elementary_pacer_status(&t, Some("F"), Some(&pacer(60.0, 10)), Some(&pacer(64.0, 10)), &th());
        assert_eq!(moderate.status, ElementaryStatus::ModerateImprovement);

        let down = elementary_pacer_status(&t, Some("F"), Some(&pacer(30.0, 10)), Some(&pacer(20.0, 10)), &th());
        assert_eq!(down.status, ElementaryStatus::Declined);
        assert_eq!(down.label, "Declined");

        let none = elementary_pacer_status(&t, Some("F"), Some(&pacer(30.0, 10)), None, &th());
        assert_eq!(none.status, ElementaryStatus::NoData);

        let mile = PacerReading {
            cardio_type: CardioTestType::Mile,
            value: Some(9.5),
            age: Some(10),
        };
        let nc = elementary_pacer_status(&t, Some("F"), Some(&mile), Some(&pacer(30.0, 10)), &th());
        assert_eq!(nc.status, ElementaryStatus::NotComparable);
    }

    fn season(pacer: f64, pushups: f64, situps: f64, sit_reach: f64, trunk: f64) -> SeasonTest {
        SeasonTest {
            measurements: TestMeasurements {
                pacer: Some(pacer),
                pushups: Some(pushups),
                situps: Some(situps),
                sit_and_reach: Some(sit_reach),
                trunk_lift: Some(trunk),
            },
            age: Some(14),
        }
    }

    #[test]
    fn overall_zone_needs_four_of_five() {
        let t = table();
        let four = season(45.0, 15.0, 25.0, 9.0, 5.0);
        assert_eq!(
            overall_zone(&t, &four.measurements, four.age, Some("M"), &th()),
            OverallZone::Hfz
        );
        let three = season(45.0, 15.0, 20.0, 9.0, 5.0);
        assert_eq!(
            overall_zone(&t, &three.measurements, three.age, Some("M"), &th()),
            OverallZone::NeedsImprovement
        );
        assert_eq!(
            overall_zone(&t, &four.measurements, None, Some("M"), &th()),
            OverallZone::NeedsImprovement
        );
    }

    #[test]
    fn secondary_zone_transition_beats_component_rule() {
        let t = table();
        let fall = season(45.0, 10.0, 20.0, 9.0, 10.0);
        let spring = season(45.0, 14.0, 24.0, 9.0, 10.0);
        let o = secondary_status(&t, Some("M"), Some(&fall), Some(&spring), &th());
        assert_eq!(o.fall_zone, Some(OverallZone::NeedsImprovement));
        assert_eq!(o.spring_zone, Some(OverallZone::Hfz));
        assert_eq!(o.improved_components, 2);
        assert_eq!(o.status, SecondaryStatus::SignificantImprovement);
    }

    #[test]
    fn secondary_maintained_declined_and_component_rule() {
        let t = table();
        let hfz = season(45.0, 15.0, 25.0, 9.0, 10.0);
        let o = secondary_status(&t, Some("M"), Some(&hfz), Some(&hfz), &th());
        assert_eq!(o.status, SecondaryStatus::MaintainedHfz);

        let ni = season(30.0, 10.0, 20.0, 5.0, 5.0);
        let o = secondary_status(&t, Some("M"), Some(&hfz), Some(&ni), &th());
        assert_eq!(o.status, SecondaryStatus::Declined);

        let ni_better = season(34.0, 12.0, 23.0, 6.0, 5.0);
        let o = secondary_status(&t, Some("M"), Some(&ni), Some(&ni_better), &th());
        assert_eq!(o.improved_components, 4);
        assert_eq!(o.status, SecondaryStatus::SignificantImprovement);

        let o = secondary_status(&t, Some("M"), Some(&ni), Some(&ni), &th());
        assert_eq!(o.status, SecondaryStatus::NoClearChange);

        let o = secondary_status(&t, Some("M"), None, Some(&ni), &th());
        assert_eq!(o.status, SecondaryStatus::NoData);
        assert_eq!(o.spring_zone, Some(OverallZone::NeedsImprovement));
    }

    #[test]
    fn secondary_summary_percentages_use_complete_pairs() {
        let t = table();
        let hfz = season(45.0, 15.0, 25.0, 9.0, 10.0);
        let ni = season(30.0, 10.0, 20.0, 5.0, 5.0);
        let outcomes = vec![
            secondary_status(&t, Some("M"), Some(&ni), Some(&hfz), &th()),
            secondary_status(&t, Some("M"), Some(&hfz), Some(&hfz), &th()),
            secondary_status(&t, Some("M"), Some(&hfz), Some(&ni), &th()),
            secondary_status(&t, Some("M"), Some(&ni), Some(&ni), &th()),
            secondary_status(&t, Some("M"), None, Some(&hfz), &th()),
        ];
        let s = secondary_class_summary(&outcomes);
        assert_eq!(s.total_students, 5);
        assert_eq!(s.students_with_both_tests, 4);
        assert_eq!(s.no_data, 1);
        assert_eq!(s.significant_improvement, 1);
        assert_eq!(s.maintained_hfz, 1);
        assert_eq!(s.declined, 1);
        assert_eq!(s.no_clear_change, 1);
        assert_eq!(s.percent_significant_improvement, 25.0);
        assert_eq!(s.percent_spring_hfz, 50.0);
        assert_eq!(s.spring_hfz, 3);
        assert_eq!(s.fall_hfz, 2);
    }
}
