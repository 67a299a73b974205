//! Curriculum vocabulary: bands, grade groups, resource types, and the
//! unit-keyed skill focus and activity suggestion tables used by the lesson
//! planner.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Band {
    Elementary,
    Middle,
    High,
}

impl Band {
    pub fn parse(raw: &str) -> Option<Band> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ELEMENTARY" => Some(Band::Elementary),
            "MIDDLE" => Some(Band::Middle),
            "HIGH" => Some(Band::High),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Band::Elementary => "ELEMENTARY",
            Band::Middle => "MIDDLE",
            Band::High => "HIGH",
        }
    }

    pub fn grade_groups(self) -> &'static [&'static str] {
        match self {
            Band::Elementary => &["K-2", "3-5"],
            Band::Middle => &["6-8"],
            Band::High => &["9-12"],
        }
    }
}

pub const GRADE_GROUPS: [&str; 4] = ["K-2", "3-5", "6-8", "9-12"];

pub fn is_grade_group(raw: &str) -> bool {
    GRADE_GROUPS.contains(&raw)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Pdf,
    Doc,
    Link,
}

impl ResourceType {
    pub fn parse(raw: &str) -> Option<ResourceType> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(ResourceType::Pdf),
            "doc" => Some(ResourceType::Doc),
            "link" => Some(ResourceType::Link),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Pdf => "pdf",
            ResourceType::Doc => "doc",
            ResourceType::Link => "link",
        }
    }
}

/// Lowercase, `&` → `and`, drop punctuation (keeping `/` when asked),
/// collapse whitespace.
fn normalize(unit: &str, keep_slash: bool) -> String {
    let lowered = unit.to_lowercase().replace('&', "and");
    let kept: String = lowered
        .chars()
        .filter(|c| {
            c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace() || (keep_slash && *c == '/')
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_unit_key(unit: &str) -> String {
    normalize(unit, true)
}

const UNIT_ALIASES: &[(&str, &str)] = &[
    ("spatial awareness", "spatial awareness"),
    ("locomotor skills", "locomotor skills"),
    ("locomotor skills i", "locomotor skills"),
    ("locomotor skills ii", "locomotor skills"),
    ("manipulative skills", "manipulative skills"),
    ("manipulative skills i", "manipulative skills"),
    ("manipulative skills ii", "manipulative skills"),
    ("fitness foundations", "fitness"),
    ("fitness", "fitness"),
    ("games and cooperation i", "cooperation / teamwork"),
    ("games and cooperation ii", "cooperation / teamwork"),
    ("cooperation / teamwork", "cooperation / teamwork"),
];

const SKILL_FOCUS_MAP: &[(&str, &[&str])] = &[
    (
        "spatial awareness",
        &[
            "Personal Space (bubble)",
            "General Space Awareness",
            "Pathways (straight/curved/zigzag)",
            "Levels (low/medium/high)",
            "Speed & Direction Control",
            "Moving Safely (stop/start, freeze)",
        ],
    ),
    (
        "locomotor skills",
        &["Walk/Run", "Skip", "Hop", "Jump & Land", "Gallop", "Slide"],
    ),
    (
        "manipulative skills",
        &[
            "Throwing",
            "Catching",
            "Rolling",
            "Dribbling (hand)",
            "Kicking",
            "Striking (paddle/hand)",
        ],
    ),
    (
        "fitness",
        &[
            "Cardio Endurance",
            "Muscular Strength",
            "Muscular Endurance",
            "Flexibility",
            "Circuit / Stations",
        ],
    ),
    (
        "cooperation / teamwork",
        &[
            "Sharing Space",
            "Partner Work",
            "Small Group Cooperation",
            "Communication",
        ],
    ),
];

const GENERIC_SKILL_FOCUS: &[&str] = &[
    "General Focus",
    "Skill Development",
    "Game Application",
    "Other",
];

pub const OTHER_SKILL_FOCUS: &str = "Other";

/// Skill focus choices for a unit. Unknown or blank units get the generic
/// list; every list ends with `Other`.
pub fn skill_focus_options(unit: &str) -> Vec<String> {
    if unit.trim().is_empty() {
        return GENERIC_SKILL_FOCUS.iter().map(|s| s.to_string()).collect();
    }
    let normalized = normalize_unit_key(unit);
    let key = UNIT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == normalized)
        .map(|(_, k)| *k)
        .unwrap_or(normalized.as_str());
    let options = SKILL_FOCUS_MAP
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, opts)| *opts)
        .unwrap_or(GENERIC_SKILL_FOCUS);
    let mut out: Vec<String> = options.iter().map(|s| s.to_string()).collect();
    if !out.iter().any(|o| o == OTHER_SKILL_FOCUS) {
        out.push(OTHER_SKILL_FOCUS.to_string());
    }
    out
}

pub fn is_skill_focus_valid_for_unit(unit: &str, skill_focus: &str) -> bool {
    let sf = skill_focus.trim();
    if sf.is_empty() {
        return false;
    }
    if sf == OTHER_SKILL_FOCUS {
        return true;
    }
    skill_focus_options(unit).iter().any(|o| o == skill_focus)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Introduce,
    Practice,
    Apply,
    #[serde(rename = "Review-Assess")]
    ReviewAssess,
}

impl Intent {
    pub fn parse(raw: &str) -> Option<Intent> {
        match raw.trim() {
            "Introduce" => Some(Intent::Introduce),
            "Practice" => Some(Intent::Practice),
            "Apply" => Some(Intent::Apply),
            "Review-Assess" => Some(Intent::ReviewAssess),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_focus: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade_band: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySuggestion {
    pub id: &'static str,
    pub name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_for: Option<Recommendation>,
}

const fn unit_only(id: &'static str, name: &'static str, unit: &'static str) -> ActivitySuggestion {
    ActivitySuggestion {
        id,
        name,
        recommended_for: Some(Recommendation {
            unit: Some(unit),
            skill_focus: None,
            grade_band: None,
            intent: None,
        }),
    }
}

const fn staged(
    id: &'static str,
    name: &'static str,
    unit: &'static str,
    skill_focus: Option<&'static str>,
    grade_band: &'static str,
    intent: Intent,
) -> ActivitySuggestion {
    ActivitySuggestion {
        id,
        name,
        recommended_for: Some(Recommendation {
            unit: Some(unit),
            skill_focus,
            grade_band: Some(grade_band),
            intent: Some(intent),
        }),
    }
}

const fn fallback(id: &'static str, name: &'static str) -> ActivitySuggestion {
    ActivitySuggestion {
        id,
        name,
        recommended_for: None,
    }
}

const SA: &str = "Spatial Awareness";
const PATHWAYS: Option<&str> = Some("Pathways (straight/curved/zigzag)");

static ACTIVITY_SUGGESTIONS: &[ActivitySuggestion] = &[
    unit_only("ba_freeze_statues", "Statues / Freeze Shapes", "Body Awareness"),
    unit_only("ba_mirror_moves", "Mirror Moves", "Body Awareness"),
    unit_only("ba_body_parts_callout", "Body Parts Call-Out", "Body Awareness"),
    unit_only("ba_balance_shapes", "Balance Shapes", "Body Awareness"),
    staged(
        "sa_k2_intro_space_bubbles",
        "Space Bubbles Freeze",
        SA,
        Some("Personal Space (bubble)"),
        "K-2",
        Intent::Introduce,
    ),
    unit_only("sa_general_grid_movement", "Grid Movement", SA),
    unit_only("loc1_simon_says", "Locomotor Simon Says", "Locomotor Skills I"),
    unit_only("loc1_follow_pathways", "Follow-the-Leader Pathways", "Locomotor Skills I"),
    unit_only("loc1_locomotor_relays", "Locomotor Relays", "Locomotor Skills I"),
    unit_only("loc2_speed_change", "Change-of-Speed Challenge", "Locomotor Skills II"),
    unit_only("loc2_direction_change", "Direction Change Course", "Locomotor Skills II"),
    unit_only("loc2_pathway_switch", "Pathway Switch Game", "Locomotor Skills II"),
    unit_only("nlm_balance_shapes", "Balance & Shapes", "Non-Locomotor Movement"),
    unit_only("nlm_twist_bend_stretch", "Twist/Bend/Stretch Sequence", "Non-Locomotor Movement"),
    unit_only("nlm_yoga_flow", "Yoga Flow", "Non-Locomotor Movement"),
    unit_only("gci_partner_challenges", "Partner Challenges", "Games & Cooperation I"),
    unit_only("gci_team_build_stations", "Team Build Stations", "Games & Cooperation I"),
    unit_only("gci_human_knot", "Human Knot (modified)", "Games & Cooperation I"),
    unit_only("gci_pass_the_clap", "Pass the Clap (no equipment)", "Games & Cooperation I"),
    unit_only("rcm_freeze_dance", "Freeze Dance", "Rhythms & Creative Movement"),
    unit_only("rcm_rhythm_follow", "Rhythm Follow", "Rhythms & Creative Movement"),
    unit_only("rcm_move_to_beat", "Move to the Beat", "Rhythms & Creative Movement"),
    unit_only("rcm_creative_pathway", "Creative Pathway Dance", "Rhythms & Creative Movement"),
    unit_only("fit_interval_challenge", "Interval Move Challenge", "Fitness Foundations"),
    unit_only("fit_cardio_circuit", "Cardio Circuit (no equipment)", "Fitness Foundations"),
    unit_only("fit_tabata", "Kid-Safe Tabata", "Fitness Foundations"),
    unit_only("fit_fitness_stations", "Fitness Stations", "Fitness Foundations"),
    unit_only("srr_mixed_stations", "Mixed-Skill Stations", "Skill Review & Reinforcement"),
    unit_only("srr_teacher_choice", "Teacher Choice Review Game", "Skill Review & Reinforcement"),
    unit_only("srr_skill_bingo", "Skill Bingo (movement)", "Skill Review & Reinforcement"),
    unit_only("man1_roll_accuracy", "Rolling Accuracy (requires equipment)", "Manipulative Skills I"),
    unit_only("man1_toss_catch", "Hand Toss & Catch (requires equipment)", "Manipulative Skills I"),
    unit_only("man1_target_challenge", "Target Challenge (requires equipment)", "Manipulative Skills I"),
    unit_only("man2_dribble_kick", "Dribble/Kick Progressions (requires equipment)", "Manipulative Skills II"),
    unit_only("man2_skill_circuits", "Skill Circuits (requires equipment)", "Manipulative Skills II"),
    unit_only("gc2_small_sided", "Small-Sided Teamwork Games", "Games & Cooperation II"),
    unit_only("gc2_strategy_movement", "Strategy Movement Game", "Games & Cooperation II"),
    unit_only("gc2_keep_alive", "Cooperative \u{201c}Keep It Alive\u{201d} (requires equipment)", "Games & Cooperation II"),
    unit_only("cul_choice_stations", "Choice Day Stations", "Culminating Experiences"),
    unit_only("cul_team_challenge", "Team Challenge Day", "Culminating Experiences"),
    unit_only("cul_field_day", "Mini Field Day Stations", "Culminating Experiences"),
    staged("sa_k2_intro_traffic_lights", "Traffic Lights", SA, None, "K-2", Intent::Introduce),
    staged("sa_k2_intro_follow_leader", "Follow the Leader (space rules)", SA, None, "K-2", Intent::Introduce),
    staged("sa_k2_intro_island_hopping", "Island Hopping (spots)", SA, None, "K-2", Intent::Introduce),
    staged("sa_k2_practice_cone_cleanup", "Cone Cleanup (scatter/gather)", SA, None, "K-2", Intent::Practice),
    staged("sa_k2_practice_pathway_parade", "Pathway Parade", SA, PATHWAYS, "K-2", Intent::Practice),
    staged("sa_k2_practice_freeze_find_space", "Freeze & Find Space", SA, None, "K-2", Intent::Practice),
    staged("sa_k2_apply_safe_zones", "Safe Zones Challenge", SA, None, "K-2", Intent::Apply),
    staged("sa_k2_apply_avoid_crowd", "Mini \u{201c}Avoid the Crowd\u{201d} Relay", SA, None, "K-2", Intent::Apply),
    staged("sa_k2_review_show_me", "Show Me Stations", SA, None, "K-2", Intent::ReviewAssess),
    staged("sa_35_intro_traffic_jam", "Traffic Jam (pathways)", SA, None, "3-5", Intent::Introduce),
    staged("sa_35_intro_grid_movement", "Grid Movement Challenge", SA, None, "3-5", Intent::Introduce),
    staged("sa_35_intro_mirror_move", "Mirror Move (partner spacing)", SA, None, "3-5", Intent::Introduce),
    staged("sa_35_practice_pathway_tag", "Pathway Tag (modified)", SA, PATHWAYS, "3-5", Intent::Practice),
    staged("sa_35_practice_cone_tag_lanes", "Cone Tag Lanes", SA, None, "3-5", Intent::Practice),
    staged("sa_35_practice_direction_change", "Direction Change Challenge", SA, None, "3-5", Intent::Practice),
    staged("sa_35_apply_small_sided_space", "Small-Sided Space Game", SA, None, "3-5", Intent::Apply),
    staged("sa_35_apply_endzone_movement", "Endzone Movement Game", SA, None, "3-5", Intent::Apply),
    staged("sa_35_review_rubric_round", "Rubric Challenge Round", SA, None, "3-5", Intent::ReviewAssess),
];

pub static FALLBACK_ACTIVITIES: &[ActivitySuggestion] = &[
    fallback("fallback_freeze_dance", "Freeze Dance"),
    fallback("fallback_red_light", "Red Light / Green Light"),
    fallback("fallback_follow_leader", "Follow the Leader"),
    fallback("fallback_stations", "Stations / Circuits"),
    fallback("fallback_partner_mirror", "Partner Mirror"),
    fallback("fallback_obstacle_course", "Obstacle Course (stations)"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityQuery {
    pub unit: Option<String>,
    pub skill_focus: Option<String>,
    pub grade_band: Option<String>,
    pub intent: Option<Intent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Key {
    Unit,
    SkillFocus,
    GradeBand,
    Intent,
}

const PRIORITY_SETS: &[&[Key]] = &[
    &[Key::Unit, Key::SkillFocus, Key::GradeBand, Key::Intent],
    &[Key::Unit, Key::SkillFocus, Key::GradeBand],
    &[Key::Unit, Key::SkillFocus],
    &[Key::Unit],
];

fn key_matches_exactly(rec: &Recommendation, q: &ActivityQuery, key: Key) -> bool {
    match key {
        Key::Unit => matches!((rec.unit, q.unit.as_deref()), (Some(a), Some(b)) if a == b),
        Key::SkillFocus => {
            matches!((rec.skill_focus, q.skill_focus.as_deref()), (Some(a), Some(b)) if a == b)
        }
        Key::GradeBand => {
            matches!((rec.grade_band, q.grade_band.as_deref()), (Some(a), Some(b)) if a == b)
        }
        Key::Intent => matches!((rec.intent, q.intent), (Some(a), Some(b)) if a == b),
    }
}

/// Loose compatibility: a criterion only rules a suggestion out when both
/// sides set it and they differ. Units compare by normalized key.
fn compatible(rec: &Recommendation, q: &ActivityQuery) -> bool {
    if let (Some(a), Some(b)) = (rec.unit, q.unit.as_deref()) {
        if normalize(a, false) != normalize(b, false) {
            return false;
        }
    }
    if let (Some(a), Some(b)) = (rec.skill_focus, q.skill_focus.as_deref()) {
        if a != b {
            return false;
        }
    }
    if let (Some(a), Some(b)) = (rec.grade_band, q.grade_band.as_deref()) {
        if a != b {
            return false;
        }
    }
    if let (Some(a), Some(b)) = (rec.intent, q.intent) {
        if a != b {
            return false;
        }
    }
    true
}

/// Suggestions for the most specific priority set that yields anything, or
/// the generic fallback list.
pub fn activity_suggestions(query: &ActivityQuery) -> Vec<ActivitySuggestion> {
    let cleaned = ActivityQuery {
        unit: query.unit.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(String::from),
        skill_focus: query
            .skill_focus
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
        grade_band: query.grade_band.clone(),
        intent: query.intent,
    };

    for required in PRIORITY_SETS {
        let hits: Vec<ActivitySuggestion> = ACTIVITY_SUGGESTIONS
            .iter()
            .filter(|s| {
                let rec = s.recommended_for.unwrap_or_default();
                required.iter().all(|k| key_matches_exactly(&rec, &cleaned, *k))
                    && compatible(&rec, &cleaned)
            })
            .copied()
            .collect();
        if !hits.is_empty() {
            return hits;
        }
    }
    FALLBACK_ACTIVITIES.to_vec()
}
