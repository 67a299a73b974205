//! Lesson drafting helpers: template drafts by band and unit, seeded draft
//! variants, and the plan-my-game lesson builder.

use serde::{Deserialize, Serialize};

use crate::curriculum::{self, Band};

struct DraftTemplate {
    warm_up: &'static str,
    main_activity: &'static str,
    modifications: &'static str,
    assessment: &'static str,
    closure: &'static str,
}

const ELEMENTARY_DRAFTS: &[(&str, DraftTemplate)] = &[
    (
        "Locomotor Skills",
        DraftTemplate {
            warm_up: "Begin with a 5-minute movement review. Have students practice basic locomotor patterns (walking, jogging, skipping, galloping) in general space. Use music or drum beats to set the rhythm. Include directional changes and level variations.",
            main_activity: "Set up activity stations focusing on different locomotor skills. Students rotate through 2-3 stations, practicing: (1) Jumping and landing patterns, (2) Running with directional changes, (3) Skipping and galloping in pathways. Provide visual markers and verbal cues for proper form.",
            modifications: "For struggling students: reduce distance, use closer spacing between markers, provide hand-over-hand guidance. For advanced students: add complex pathways, increase speed requirements, combine multiple skills.",
            assessment: "Observe students for proper body alignment, control, and smooth transitions. Check ability to follow directional commands and adjust movement patterns. Use a simple checklist of key locomotor cues.",
            closure: "Cool down with guided stretching while seated. Discuss which movements felt easiest and which need practice. Ask students to name locomotor skills they used today.",
        },
    ),
    (
        "Throwing & Catching",
        DraftTemplate {
            warm_up: "Practice basic hand movements: throwing arm circles, catching motion rehearsal, and light toss-and-catch with a partner using soft balls or bean bags. Start from close distance.",
            main_activity: "Progressive throwing and catching: (1) Toss and catch with self, (2) Partner toss and catch at increasing distances, (3) Target throws at cones or targets. Emphasize stepping into throws and watching the object into hands.",
            modifications: "Struggling students: use larger, softer objects; reduce distance; provide foam balls. Advanced: smaller objects, greater distances, moving targets, one-handed catches.",
            assessment: "Observe hand positioning, footwork, eye tracking, and catch completion rate. Check for proper grip and follow-through on throws.",
            closure: "Gather and review proper throwing and catching form. Have students demonstrate one successful throw and catch.",
        },
    ),
    (
        "Striking",
        DraftTemplate {
            warm_up: "Arm swings and striking motion practice without equipment. Students practice overhead, underhand, and sidearm striking motions. Include hip rotation and weight transfer.",
            main_activity: "Striking progression: (1) Strike stationary objects (cones, plastic bottles), (2) Strike moving objects with bat or paddle, (3) Cooperative hitting game. Use plastic bats, paddles, or modified equipment.",
            modifications: "Beginners: larger, slower-moving objects; shorter implements; closer targets. Advanced: faster objects, longer distance, accuracy targets, combination strikes.",
            assessment: "Observe stance, grip, swing mechanics, and contact point. Check consistency and control.",
            closure: "Review proper striking stance and swing. Discuss what makes a good strike.",
        },
    ),
    (
        "Fitness Basics",
        DraftTemplate {
            warm_up: "Light movement exploration: slow jog, arm swings, leg lifts, gentle stretching. Build heart rate gradually.",
            main_activity: "Fitness concepts introduction: practice basic exercises (jumping jacks, squats, lunges, push-ups on knees). Complete a simple circuit with 3-4 stations. Focus on proper form over repetitions.",
            modifications: "Struggling: reduce repetitions, offer modified versions (wall push-ups, step-back lunges). Advanced: increase repetitions, add complexity, add balance challenges.",
            assessment: "Observe effort level, form quality, and willingness to try. Use simple demonstration checklist.",
            closure: "Cool down with deep breathing and stretching. Discuss how the body felt during exercise.",
        },
    ),
];

const MIDDLE_DRAFTS: &[(&str, DraftTemplate)] = &[
    (
        "Invasion Games",
        DraftTemplate {
            warm_up: "Movement preparation: jogging, dynamic stretching, footwork drills (lateral slides, forward/backward running, change of direction drills). Increase heart rate progressively.",
            main_activity: "Teach/review invasion game concepts: offensive and defensive positioning, passing and receiving, transition from defense to offense. Use simplified rules. Lead small-sided games (3v3 or 4v4) with emphasis on positioning and decision-making.",
            modifications: "Beginners: larger play area, fewer defenders, simplified scoring. Advanced: smaller space, more complex rules, emphasis on strategy and positioning.",
            assessment: "Observe offensive/defensive positioning, passing accuracy, game decision-making, and effort. Note transition skills.",
            closure: "Debrief game strategy: what worked offensively/defensively? Discuss key positions and roles.",
        },
    ),
    (
        "Net/Wall Games",
        DraftTemplate {
            warm_up: "Dynamic stretching with emphasis on shoulders, hips, and legs. Practice basic movement patterns: side-stepping, forward/backward movement. Arm circles and shoulder rotations.",
            main_activity: "Net/wall game fundamentals: proper stance, underhand and overhand striking, placement strategy. Practice over a net or against a wall. Progress from cooperative to competitive play.",
            modifications: "Beginners: lower net/wall target, slower ball, more touches allowed. Advanced: higher net, faster pace, one-touch limits.",
            assessment: "Observe racket control, footwork positioning, and striking accuracy. Check understanding of court positioning.",
            closure: "Review proper grip and striking zones. Discuss strategy for winning points.",
        },
    ),
    (
        "Fitness Concepts",
        DraftTemplate {
            warm_up: "Review basic fitness components: cardiovascular endurance, muscular strength, flexibility. Light cardio and dynamic stretching.",
            main_activity: "Teach fitness principles: warm-up importance, proper form, progressive overload. Students perform a structured workout including cardio, strength, and flexibility components. Introduce fitness tracking (counting reps, measuring intensity).",
            modifications: "Struggling: reduce intensity, modify exercises, provide close form feedback. Advanced: increase complexity, track metrics, create personal workout goals.",
            assessment: "Observe exercise form, effort level, ability to self-monitor, and engagement with fitness concepts.",
            closure: "Cool down with guided stretching. Discuss personal fitness goals and how to build fitness safely.",
        },
    ),
];

const HIGH_DRAFTS: &[(&str, DraftTemplate)] = &[
    (
        "Strength & Conditioning",
        DraftTemplate {
            warm_up: "Dynamic warm-up with sport-specific movements: light cardio, dynamic stretching, mobility exercises, movement prep for planned activities.",
            main_activity: "Strength training principles: proper form, progressive overload, compound movements (squats, deadlifts, push-ups, rows). Students work through a structured program with appropriate resistance. Include core and functional fitness work.",
            modifications: "Beginners: lower weights/resistance, more rest, form-focused work. Advanced: increased load, reduced rest, advanced variations, plyometric elements.",
            assessment: "Evaluate proper lifting mechanics, ability to adjust load appropriately, safety practices, and progression understanding.",
            closure: "Cool down and stretch major muscle groups. Discuss recovery importance and program progression.",
        },
    ),
    (
        "Lifetime Activities",
        DraftTemplate {
            warm_up: "Activity-specific warm-up: light cardio plus dynamic stretching targeting muscles used in selected activity.",
            main_activity: "Teach/practice lifetime activity (e.g., tennis, golf, hiking skills, swimming technique). Emphasize proper technique, rules, strategy, and enjoyment. Include competitive and recreational play/practice.",
            modifications: "Beginners: simplified rules, reduced complexity, more instruction. Advanced: official rules, competitive scenarios, refereeing roles.",
            assessment: "Observe skill execution, rule understanding, tactical decisions, and appreciation for lifelong participation.",
            closure: "Discuss activity value for lifetime wellness and personal preferences.",
        },
    ),
    (
        "Personal Fitness Plans",
        DraftTemplate {
            warm_up: "Review fitness assessment methods: cardiovascular tests, strength assessments, flexibility measurements.",
            main_activity: "Students develop personalized fitness plans based on goals and current fitness levels. Cover: goal-setting (SMART), exercise selection, periodization, progression, and tracking methods. Work with partners or individually.",
            modifications: "Struggling: provide templates and examples, reduce complexity. Advanced: independent research, complex periodization, competitive goal-setting.",
            assessment: "Evaluate plan completeness, goal appropriateness, exercise selection, and understanding of fitness principles.",
            closure: "Share plans and discuss. Review commitment to personal fitness goals.",
        },
    ),
];

fn drafts_for(band: Band) -> &'static [(&'static str, DraftTemplate)] {
    match band {
        Band::Elementary => ELEMENTARY_DRAFTS,
        Band::Middle => MIDDLE_DRAFTS,
        Band::High => HIGH_DRAFTS,
    }
}

/// Exact unit match within the band, else the band's first unit, else
/// elementary Fitness Basics.
fn resolve_template(band: &str, unit: &str) -> &'static DraftTemplate {
    let fitness_basics = &ELEMENTARY_DRAFTS[3].1;
    let Some(band) = Band::parse(band) else {
        return fitness_basics;
    };
    let pool = drafts_for(band);
    pool.iter()
        .find(|(name, _)| *name == unit)
        .or_else(|| pool.first())
        .map(|(_, t)| t)
        .unwrap_or(fitness_basics)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DurationFactor {
    Short,
    Medium,
    Long,
}

fn duration_factor(minutes: i64) -> DurationFactor {
    if minutes <= 30 {
        DurationFactor::Short
    } else if minutes <= 60 {
        DurationFactor::Medium
    } else {
        DurationFactor::Long
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftInput {
    pub band: String,
    #[serde(default)]
    pub grade_group: String,
    #[serde(default)]
    pub unit: String,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDraft {
    pub warm_up: String,
    pub main_activity: String,
    pub modifications: String,
    pub assessment: String,
    pub closure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_suggestion: Option<String>,
}

pub fn lesson_draft(input: &DraftInput) -> LessonDraft {
    let t = resolve_template(&input.band, &input.unit);
    let mut warm_up = t.warm_up.to_string();
    let mut main_activity = t.main_activity.to_string();
    let mut closure = t.closure.to_string();

    match duration_factor(input.duration_minutes) {
        DurationFactor::Short => {
            let first = t.warm_up.split('.').next().unwrap_or_default();
            warm_up = format!("{first}.");
            let focus = t
                .main_activity
                .split(':')
                .nth(1)
                .and_then(|s| s.split('.').next())
                .filter(|s| !s.is_empty())
                .unwrap_or("practice core skill");
            main_activity = format!("Quick focus session: {focus}.");
            closure = "Brief cool down and quick reflection on today's focus.".to_string();
        }
        DurationFactor::Medium => {}
        DurationFactor::Long => {
            main_activity.push_str(" Include extended practice time and multiple game applications.");
            closure.push_str(" Allow time for detailed reflection and goal-setting.");
        }
    }

    LessonDraft {
        warm_up,
        main_activity,
        modifications: t.modifications.to_string(),
        assessment: t.assessment.to_string(),
        closure,
        title_suggestion: (!input.unit.is_empty()).then(|| format!("{} - Lesson", input.unit)),
    }
}

/// Java-style string hash (`h * 31 + c` over UTF-16 units, wrapping), made
/// non-negative.
pub fn seed_from_str(value: &str) -> u32 {
    let mut hash: i32 = 0;
    for c in value.encode_utf16() {
        hash = (hash << 5).wrapping_sub(hash).wrapping_add(c as i32);
    }
    hash.unsigned_abs()
}

/// Mulberry32: small, fast, and identical across platforms for a given seed.
pub struct SeededRng(u32);

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self(seed)
    }

    pub fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x6D2B_79F5);
        let mut t = self.0;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        f64::from(t ^ (t >> 14)) / 4_294_967_296.0
    }

    pub fn index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        ((self.next_f64() * len as f64) as usize).min(len - 1)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.index(i + 1);
            items.swap(i, j);
        }
    }
}

const TEACHER_LOOK_FORS: &[&str] = &[
    "Eyes up and scanning for open space before moving.",
    "Controlled stops on the signal with balanced feet.",
    "Consistent use of the key cue modeled at the start.",
    "Safe spacing from classmates during every round.",
    "Effort maintained through the whole activity block.",
];

const COMMON_MISTAKES: &[&str] = &[
    "Rushing the movement and losing body control.",
    "Watching the teacher instead of the space ahead.",
    "Crowding the same area as classmates.",
    "Skipping the ready position between attempts.",
    "Stopping early before the round ends.",
];

const COACHING_LANGUAGE: &[&str] = &[
    "Find your own space, then show me your ready position.",
    "Soft knees, eyes up, go when you are ready.",
    "Freeze like a statue, then look for a new open spot.",
    "Slow is smooth, smooth is fast.",
    "Show me one thing you improved since last round.",
];

const ORGANIZATION_NOTES: &[&str] = &[
    "Organize in scattered formation with clear boundaries.",
    "Organize in small groups rotating on a signal.",
    "Organize in partner pairs with one set of equipment each.",
    "Organize in lines of three with short turns.",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftVariant {
    pub warm_up: String,
    pub main_activity: String,
    pub modifications: String,
    pub assessment: String,
    pub closure: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_suggestion: Option<String>,
    pub skill_focus: String,
    pub progression_level: String,
    pub teacher_look_fors: String,
    pub common_mistakes: String,
    pub coaching_language: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftVariants {
    pub seed: u32,
    pub variants: Vec<DraftVariant>,
}

pub const MAX_VARIANTS: usize = 10;

fn default_seed(input: &DraftInput) -> u32 {
    seed_from_str(&format!(
        "{}|{}|{}|{}",
        input.band, input.grade_group, input.unit, input.duration_minutes
    ))
}

/// `count` drafts (clamped to 1..=10) that share the template and differ in
/// skill focus and coaching details. The same seed always yields the same
/// variants.
pub fn draft_variants(input: &DraftInput, count: usize, seed: Option<u32>) -> DraftVariants {
    let seed = seed.unwrap_or_else(|| default_seed(input));
    let mut rng = SeededRng::new(seed);
    let base = lesson_draft(input);

    let mut focuses: Vec<String> = curriculum::skill_focus_options(&input.unit)
        .into_iter()
        .filter(|o| o != curriculum::OTHER_SKILL_FOCUS)
        .collect();
    rng.shuffle(&mut focuses);

    let count = count.clamp(1, MAX_VARIANTS);
    let variants = (0..count)
        .map(|i| {
            let skill_focus = focuses
                .get(i % focuses.len().max(1))
                .cloned()
                .unwrap_or_default();
            let organization = ORGANIZATION_NOTES[rng.index(ORGANIZATION_NOTES.len())];
            DraftVariant {
                warm_up: base.warm_up.clone(),
                main_activity: format!("{} {}", base.main_activity, organization),
                modifications: base.modifications.clone(),
                assessment: base.assessment.clone(),
                closure: base.closure.clone(),
                title_suggestion: base.title_suggestion.clone(),
                skill_focus,
                progression_level: String::new(),
                teacher_look_fors: TEACHER_LOOK_FORS[rng.index(TEACHER_LOOK_FORS.len())]
                    .to_string(),
                common_mistakes: COMMON_MISTAKES[rng.index(COMMON_MISTAKES.len())].to_string(),
                coaching_language: COACHING_LANGUAGE[rng.index(COACHING_LANGUAGE.len())]
                    .to_string(),
                notes: String::new(),
            }
        })
        .collect();

    DraftVariants { seed, variants }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonDepth {
    Quick,
    #[default]
    High,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanMyGameInput {
    pub grade_group: String,
    pub duration_minutes: i64,
    pub unit: String,
    pub skill_focus: Option<String>,
    pub lesson_depth: LessonDepth,
    pub game: String,
    pub description: Option<String>,
    pub equipment: Vec<String>,
    pub space: Option<String>,
    pub notes: Option<String>,
    pub seed: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedLesson {
    pub title: String,
    pub objectives: String,
    pub main_activity: String,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warm_up: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closure: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modifications: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skill_focus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progression_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_look_fors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub common_mistakes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coaching_language: Option<String>,
}

fn trimmed(v: &Option<String>) -> &str {
    v.as_deref().map(str::trim).unwrap_or_default()
}

fn is_k2(grade_group: &str) -> bool {
    grade_group == "K-2"
}

fn game_label(game: &str, description: &str) -> String {
    if game != "Other" {
        game.to_string()
    } else if !description.is_empty() {
        "Custom Activity".to_string()
    } else {
        "Movement Exploration".to_string()
    }
}

fn format_equipment(equipment: &[String]) -> String {
    if equipment.iter().any(|e| e == "None") {
        return String::new();
    }
    equipment.join(", ")
}

fn objectives(label: &str, skill_focus: &str, grade_group: &str) -> String {
    let skill = if skill_focus.is_empty() {
        "key movement".to_string()
    } else {
        skill_focus.to_lowercase()
    };
    let safety = if is_k2(grade_group) {
        "using safe space awareness and control."
    } else {
        "using safe space awareness, control, and decision-making."
    };
    format!("Students will demonstrate {skill} skills while participating in {label}, {safety}")
}

fn progression_level(unit: &str, grade_group: &str, draft_level: &str) -> String {
    if curriculum::normalize_unit_key(unit) == "spatial awareness" && draft_level.trim().is_empty()
    {
        let level = if is_k2(grade_group) { "Intro" } else { "Development" };
        return level.to_string();
    }
    draft_level.to_string()
}

pub fn plan_my_game(input: &PlanMyGameInput) -> PlannedLesson {
    let seed = input.seed.unwrap_or_else(|| {
        seed_from_str(
            &[
                input.grade_group.clone(),
                input.duration_minutes.to_string(),
                input.unit.clone(),
                input.skill_focus.clone().unwrap_or_default(),
                match input.lesson_depth {
                    LessonDepth::Quick => "quick".to_string(),
                    LessonDepth::High => "high".to_string(),
                },
                input.game.clone(),
                input.description.clone().unwrap_or_default(),
                input.equipment.join(","),
                input.space.clone().unwrap_or_default(),
                input.notes.clone().unwrap_or_default(),
            ]
            .join("|"),
        )
    });

    let draft_input = DraftInput {
        band: Band::Elementary.as_str().to_string(),
        grade_group: input.grade_group.clone(),
        unit: input.unit.clone(),
        duration_minutes: input.duration_minutes,
    };
    let draft = draft_variants(&draft_input, 1, Some(seed))
        .variants
        .into_iter()
        .next()
        .unwrap_or_default();

    let description = trimmed(&input.description);
    let label = game_label(&input.game, description);
    let equipment = format_equipment(&input.equipment);
    let skill_focus = match trimmed(&input.skill_focus) {
        "" => draft.skill_focus.clone(),
        s => s.to_string(),
    };

    let safety_line = if is_k2(&input.grade_group) {
        "Use clear boundaries, a stop signal, and short rounds. Emphasize personal space bubbles and eyes up."
    } else {
        "Add pathways/levels or simple choices. Include light competition while keeping control and spacing."
    };
    let space = trimmed(&input.space);
    let notes = trimmed(&input.notes);
    let mut lines = vec![format!("Game: {label}.")];
    if !description.is_empty() {
        lines.push(format!("Idea: {description}"));
    }
    lines.push(
        "Setup: Establish boundaries, review rules, and model the key cues before play begins."
            .to_string(),
    );
    lines.push(
        "Play: Run multiple short rounds with quick resets and feedback between rounds.".to_string(),
    );
    lines.push(format!("Safety/Skill Focus: {safety_line}"));
    lines.push(format!("Unit Connection: {}", draft.main_activity));
    if !equipment.is_empty() {
        lines.push(format!("Equipment: {equipment}"));
    }
    if !space.is_empty() {
        lines.push(format!("Space: {space}"));
    }
    if !notes.is_empty() {
        lines.push(format!("Constraints: {notes}"));
    }

    let base = PlannedLesson {
        title: format!("{label} - {}", input.unit),
        objectives: objectives(&label, &skill_focus, &input.grade_group),
        main_activity: lines.join("\n"),
        unit: input.unit.clone(),
        ..Default::default()
    };
    if input.lesson_depth == LessonDepth::Quick {
        return base;
    }

    PlannedLesson {
        warm_up: Some(draft.warm_up),
        assessment: Some(draft.assessment),
        closure: Some(draft.closure),
        equipment: Some(equipment),
        modifications: Some(draft.modifications),
        notes: Some(if notes.is_empty() { draft.notes } else { notes.to_string() }),
        progression_level: Some(progression_level(
            &input.unit,
            &input.grade_group,
            &draft.progression_level,
        )),
        skill_focus: Some(skill_focus),
        teacher_look_fors: Some(draft.teacher_look_fors),
        common_mistakes: Some(draft.common_mistakes),
        coaching_language: Some(draft.coaching_language),
        ..base
    }
}
