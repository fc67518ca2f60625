//! Profile completeness and consistency checks.
//!
//! Validation is a pure function of a [`Profile`] snapshot. Every rule in [`RULES`] is evaluated
//! on every check, so one failing rule never hides another, and the resulting violations are
//! ordered by field priority so that question sequences are reproducible.

use crate::knowledge::KnowledgeBase;
use crate::profile::{FieldValue, Profile, ProfileField};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Fields every profile must carry before a plan can be produced.
pub const ALWAYS_REQUIRED: [ProfileField; 3] = [
    ProfileField::DiseaseType,
    ProfileField::Stage,
    ProfileField::SurgeryAllowed,
];

/// Accepted values for `location_type`.
pub const LOCATION_TYPES: [&str; 3] = ["local", "national", "international"];

/// Accepted values for `hospital_preference`.
pub const HOSPITAL_PREFERENCES: [&str; 3] = ["government", "private", "any"];

/// Words in a preferred treatment that imply a surgical procedure.
pub const SURGICAL_KEYWORDS: [&str; 7] = [
    "surgery",
    "surgical",
    "mastectomy",
    "lumpectomy",
    "cabg",
    "resection",
    "amputation",
];

/// The kind of constraint a field failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Missing,
    Blank,
    InvalidChoice,
    NotANumber,
    OutOfRange,
    RequiredForStage,
    Conflict,
}

/// One unmet constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub field: ProfileField,
    pub kind: ViolationKind,
    pub reason: String,
}

impl Violation {
    fn new(field: ProfileField, kind: ViolationKind, reason: impl Into<String>) -> Self {
        Self {
            field,
            kind,
            reason: reason.into(),
        }
    }

    /// True when the field simply has no usable answer yet.
    pub fn is_unanswered(&self) -> bool {
        matches!(
            self.kind,
            ViolationKind::Missing | ViolationKind::Blank | ViolationKind::RequiredForStage
        )
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.reason)
    }
}

/// Ordered set of violations for one profile snapshot. Empty means plan-ready.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// The first unmet constraint by field priority.
    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}

impl FromIterator<Violation> for ValidationResult {
    fn from_iter<I: IntoIterator<Item = Violation>>(iter: I) -> Self {
        let mut violations: Vec<Violation> = iter.into_iter().collect();
        // Stable: rule declaration order is kept within a field.
        violations.sort_by_key(|v| v.field.priority());
        Self { violations }
    }
}

/// A single declarative constraint.
#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Field must be set and not blank.
    Required(ProfileField),
    /// Field, when answered, must be yes or no.
    Flag(ProfileField),
    /// Field, when answered, must be a number within the bounds.
    Number {
        field: ProfileField,
        min: f64,
        max: Option<f64>,
        min_exclusive: bool,
    },
    /// Field, when answered, must be one of the options (case-insensitive).
    Choice(ProfileField, &'static [&'static str]),
    /// Disease/stage dependent required fields from the knowledge base.
    StageRequirements,
    /// Surgery declined while a surgical treatment is preferred.
    SurgeryConflict,
}

const RULES: &[Rule] = &[
    Rule::Required(ProfileField::DiseaseType),
    Rule::Required(ProfileField::Stage),
    Rule::Required(ProfileField::SurgeryAllowed),
    Rule::Flag(ProfileField::SurgeryAllowed),
    Rule::StageRequirements,
    Rule::Number {
        field: ProfileField::Age,
        min: 0.0,
        max: Some(120.0),
        min_exclusive: false,
    },
    Rule::Number {
        field: ProfileField::BudgetLimit,
        min: 0.0,
        max: None,
        min_exclusive: true,
    },
    Rule::Choice(ProfileField::LocationType, &LOCATION_TYPES),
    Rule::Choice(ProfileField::HospitalPreference, &HOSPITAL_PREFERENCES),
    Rule::SurgeryConflict,
];

/// Answered, non-blank value of a field.
fn answered(profile: &Profile, field: ProfileField) -> Option<&FieldValue> {
    profile.get(field).filter(|v| !v.is_blank())
}

fn describe_range(min: f64, max: Option<f64>, min_exclusive: bool) -> String {
    let min = FieldValue::Number(min);
    match (max, min_exclusive) {
        (Some(max), _) => format!("between {min} and {}", FieldValue::Number(max)),
        (None, true) => format!("greater than {min}"),
        (None, false) => format!("at least {min}"),
    }
}

impl Rule {
    fn evaluate(&self, profile: &Profile, knowledge: &dyn KnowledgeBase, out: &mut Vec<Violation>) {
        match *self {
            Rule::Required(field) => match profile.get(field) {
                None => out.push(Violation::new(
                    field,
                    ViolationKind::Missing,
                    format!("{} is required", field.label()),
                )),
                Some(v) if v.is_blank() => out.push(Violation::new(
                    field,
                    ViolationKind::Blank,
                    format!("{} cannot be blank", field.label()),
                )),
                Some(_) => {}
            },
            Rule::Flag(field) => {
                if let Some(value) = answered(profile, field) {
                    if value.as_flag().is_none() {
                        out.push(Violation::new(
                            field,
                            ViolationKind::InvalidChoice,
                            format!("{} must be yes or no, got '{value}'", field.label()),
                        ));
                    }
                }
            }
            Rule::Number {
                field,
                min,
                max,
                min_exclusive,
            } => {
                let Some(value) = answered(profile, field) else {
                    return;
                };
                match value.as_number() {
                    None => out.push(Violation::new(
                        field,
                        ViolationKind::NotANumber,
                        format!("{} must be a number, got '{value}'", field.label()),
                    )),
                    Some(n) => {
                        let below = if min_exclusive { n <= min } else { n < min };
                        let above = max.is_some_and(|max| n > max);
                        if below || above {
                            out.push(Violation::new(
                                field,
                                ViolationKind::OutOfRange,
                                format!(
                                    "{} must be {}, got {value}",
                                    field.label(),
                                    describe_range(min, max, min_exclusive)
                                ),
                            ));
                        }
                    }
                }
            }
            Rule::Choice(field, options) => {
                let Some(value) = answered(profile, field) else {
                    return;
                };
                let text = value.to_string();
                let text = text.trim();
                if !options.iter().any(|o| o.eq_ignore_ascii_case(text)) {
                    out.push(Violation::new(
                        field,
                        ViolationKind::InvalidChoice,
                        format!(
                            "{} must be one of {}, got '{text}'",
                            field.label(),
                            options.join(", ")
                        ),
                    ));
                }
            }
            Rule::StageRequirements => {
                let (Some(disease), Some(stage)) = (
                    profile.text(ProfileField::DiseaseType),
                    profile.text(ProfileField::Stage),
                ) else {
                    return;
                };
                for field in knowledge.required_fields(disease, stage) {
                    if ALWAYS_REQUIRED.contains(&field) || answered(profile, field).is_some() {
                        continue;
                    }
                    out.push(Violation::new(
                        field,
                        ViolationKind::RequiredForStage,
                        format!(
                            "{} is required for {disease} stage {stage}",
                            field.label()
                        ),
                    ));
                }
            }
            Rule::SurgeryConflict => {
                if profile.flag(ProfileField::SurgeryAllowed) != Some(false) {
                    return;
                }
                let Some(preferred) = profile.text(ProfileField::PreferredTreatment) else {
                    return;
                };
                let lower = preferred.to_lowercase();
                if SURGICAL_KEYWORDS.iter().any(|k| lower.contains(k)) {
                    out.push(Violation::new(
                        ProfileField::SurgeryAllowed,
                        ViolationKind::Conflict,
                        format!(
                            "surgery is marked as not allowed but the preferred treatment '{preferred}' is surgical"
                        ),
                    ));
                }
            }
        }
    }
}

/// Checks profiles against the fixed rule list and the knowledge base.
#[derive(Clone)]
pub struct ValidationEngine {
    knowledge: Arc<dyn KnowledgeBase>,
}

impl ValidationEngine {
    pub fn new(knowledge: Arc<dyn KnowledgeBase>) -> Self {
        Self { knowledge }
    }

    /// Evaluate every rule against `profile`.
    pub fn check(&self, profile: &Profile) -> ValidationResult {
        let mut violations = Vec::new();
        for rule in RULES {
            rule.evaluate(profile, self.knowledge.as_ref(), &mut violations);
        }
        violations.into_iter().collect()
    }
}
