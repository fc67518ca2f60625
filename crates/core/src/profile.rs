//! The structured medical profile collected during a session.
//!
//! A [`Profile`] maps a fixed set of [`ProfileField`]s to typed [`FieldValue`]s. A field that has
//! never been answered is absent from the map; an answer of `""` is stored as an empty text value,
//! so "unset" and "blank" stay distinguishable for validation.

use crate::CarePlanError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The named fields of a medical profile, declared in question priority order.
///
/// Declaration order is significant: it is the fixed priority used to order validation results
/// and therefore the order in which questions are asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    #[serde(alias = "diseaseType")]
    DiseaseType,
    Stage,
    #[serde(alias = "surgeryAllowed")]
    SurgeryAllowed,
    #[serde(alias = "priorTreatment")]
    PriorTreatment,
    #[serde(alias = "preferredTreatment")]
    PreferredTreatment,
    Age,
    Gender,
    #[serde(alias = "medicalHistory")]
    MedicalHistory,
    Symptoms,
    #[serde(alias = "budgetLimit")]
    BudgetLimit,
    #[serde(alias = "locationType")]
    LocationType,
    #[serde(alias = "hospitalPreference")]
    HospitalPreference,
}

/// How a raw answer for a field is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Flag,
    Number,
}

impl ProfileField {
    /// All fields in priority order.
    pub const ALL: [ProfileField; 12] = [
        ProfileField::DiseaseType,
        ProfileField::Stage,
        ProfileField::SurgeryAllowed,
        ProfileField::PriorTreatment,
        ProfileField::PreferredTreatment,
        ProfileField::Age,
        ProfileField::Gender,
        ProfileField::MedicalHistory,
        ProfileField::Symptoms,
        ProfileField::BudgetLimit,
        ProfileField::LocationType,
        ProfileField::HospitalPreference,
    ];

    /// Snake-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileField::DiseaseType => "disease_type",
            ProfileField::Stage => "stage",
            ProfileField::SurgeryAllowed => "surgery_allowed",
            ProfileField::PriorTreatment => "prior_treatment",
            ProfileField::PreferredTreatment => "preferred_treatment",
            ProfileField::Age => "age",
            ProfileField::Gender => "gender",
            ProfileField::MedicalHistory => "medical_history",
            ProfileField::Symptoms => "symptoms",
            ProfileField::BudgetLimit => "budget_limit",
            ProfileField::LocationType => "location_type",
            ProfileField::HospitalPreference => "hospital_preference",
        }
    }

    /// Camel-case alias accepted on input.
    fn camel_case(&self) -> &'static str {
        match self {
            ProfileField::DiseaseType => "diseaseType",
            ProfileField::SurgeryAllowed => "surgeryAllowed",
            ProfileField::PriorTreatment => "priorTreatment",
            ProfileField::PreferredTreatment => "preferredTreatment",
            ProfileField::MedicalHistory => "medicalHistory",
            ProfileField::BudgetLimit => "budgetLimit",
            ProfileField::LocationType => "locationType",
            ProfileField::HospitalPreference => "hospitalPreference",
            other => other.as_str(),
        }
    }

    /// Human-readable label used in messages.
    pub fn label(&self) -> &'static str {
        match self {
            ProfileField::DiseaseType => "disease type",
            ProfileField::Stage => "stage",
            ProfileField::SurgeryAllowed => "surgery allowed",
            ProfileField::PriorTreatment => "prior treatment",
            ProfileField::PreferredTreatment => "preferred treatment",
            ProfileField::Age => "age",
            ProfileField::Gender => "gender",
            ProfileField::MedicalHistory => "medical history",
            ProfileField::Symptoms => "symptoms",
            ProfileField::BudgetLimit => "budget limit",
            ProfileField::LocationType => "location type",
            ProfileField::HospitalPreference => "hospital preference",
        }
    }

    /// Position in the fixed priority list (0 = asked first).
    pub fn priority(&self) -> usize {
        *self as usize
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            ProfileField::SurgeryAllowed => ValueKind::Flag,
            ProfileField::Age | ProfileField::BudgetLimit => ValueKind::Number,
            _ => ValueKind::Text,
        }
    }
}

impl fmt::Display for ProfileField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileField {
    type Err = CarePlanError;

    /// Accepts the snake-case name or its camel-case alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ProfileField::ALL
            .into_iter()
            .find(|f| f.as_str() == s || f.camel_case() == s)
            .ok_or_else(|| CarePlanError::InvalidInput(format!("unknown profile field '{s}'")))
    }
}

/// A typed profile value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Interpret a raw answer according to the field's expected kind.
    ///
    /// Answers that do not fit the expected kind are kept verbatim as text so that validation can
    /// report them and the question can be asked again.
    pub fn from_answer(field: ProfileField, raw: &str) -> Self {
        let trimmed = raw.trim();
        match field.value_kind() {
            ValueKind::Text => FieldValue::Text(trimmed.to_string()),
            ValueKind::Flag => match trimmed.to_ascii_lowercase().as_str() {
                "yes" | "y" | "true" | "1" => FieldValue::Flag(true),
                "no" | "n" | "false" | "0" => FieldValue::Flag(false),
                _ => FieldValue::Text(trimmed.to_string()),
            },
            ValueKind::Number => match trimmed.replace(',', "").parse::<f64>() {
                Ok(n) if n.is_finite() => FieldValue::Number(n),
                _ => FieldValue::Text(trimmed.to_string()),
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// True for text values that are empty after trimming.
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(true) => f.write_str("yes"),
            FieldValue::Flag(false) => f.write_str("no"),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// One answer submitted by the user: a target field and the raw text they gave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub field: ProfileField,
    pub value: String,
}

impl Answer {
    pub fn new(field: ProfileField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// The evolving medical profile of one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile {
    values: BTreeMap<ProfileField, FieldValue>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: ProfileField) -> Option<&FieldValue> {
        self.values.get(&field)
    }

    pub fn is_set(&self, field: ProfileField) -> bool {
        self.values.contains_key(&field)
    }

    /// Text value of a field, if it is set, is text and is not blank.
    pub fn text(&self, field: ProfileField) -> Option<&str> {
        self.get(field)
            .and_then(FieldValue::as_text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn flag(&self, field: ProfileField) -> Option<bool> {
        self.get(field).and_then(FieldValue::as_flag)
    }

    /// Set one field, returning the value it replaced. Last write wins.
    pub fn set(&mut self, field: ProfileField, value: FieldValue) -> Option<FieldValue> {
        self.values.insert(field, value)
    }

    /// Apply an answer, parsing it by the field's expected kind.
    pub fn apply(&mut self, answer: &Answer) -> Option<FieldValue> {
        self.set(answer.field, FieldValue::from_answer(answer.field, &answer.value))
    }

    /// Merge another profile into this one. Fields present in `other` win; fields only present
    /// here are kept.
    pub fn merge(&mut self, other: Profile) {
        self.values.extend(other.values);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProfileField, &FieldValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
