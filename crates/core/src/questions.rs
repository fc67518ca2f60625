//! Mapping from unmet constraints to the questions that resolve them.

use crate::profile::ProfileField;
use crate::validation::{
    ValidationResult, Violation, ViolationKind, HOSPITAL_PREFERENCES, LOCATION_TYPES,
};
use serde::{Deserialize, Serialize};

/// The form of answer a question expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerShape {
    FreeText,
    SingleChoice { options: Vec<String> },
    NumericRange { min: f64, max: Option<f64> },
}

/// A question put to the user for one profile field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub field: ProfileField,
    pub prompt: String,
    pub shape: AnswerShape,
}

fn choice(options: &[&str]) -> AnswerShape {
    AnswerShape::SingleChoice {
        options: options.iter().map(|o| o.to_string()).collect(),
    }
}

fn base_prompt(field: ProfileField) -> &'static str {
    match field {
        ProfileField::DiseaseType => "What condition or disease are you seeking a plan for?",
        ProfileField::Stage => "What is the stage of your condition (for example I, II, III or IV)?",
        ProfileField::SurgeryAllowed => "Is surgery an acceptable option for you?",
        ProfileField::PriorTreatment => {
            "What treatment have you received so far for this condition (answer 'none' if none)?"
        }
        ProfileField::PreferredTreatment => "Do you have a preferred type of treatment?",
        ProfileField::Age => "What is your age?",
        ProfileField::Gender => "What is your gender?",
        ProfileField::MedicalHistory => "Please describe any relevant medical history.",
        ProfileField::Symptoms => "What symptoms are you currently experiencing?",
        ProfileField::BudgetLimit => "What is your maximum budget for treatment?",
        ProfileField::LocationType => {
            "Do you prefer treatment locally, elsewhere in the country, or internationally?"
        }
        ProfileField::HospitalPreference => {
            "Do you prefer a government hospital, a private hospital, or either?"
        }
    }
}

fn shape(field: ProfileField) -> AnswerShape {
    match field {
        ProfileField::SurgeryAllowed => choice(&["yes", "no"]),
        ProfileField::Age => AnswerShape::NumericRange {
            min: 0.0,
            max: Some(120.0),
        },
        ProfileField::BudgetLimit => AnswerShape::NumericRange {
            min: 0.0,
            max: None,
        },
        ProfileField::LocationType => choice(&LOCATION_TYPES),
        ProfileField::HospitalPreference => choice(&HOSPITAL_PREFERENCES),
        _ => AnswerShape::FreeText,
    }
}

fn question_for(violation: &Violation) -> Question {
    let field = violation.field;
    let prompt = match violation.kind {
        ViolationKind::Conflict => format!(
            "Your answers conflict: {}. {}",
            violation.reason,
            base_prompt(field)
        ),
        _ if violation.is_unanswered() => base_prompt(field).to_string(),
        _ => format!(
            "{} Previous answer was not accepted: {}.",
            base_prompt(field),
            violation.reason
        ),
    };
    Question {
        field,
        prompt,
        shape: shape(field),
    }
}

/// Stateless lookup from violations to questions.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestionCatalog;

impl QuestionCatalog {
    /// The canned question for a field that has not been asked about yet.
    pub fn question(&self, field: ProfileField) -> Question {
        Question {
            field,
            prompt: base_prompt(field).to_string(),
            shape: shape(field),
        }
    }

    /// One question per violated field, in result order. The first question always targets the
    /// first unmet constraint; the result is empty only when `result` is.
    pub fn next_questions(&self, result: &ValidationResult) -> Vec<Question> {
        let mut questions: Vec<Question> = Vec::new();
        for violation in result.violations() {
            if questions.iter().any(|q| q.field == violation.field) {
                continue;
            }
            questions.push(question_for(violation));
        }
        questions
    }
}
