//! Wire-level request and response types.
//!
//! These mirror the core session types in a flat, schema-friendly form. The plan document keeps
//! the exact `{treatment_plan, recommended_hospitals, explanation, disclaimer}` shape.

use careplan_core::{
    AnswerShape, FailureCause, FailureReport, HistoryEntry, Phase, Plan, Question, Session,
    SessionStart, SubmitOutcome,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StartSessionReq {
    /// Free-text health goal, e.g. "manage newly diagnosed breast cancer".
    pub goal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StartSessionRes {
    pub session_id: String,
    pub questions: Vec<QuestionDto>,
}

/// A question with its expected answer shape flattened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuestionDto {
    pub field: String,
    pub prompt: String,
    /// One of `free_text`, `single_choice`, `numeric_range`.
    pub answer_kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmitAnswerReq {
    /// Profile field name, snake_case or camelCase.
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmitAnswerRes {
    /// One of `needs_more_data`, `completed`, `failed`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<QuestionDto>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanDocument>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TreatmentPlan {
    pub disease_type: String,
    pub treatment_type: String,
    pub timeline: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HospitalRecommendation {
    pub name: String,
    pub location: String,
    #[serde(rename = "type")]
    pub facility_type: String,
    pub priority_rank: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlanDocument {
    pub treatment_plan: TreatmentPlan,
    pub recommended_hospitals: Vec<HospitalRecommendation>,
    pub explanation: String,
    pub disclaimer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FailureDto {
    /// Stable code, e.g. `upstream_transient_failure` or `aborted`.
    pub cause: String,
    pub detail: String,
    pub disclaimer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HistoryItemDto {
    pub at: String,
    /// `asked` or `answered`.
    pub kind: String,
    pub fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SessionRes {
    pub session_id: String,
    pub goal: String,
    pub created_at: String,
    pub phase: String,
    pub rounds: usize,
    pub profile: BTreeMap<String, String>,
    pub history: Vec<HistoryItemDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDto>,
    /// Present when the decision was flagged for manual clinical review.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_review: Option<ManualReviewDto>,
    #[serde(default)]
    pub followups: Vec<FollowUpDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ManualReviewDto {
    pub flags: Vec<String>,
    pub notice: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FollowUpDto {
    /// `initial_consultation`, `diagnostic_reports` or `treatment_follow_up`.
    pub kind: String,
    pub message: String,
    /// ISO date, `YYYY-MM-DD`.
    pub due: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AbortRes {
    pub session_id: String,
    pub phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureDto>,
}

impl From<&Question> for QuestionDto {
    fn from(q: &Question) -> Self {
        let (answer_kind, options, min, max) = match &q.shape {
            AnswerShape::FreeText => ("free_text", Vec::new(), None, None),
            AnswerShape::SingleChoice { options } => ("single_choice", options.clone(), None, None),
            AnswerShape::NumericRange { min, max } => ("numeric_range", Vec::new(), Some(*min), *max),
        };
        Self {
            field: q.field.as_str().to_string(),
            prompt: q.prompt.clone(),
            answer_kind: answer_kind.to_string(),
            options,
            min,
            max,
        }
    }
}

fn questions(qs: &[Question]) -> Vec<QuestionDto> {
    qs.iter().map(QuestionDto::from).collect()
}

impl From<&Plan> for PlanDocument {
    fn from(plan: &Plan) -> Self {
        let decision = plan.treatment_plan();
        Self {
            treatment_plan: TreatmentPlan {
                disease_type: decision.disease_type.clone(),
                treatment_type: decision.treatment_type.clone(),
                timeline: decision.timeline.clone(),
                notes: decision.notes.clone(),
            },
            recommended_hospitals: plan
                .recommended_hospitals()
                .iter()
                .map(|f| HospitalRecommendation {
                    name: f.name.clone(),
                    location: f.location.clone(),
                    facility_type: f.facility_type.clone(),
                    priority_rank: f.priority_rank,
                })
                .collect(),
            explanation: plan.explanation().to_string(),
            disclaimer: plan.disclaimer().to_string(),
        }
    }
}

impl From<&FailureReport> for FailureDto {
    fn from(report: &FailureReport) -> Self {
        Self {
            cause: report.cause.kind().to_string(),
            detail: report.cause.to_string(),
            disclaimer: report.disclaimer.clone(),
        }
    }
}

impl From<&FailureCause> for FailureDto {
    fn from(cause: &FailureCause) -> Self {
        Self::from(&FailureReport::new(cause.clone()))
    }
}

/// Failure details for a phase, if it is `failed`.
pub fn phase_failure(phase: &Phase) -> Option<FailureDto> {
    match phase {
        Phase::Failed { cause } => Some(FailureDto::from(cause)),
        _ => None,
    }
}

impl From<&SessionStart> for StartSessionRes {
    fn from(start: &SessionStart) -> Self {
        Self {
            session_id: start.session_id.to_string(),
            questions: questions(&start.questions),
        }
    }
}

impl From<&SubmitOutcome> for SubmitAnswerRes {
    fn from(outcome: &SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::NeedsMoreData { questions: qs } => Self {
                status: "needs_more_data".into(),
                questions: Some(questions(qs)),
                plan: None,
                failure: None,
            },
            SubmitOutcome::Completed { plan } => Self {
                status: "completed".into(),
                questions: None,
                plan: Some(PlanDocument::from(plan)),
                failure: None,
            },
            SubmitOutcome::Failed { failure } => Self {
                status: "failed".into(),
                questions: None,
                plan: None,
                failure: Some(FailureDto::from(failure)),
            },
        }
    }
}

impl From<&Session> for SessionRes {
    fn from(session: &Session) -> Self {
        let history = session
            .history()
            .iter()
            .map(|entry| match entry {
                HistoryEntry::Asked { at, questions } => HistoryItemDto {
                    at: at.to_rfc3339(),
                    kind: "asked".into(),
                    fields: questions
                        .iter()
                        .map(|q| q.field.as_str().to_string())
                        .collect(),
                    value: None,
                },
                HistoryEntry::Answered { at, answer } => HistoryItemDto {
                    at: at.to_rfc3339(),
                    kind: "answered".into(),
                    fields: vec![answer.field.as_str().to_string()],
                    value: Some(answer.value.clone()),
                },
            })
            .collect();

        Self {
            session_id: session.id().to_string(),
            goal: session.goal().to_string(),
            created_at: session.created_at().to_rfc3339(),
            phase: session.phase().to_string(),
            rounds: session.rounds(),
            profile: session
                .profile()
                .iter()
                .map(|(field, value)| (field.as_str().to_string(), value.to_string()))
                .collect(),
            history,
            failure: phase_failure(session.phase()),
            manual_review: session.review().and_then(|review| {
                review.notice().map(|notice| ManualReviewDto {
                    flags: review.flags.iter().map(ToString::to_string).collect(),
                    notice,
                })
            }),
            followups: session
                .followups()
                .iter()
                .map(|f| FollowUpDto {
                    kind: f.kind.as_str().to_string(),
                    message: f.message.clone(),
                    due: f.due.to_string(),
                })
                .collect(),
        }
    }
}
