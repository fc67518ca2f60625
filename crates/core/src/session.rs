//! Session state: phase, profile, dialogue history and the terminal plan or failure.
//!
//! A [`Session`] changes only through the methods here, which keep the phase machine honest:
//! terminal phases are final, every transition is logged, and a plan can be attached at most once.

use crate::compliance::ComplianceReview;
use crate::followups::FollowUp;
use crate::plan::Plan;
use crate::profile::{Answer, Profile};
use crate::questions::Question;
use crate::upstream::{CallSite, Decision};
use chrono::{DateTime, Utc};
use careplan_uuid::SessionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a session ended in [`Phase::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureCause {
    #[error("{site} service failed after {attempts} attempts: {detail}")]
    UpstreamTransientFailure {
        site: CallSite,
        attempts: u32,
        detail: String,
    },
    #[error("{site} service rejected the request: {detail}")]
    UpstreamRejection { site: CallSite, detail: String },
    #[error("session was aborted")]
    Aborted,
    #[error("no complete profile after {rounds} question rounds")]
    RoundLimitExceeded { rounds: usize },
    #[error("session state could not be saved: {detail}")]
    StorageFailure { detail: String },
}

impl FailureCause {
    /// Stable snake-case code for the cause.
    pub fn kind(&self) -> &'static str {
        match self {
            FailureCause::UpstreamTransientFailure { .. } => "upstream_transient_failure",
            FailureCause::UpstreamRejection { .. } => "upstream_rejection",
            FailureCause::Aborted => "aborted",
            FailureCause::RoundLimitExceeded { .. } => "round_limit_exceeded",
            FailureCause::StorageFailure { .. } => "storage_failure",
        }
    }
}

/// The orchestrator's state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    Collecting,
    Validating,
    Reasoning,
    Ranking,
    Assembling,
    Complete,
    Failed { cause: FailureCause },
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Complete | Phase::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Collecting => "collecting",
            Phase::Validating => "validating",
            Phase::Reasoning => "reasoning",
            Phase::Ranking => "ranking",
            Phase::Assembling => "assembling",
            Phase::Complete => "complete",
            Phase::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HistoryEntry {
    Asked {
        at: DateTime<Utc>,
        questions: Vec<Question>,
    },
    Answered {
        at: DateTime<Utc>,
        answer: Answer,
    },
}

/// One entry in the phase transition log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub at: DateTime<Utc>,
    pub from: Phase,
    pub to: Phase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    goal: String,
    phase: Phase,
    profile: Profile,
    history: Vec<HistoryEntry>,
    transitions: Vec<Transition>,
    decision: Option<Decision>,
    plan: Option<Plan>,
    rounds: usize,
    #[serde(default)]
    review: Option<ComplianceReview>,
    #[serde(default)]
    followups: Vec<FollowUp>,
}

impl Session {
    /// A new session in [`Phase::Collecting`].
    pub fn new(id: SessionId, goal: impl Into<String>, profile: Profile) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            goal: goal.into(),
            phase: Phase::Collecting,
            profile,
            history: Vec::new(),
            transitions: Vec::new(),
            decision: None,
            plan: None,
            rounds: 0,
            review: None,
            followups: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Compliance review of the decision, once one has been made.
    pub fn review(&self) -> Option<&ComplianceReview> {
        self.review.as_ref()
    }

    pub fn followups(&self) -> &[FollowUp] {
        &self.followups
    }

    /// Number of question rounds emitted so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// The cause, if the session has failed.
    pub fn failure(&self) -> Option<&FailureCause> {
        match &self.phase {
            Phase::Failed { cause } => Some(cause),
            _ => None,
        }
    }

    /// Move to a new phase. Returns `false`, leaving the session unchanged, if the session is
    /// already terminal.
    pub fn transition_to(&mut self, next: Phase) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        let from = std::mem::replace(&mut self.phase, next.clone());
        tracing::info!(session_id = %self.id, %from, to = %next, "session phase transition");
        self.transitions.push(Transition {
            at: Utc::now(),
            from,
            to: next,
        });
        true
    }

    /// Record a question round.
    pub fn record_questions(&mut self, questions: Vec<Question>) {
        self.rounds += 1;
        self.history.push(HistoryEntry::Asked {
            at: Utc::now(),
            questions,
        });
    }

    /// Merge an answer into the profile and log it. Last write wins per field.
    pub fn record_answer(&mut self, answer: Answer) {
        self.profile.apply(&answer);
        self.history.push(HistoryEntry::Answered {
            at: Utc::now(),
            answer,
        });
    }

    pub fn record_decision(&mut self, decision: Decision) {
        self.decision = Some(decision);
    }

    pub fn record_review(&mut self, review: ComplianceReview) {
        self.review = Some(review);
    }

    pub fn record_followups(&mut self, followups: Vec<FollowUp>) {
        self.followups = followups;
    }

    /// Attach the plan and complete. A session holds at most one plan.
    pub fn complete(&mut self, plan: Plan) -> bool {
        if self.plan.is_some() || !self.transition_to(Phase::Complete) {
            return false;
        }
        self.plan = Some(plan);
        true
    }

    pub fn fail(&mut self, cause: FailureCause) -> bool {
        self.transition_to(Phase::Failed { cause })
    }

    /// Questions from the most recent round, if any.
    pub fn last_questions(&self) -> Option<&[Question]> {
        self.history.iter().rev().find_map(|entry| match entry {
            HistoryEntry::Asked { questions, .. } => Some(questions.as_slice()),
            HistoryEntry::Answered { .. } => None,
        })
    }
}
