//! # Care Plan Core
//!
//! Core business logic for the care-plan session service.
//!
//! This crate owns the conversational state machine that turns a free-text health goal into a
//! structured treatment plan:
//! - profile collection with typed answers and last-write-wins merging
//! - declarative validation backed by disease/stage guidelines
//! - question selection for unmet constraints
//! - timeout and bounded retry around the reasoning and ranking services
//! - plan assembly with a fixed disclaimer
//! - clinical compliance review of the decision and follow-up reminders
//! - session persistence as sharded JSON snapshots
//!
//! **No API concerns**: HTTP servers, CLI parsing and process bootstrapping belong in `api-rest`,
//! `careplan-cli` or the root binary.

pub mod compliance;
pub mod config;
pub mod constants;
pub mod error;
pub mod followups;
pub mod knowledge;
pub mod orchestrator;
pub mod plan;
pub mod profile;
pub mod questions;
pub mod registry;
pub mod session;
pub mod store;
pub mod upstream;
pub mod validation;

pub use careplan_uuid::SessionId;
pub use compliance::{ComplianceFlag, ComplianceReview};
pub use config::CoreConfig;
pub use error::{CarePlanError, CarePlanResult};
pub use followups::{FollowUp, FollowUpKind};
pub use knowledge::{GuidelineKnowledgeBase, KnowledgeBase};
pub use orchestrator::{Collaborators, SessionOrchestrator, SessionStart, SubmitOutcome};
pub use plan::{FailureReport, Plan, PlanAssembler};
pub use profile::{Answer, FieldValue, Profile, ProfileField};
pub use questions::{AnswerShape, Question, QuestionCatalog};
pub use session::{FailureCause, HistoryEntry, Phase, Session, Transition};
pub use store::{FileSessionStore, InMemorySessionStore, SessionStore};
pub use upstream::http::{HttpRankingClient, HttpReasoningClient};
pub use upstream::{
    CallSite, Decision, RankedFacility, RankingClient, RankingContext, ReasoningClient,
    UpstreamError,
};
pub use validation::{ValidationEngine, ValidationResult, Violation, ViolationKind};
