//! The per-session state machine.
//!
//! [`SessionOrchestrator`] drives the question/validation loop until the profile is complete,
//! then sequences the reasoning call, the ranking call and plan assembly. Session state is
//! persisted after every phase change, and a change becomes live only once it is persisted.
//!
//! Concurrency rules:
//! - one in-flight submission per session; a second concurrent submission fails with
//!   `SessionBusy`,
//! - the session lock is never held across an upstream call,
//! - after each upstream call the phase is re-checked, so a result arriving after an abort is
//!   discarded.

use crate::compliance;
use crate::config::{CoreConfig, ENV_RANKING_URL, ENV_REASONING_URL};
use crate::followups;
use crate::knowledge::{GuidelineKnowledgeBase, KnowledgeBase};
use crate::plan::{FailureReport, Plan, PlanAssembler};
use crate::profile::{Answer, FieldValue, Profile, ProfileField};
use crate::questions::{Question, QuestionCatalog};
use crate::registry::{Eviction, SessionHandle, SessionRegistry};
use crate::session::{FailureCause, Phase, Session};
use crate::store::{FileSessionStore, SessionStore};
use crate::upstream::http::{HttpRankingClient, HttpReasoningClient};
use crate::upstream::retry::RetryPolicy;
use crate::upstream::{CallSite, RankingClient, ReasoningClient};
use crate::validation::ValidationEngine;
use crate::{CarePlanError, CarePlanResult};
use careplan_types::{check_len, NonEmptyText};
use careplan_uuid::SessionId;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// External collaborators the orchestrator sequences.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn SessionStore>,
    pub knowledge: Arc<dyn KnowledgeBase>,
    pub reasoning: Arc<dyn ReasoningClient>,
    pub ranking: Arc<dyn RankingClient>,
}

impl Collaborators {
    /// Production collaborators resolved from configuration: the sharded file store, the
    /// guideline knowledge base (built in, or loaded from the configured YAML file) and HTTP
    /// clients for the configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns `CarePlanError::InvalidInput` if either upstream URL is missing, and knowledge or
    /// HTTP client errors if those cannot be set up.
    pub fn from_config(config: &CoreConfig) -> CarePlanResult<Self> {
        let reasoning_url = config.reasoning_url().ok_or_else(|| {
            CarePlanError::InvalidInput(format!("{ENV_REASONING_URL} must be set"))
        })?;
        let ranking_url = config.ranking_url().ok_or_else(|| {
            CarePlanError::InvalidInput(format!("{ENV_RANKING_URL} must be set"))
        })?;

        let knowledge: Arc<dyn KnowledgeBase> = match config.knowledge_file() {
            Some(path) => Arc::new(GuidelineKnowledgeBase::from_yaml_file(path)?),
            None => Arc::new(GuidelineKnowledgeBase::builtin()),
        };

        Ok(Self {
            store: Arc::new(FileSessionStore::new(config.sessions_dir())),
            knowledge,
            reasoning: Arc::new(HttpReasoningClient::new(
                reasoning_url,
                config.upstream_timeout(),
            )?),
            ranking: Arc::new(HttpRankingClient::new(
                ranking_url,
                config.upstream_timeout(),
            )?),
        })
    }
}

/// Result of starting a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStart {
    pub session_id: SessionId,
    pub questions: Vec<Question>,
}

/// Result of submitting one answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmitOutcome {
    NeedsMoreData { questions: Vec<Question> },
    Completed { plan: Plan },
    Failed { failure: FailureReport },
}

pub struct SessionOrchestrator {
    registry: SessionRegistry,
    store: Arc<dyn SessionStore>,
    knowledge: Arc<dyn KnowledgeBase>,
    reasoning: Arc<dyn ReasoningClient>,
    ranking: Arc<dyn RankingClient>,
    validator: ValidationEngine,
    catalog: QuestionCatalog,
    assembler: PlanAssembler,
    retry: RetryPolicy,
    max_rounds: usize,
}

impl SessionOrchestrator {
    pub fn new(config: &CoreConfig, collaborators: Collaborators) -> Self {
        Self {
            registry: SessionRegistry::new(),
            validator: ValidationEngine::new(collaborators.knowledge.clone()),
            store: collaborators.store,
            knowledge: collaborators.knowledge,
            reasoning: collaborators.reasoning,
            ranking: collaborators.ranking,
            catalog: QuestionCatalog,
            assembler: PlanAssembler,
            retry: RetryPolicy::from_config(config),
            max_rounds: config.max_rounds(),
        }
    }

    /// Open a session for a free-text goal and return the first question round.
    ///
    /// A disease recognised in the goal pre-fills `disease_type`.
    ///
    /// # Errors
    ///
    /// Returns `CarePlanError::InvalidInput` for a blank or oversized goal, or a storage error if
    /// the new session cannot be persisted.
    pub async fn start_session(&self, goal: &str) -> CarePlanResult<SessionStart> {
        let goal = NonEmptyText::new(goal)
            .map_err(|e| CarePlanError::InvalidInput(format!("goal: {e}")))?;

        let mut profile = Profile::new();
        let disease = self.knowledge.match_disease(goal.as_str());
        if let Some(disease) = &disease {
            profile.set(ProfileField::DiseaseType, FieldValue::Text(disease.clone()));
        }

        let mut session = Session::new(SessionId::new(), goal.into_inner(), profile);
        let result = self.validator.check(session.profile());
        let questions = self.catalog.next_questions(&result);
        session.record_questions(questions.clone());

        self.store.create(&session).await?;
        let session_id = session.id();
        self.registry.get_or_insert(session).await;

        tracing::info!(%session_id, disease = ?disease, "session started");
        Ok(SessionStart {
            session_id,
            questions,
        })
    }

    /// Merge one answer and advance the session as far as it can go.
    ///
    /// Missing or invalid fields are not errors: they yield the next questions. Upstream
    /// failures end the session and are reported as [`SubmitOutcome::Failed`].
    ///
    /// Every step is applied to a copy that replaces the live session only once it is stored.
    /// A storage failure before the upstream calls leaves the session collecting without the
    /// answer; one after them ends the session with `StorageFailure`.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the id is unknown,
    /// - `InvalidInput` if the answer is longer than `MAX_TEXT_CHARS`,
    /// - `SessionBusy` if another answer for the session is being processed,
    /// - `InvalidSessionState` if the session is not collecting answers,
    /// - storage errors from persisting the answer.
    pub async fn submit_answer(
        &self,
        id: &SessionId,
        answer: Answer,
    ) -> CarePlanResult<SubmitOutcome> {
        check_len(&answer.value)
            .map_err(|e| CarePlanError::InvalidInput(format!("answer: {e}")))?;

        let handle = self.handle(id).await?;
        let Some(_in_flight) = handle.try_begin() else {
            tracing::warn!(session_id = %id, "rejected concurrent submission");
            return Err(CarePlanError::SessionBusy(*id));
        };

        let profile = {
            let mut session = handle.lock().await;
            if *session.phase() != Phase::Collecting {
                return Err(CarePlanError::InvalidSessionState {
                    phase: session.phase().clone(),
                });
            }

            let mut next = session.clone();
            next.record_answer(answer);
            next.transition_to(Phase::Validating);
            let result = self.validator.check(next.profile());

            if !result.is_valid() {
                if next.rounds() >= self.max_rounds {
                    let cause = FailureCause::RoundLimitExceeded {
                        rounds: next.rounds(),
                    };
                    next.fail(cause.clone());
                    self.commit(&mut session, next).await?;
                    tracing::error!(session_id = %id, %cause, "session failed");
                    return Ok(SubmitOutcome::Failed {
                        failure: FailureReport::new(cause),
                    });
                }

                let questions = self.catalog.next_questions(&result);
                next.record_questions(questions.clone());
                next.transition_to(Phase::Collecting);
                self.commit(&mut session, next).await?;
                return Ok(SubmitOutcome::NeedsMoreData { questions });
            }

            next.transition_to(Phase::Reasoning);
            self.commit(&mut session, next).await?;
            session.profile().clone()
        };

        let decision = match self
            .retry
            .run(CallSite::Reasoning, handle.cancel_token(), || {
                self.reasoning.decide(&profile)
            })
            .await
        {
            Ok(decision) => decision,
            Err(cause) => return Ok(self.fail(&handle, cause).await),
        };

        let context = {
            let mut session = handle.lock().await;
            if let Some(outcome) = terminal_outcome(&session) {
                return Ok(outcome);
            }

            let review = compliance::review(session.profile(), &decision);
            if let Some(notice) = review.notice() {
                tracing::warn!(session_id = %id, flags = review.flags.len(), "{notice}");
            }

            let mut next = session.clone();
            next.record_decision(decision.clone());
            next.record_review(review);
            next.transition_to(Phase::Ranking);
            if let Err(e) = self.commit(&mut session, next).await {
                return Ok(self.fail_on_storage(&mut session, e).await);
            }
            decision.ranking_context()
        };

        let facilities = match self
            .retry
            .run(CallSite::Ranking, handle.cancel_token(), || {
                self.ranking.rank(&context)
            })
            .await
        {
            Ok(facilities) => facilities,
            Err(cause) => return Ok(self.fail(&handle, cause).await),
        };

        let mut session = handle.lock().await;
        if let Some(outcome) = terminal_outcome(&session) {
            return Ok(outcome);
        }
        let mut next = session.clone();
        next.transition_to(Phase::Assembling);
        next.record_followups(followups::schedule(&decision, Utc::now()));
        let plan = self
            .assembler
            .assemble(next.profile(), decision, facilities);
        next.complete(plan.clone());
        if let Err(e) = self.commit(&mut session, next).await {
            return Ok(self.fail_on_storage(&mut session, e).await);
        }

        tracing::info!(
            session_id = %id,
            hospitals = plan.recommended_hospitals().len(),
            "plan assembled"
        );
        Ok(SubmitOutcome::Completed { plan })
    }

    /// The plan of a completed session.
    ///
    /// # Errors
    ///
    /// Returns `NotReady` carrying the current phase unless the session is complete.
    pub async fn get_plan(&self, id: &SessionId) -> CarePlanResult<Plan> {
        let handle = self.handle(id).await?;
        let session = handle.lock().await;
        match (session.phase(), session.plan()) {
            (Phase::Complete, Some(plan)) => Ok(plan.clone()),
            (phase, _) => Err(CarePlanError::NotReady {
                phase: phase.clone(),
            }),
        }
    }

    /// A copy of the full session state.
    pub async fn snapshot(&self, id: &SessionId) -> CarePlanResult<Session> {
        let handle = self.handle(id).await?;
        let session = handle.lock().await;
        Ok(session.clone())
    }

    /// Move a non-terminal session straight to `Failed { Aborted }`, cancelling any in-flight
    /// upstream call. Returns the resulting phase.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSessionState` if the session has already ended, or a storage error if the
    /// aborted state cannot be saved, in which case the session is left running.
    pub async fn abort(&self, id: &SessionId) -> CarePlanResult<Phase> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        let mut next = session.clone();
        if !next.fail(FailureCause::Aborted) {
            return Err(CarePlanError::InvalidSessionState {
                phase: session.phase().clone(),
            });
        }
        self.commit(&mut session, next).await?;
        handle.cancel();
        tracing::info!(session_id = %id, "session aborted");
        Ok(session.phase().clone())
    }

    /// Drop a session from the live registry. Its stored snapshot is kept and is reloaded on
    /// next access. Returns `false` if the session was not registered.
    ///
    /// # Errors
    ///
    /// Returns `SessionBusy` while an answer for the session is being processed.
    pub async fn evict(&self, id: &SessionId) -> CarePlanResult<bool> {
        match self.registry.evict(id).await {
            Eviction::Evicted => {
                tracing::debug!(session_id = %id, "session evicted");
                Ok(true)
            }
            Eviction::Absent => Ok(false),
            Eviction::Busy => Err(CarePlanError::SessionBusy(*id)),
        }
    }

    /// Live handle for `id`, reloading it from the store if it is not registered.
    async fn handle(&self, id: &SessionId) -> CarePlanResult<Arc<SessionHandle>> {
        if let Some(handle) = self.registry.get(id).await {
            return Ok(handle);
        }
        match self.store.read(id).await? {
            Some(session) => {
                tracing::debug!(session_id = %id, "session restored from store");
                Ok(self.registry.get_or_insert(session).await)
            }
            None => Err(CarePlanError::SessionNotFound(*id)),
        }
    }

    /// Store `next` and only then make it the live session.
    async fn commit(&self, live: &mut Session, next: Session) -> CarePlanResult<()> {
        self.store.update(&next).await?;
        *live = next;
        Ok(())
    }

    /// End the session after an upstream failure. Saving the failed state is best effort.
    async fn fail(&self, handle: &SessionHandle, cause: FailureCause) -> SubmitOutcome {
        let mut session = handle.lock().await;
        if let Some(outcome) = terminal_outcome(&session) {
            return outcome;
        }
        tracing::error!(session_id = %session.id(), %cause, "session failed");
        session.fail(cause.clone());
        self.persist_failure(&session).await;
        SubmitOutcome::Failed {
            failure: FailureReport::new(cause),
        }
    }

    /// End the session because a step after the upstream calls could not be saved.
    async fn fail_on_storage(&self, session: &mut Session, err: CarePlanError) -> SubmitOutcome {
        let cause = FailureCause::StorageFailure {
            detail: err.to_string(),
        };
        tracing::error!(session_id = %session.id(), %cause, "session failed");
        session.fail(cause.clone());
        self.persist_failure(session).await;
        SubmitOutcome::Failed {
            failure: FailureReport::new(cause),
        }
    }

    async fn persist_failure(&self, session: &Session) {
        if let Err(e) = self.store.update(session).await {
            tracing::error!(session_id = %session.id(), error = %e, "failed to save failed session");
        }
    }
}

/// Outcome for a session that reached a terminal phase while an upstream call was in flight.
fn terminal_outcome(session: &Session) -> Option<SubmitOutcome> {
    match session.phase() {
        Phase::Failed { cause } => Some(SubmitOutcome::Failed {
            failure: FailureReport::new(cause.clone()),
        }),
        Phase::Complete => session
            .plan()
            .cloned()
            .map(|plan| SubmitOutcome::Completed { plan }),
        _ => None,
    }
}
