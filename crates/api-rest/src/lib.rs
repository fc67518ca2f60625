//! # API REST
//!
//! REST API implementation for the care-plan service.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON serialisation, CORS, status codes)
//!
//! Uses `api-shared` for wire types and `careplan-core` for the session orchestrator.

#![warn(rust_2018_idioms)]

use api_shared::{
    phase_failure, AbortRes, ErrorRes, FailureDto, FollowUpDto, HealthRes, HealthService,
    HistoryItemDto, HospitalRecommendation, ManualReviewDto, PlanDocument, QuestionDto,
    SessionRes, StartSessionReq, StartSessionRes, SubmitAnswerReq, SubmitAnswerRes,
    TreatmentPlan,
};
use axum::{
    extract::{Path as AxumPath, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use careplan_core::{Answer, CarePlanError, ProfileField, SessionId, SessionOrchestrator};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SessionOrchestrator>,
}

#[derive(OpenApi)]
#[openapi(
    paths(health, start_session, submit_answer, get_plan, get_session, abort_session),
    components(schemas(
        HealthRes,
        StartSessionReq,
        StartSessionRes,
        QuestionDto,
        SubmitAnswerReq,
        SubmitAnswerRes,
        PlanDocument,
        TreatmentPlan,
        HospitalRecommendation,
        FailureDto,
        SessionRes,
        HistoryItemDto,
        ManualReviewDto,
        FollowUpDto,
        AbortRes,
        ErrorRes,
    ))
)]
pub struct ApiDoc;

/// Error response: status plus a JSON body.
pub type ApiError = (StatusCode, Json<ErrorRes>);

/// Build the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(start_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/answers", post(submit_answer))
        .route("/sessions/:id/plan", get(get_plan))
        .route("/sessions/:id/abort", post(abort_session))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn error_body(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorRes {
            error: error.into(),
            phase: None,
            failure: None,
        }),
    )
}

/// Map a core error onto an HTTP status. Storage and other internal failures are logged and
/// reported without detail.
fn api_error(err: CarePlanError) -> ApiError {
    match err {
        CarePlanError::InvalidInput(msg) => error_body(StatusCode::BAD_REQUEST, msg),
        e @ CarePlanError::SessionNotFound(_) => error_body(StatusCode::NOT_FOUND, e.to_string()),
        e @ (CarePlanError::SessionBusy(_) | CarePlanError::SessionExists(_)) => {
            error_body(StatusCode::CONFLICT, e.to_string())
        }
        CarePlanError::InvalidSessionState { ref phase } | CarePlanError::NotReady { ref phase } => {
            (
                StatusCode::CONFLICT,
                Json(ErrorRes {
                    error: err.to_string(),
                    phase: Some(phase.to_string()),
                    failure: phase_failure(phase),
                }),
            )
        }
        other => {
            tracing::error!("Internal error: {:?}", other);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

fn parse_session_id(id: &str) -> Result<SessionId, ApiError> {
    SessionId::parse(id).map_err(|e| error_body(StatusCode::BAD_REQUEST, e.to_string()))
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint used by monitoring and load balancers.
async fn health() -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/sessions",
    request_body = StartSessionReq,
    responses(
        (status = 201, description = "Session started", body = StartSessionRes),
        (status = 400, description = "Blank or oversized goal", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Start a session for a free-text health goal
///
/// Returns the session id and the first round of questions. A disease recognised in the goal
/// is recorded straight away and not asked about.
#[axum::debug_handler]
async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionReq>,
) -> Result<(StatusCode, Json<StartSessionRes>), ApiError> {
    let start = state
        .orchestrator
        .start_session(&req.goal)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(StartSessionRes::from(&start))))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/answers",
    request_body = SubmitAnswerReq,
    params(("id" = String, Path, description = "Session id (32 lowercase hex)")),
    responses(
        (status = 200, description = "Next questions, the plan, or the failure report", body = SubmitAnswerRes),
        (status = 400, description = "Invalid session id or unknown field", body = ErrorRes),
        (status = 404, description = "Session not found", body = ErrorRes),
        (status = 409, description = "Session busy or no longer collecting answers", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Submit one answer
///
/// # Errors
/// Returns `409 Conflict` if another answer for the same session is still being processed, or
/// if the session has already completed or failed.
#[axum::debug_handler]
async fn submit_answer(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<SubmitAnswerReq>,
) -> Result<Json<SubmitAnswerRes>, ApiError> {
    let id = parse_session_id(&id)?;
    let field: ProfileField = req.field.parse().map_err(api_error)?;

    let outcome = state
        .orchestrator
        .submit_answer(&id, Answer::new(field, req.value))
        .await
        .map_err(api_error)?;
    Ok(Json(SubmitAnswerRes::from(&outcome)))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}/plan",
    params(("id" = String, Path, description = "Session id (32 lowercase hex)")),
    responses(
        (status = 200, description = "Final plan document", body = PlanDocument),
        (status = 404, description = "Session not found", body = ErrorRes),
        (status = 409, description = "Plan not ready; carries the phase and any failure", body = ErrorRes)
    )
)]
/// Fetch the plan of a completed session.
#[axum::debug_handler]
async fn get_plan(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<PlanDocument>, ApiError> {
    let id = parse_session_id(&id)?;
    let plan = state.orchestrator.get_plan(&id).await.map_err(api_error)?;
    Ok(Json(PlanDocument::from(&plan)))
}

#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(("id" = String, Path, description = "Session id (32 lowercase hex)")),
    responses(
        (status = 200, description = "Session snapshot", body = SessionRes),
        (status = 404, description = "Session not found", body = ErrorRes)
    )
)]
/// Session snapshot: phase, collected profile and question/answer history.
#[axum::debug_handler]
async fn get_session(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<SessionRes>, ApiError> {
    let id = parse_session_id(&id)?;
    let session = state.orchestrator.snapshot(&id).await.map_err(api_error)?;
    Ok(Json(SessionRes::from(&session)))
}

#[utoipa::path(
    post,
    path = "/sessions/{id}/abort",
    params(("id" = String, Path, description = "Session id (32 lowercase hex)")),
    responses(
        (status = 200, description = "Session aborted", body = AbortRes),
        (status = 404, description = "Session not found", body = ErrorRes),
        (status = 409, description = "Session already ended", body = ErrorRes)
    )
)]
/// Abort a session, cancelling any in-flight upstream call.
#[axum::debug_handler]
async fn abort_session(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<AbortRes>, ApiError> {
    let id = parse_session_id(&id)?;
    let phase = state.orchestrator.abort(&id).await.map_err(api_error)?;
    Ok(Json(AbortRes {
        session_id: id.to_string(),
        phase: phase.to_string(),
        failure: phase_failure(&phase),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use careplan_core::{
        Collaborators, CoreConfig, Decision, GuidelineKnowledgeBase, InMemorySessionStore,
        Profile, RankedFacility, RankingClient, RankingContext, ReasoningClient, UpstreamError,
    };
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    struct FixedReasoning {
        fail: bool,
    }

    #[async_trait]
    impl ReasoningClient for FixedReasoning {
        async fn decide(&self, _profile: &Profile) -> Result<Decision, UpstreamError> {
            if self.fail {
                return Err(UpstreamError::Connection("connection refused".into()));
            }
            Ok(Decision {
                disease_type: "Breast Cancer".into(),
                treatment_type: "Chemotherapy + Surgery".into(),
                timeline: "6 months".into(),
                notes: "Stage II, surgery allowed".into(),
            })
        }
    }

    struct FixedRanking;

    #[async_trait]
    impl RankingClient for FixedRanking {
        async fn rank(
            &self,
            _context: &RankingContext,
        ) -> Result<Vec<RankedFacility>, UpstreamError> {
            Ok(vec![RankedFacility {
                name: "Apollo Cancer Centre".into(),
                location: "Mumbai".into(),
                facility_type: "Oncology".into(),
                priority_rank: 1,
            }])
        }
    }

    fn app(reasoning_fails: bool) -> Router {
        let config = CoreConfig::new(
            "unused".into(),
            Duration::from_secs(5),
            Duration::ZERO,
            12,
        )
        .unwrap();
        let orchestrator = SessionOrchestrator::new(
            &config,
            Collaborators {
                store: Arc::new(InMemorySessionStore::new()),
                knowledge: Arc::new(GuidelineKnowledgeBase::builtin()),
                reasoning: Arc::new(FixedReasoning {
                    fail: reasoning_fails,
                }),
                ranking: Arc::new(FixedRanking),
            },
        );
        router(AppState {
            orchestrator: Arc::new(orchestrator),
        })
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn start(app: &Router) -> String {
        let (status, body) = call(
            app,
            Method::POST,
            "/sessions",
            Some(json!({"goal": "manage newly diagnosed breast cancer"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["session_id"].as_str().unwrap().to_string()
    }

    async fn answer(app: &Router, id: &str, field: &str, value: &str) -> (StatusCode, Value) {
        call(
            app,
            Method::POST,
            &format!("/sessions/{id}/answers"),
            Some(json!({"field": field, "value": value})),
        )
        .await
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (status, body) = call(&app(false), Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn full_dialogue_returns_plan() {
        let app = app(false);
        let id = start(&app).await;

        let (status, body) = answer(&app, &id, "stage", "II").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "needs_more_data");
        assert_eq!(body["questions"][0]["field"], "surgery_allowed");
        assert_eq!(body["questions"][0]["answer_kind"], "single_choice");

        answer(&app, &id, "priorTreatment", "none").await;
        let (status, body) = answer(&app, &id, "surgeryAllowed", "yes").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");

        let (status, plan) = call(&app, Method::GET, &format!("/sessions/{id}/plan"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(plan, body["plan"]);
        assert_eq!(
            plan["treatment_plan"],
            json!({
                "disease_type": "Breast Cancer",
                "treatment_type": "Chemotherapy + Surgery",
                "timeline": "6 months",
                "notes": "Stage II, surgery allowed"
            })
        );
        assert_eq!(
            plan["recommended_hospitals"],
            json!([{"name": "Apollo Cancer Centre", "location": "Mumbai", "type": "Oncology", "priority_rank": 1}])
        );
        assert_eq!(
            plan["disclaimer"],
            "This is not a medical diagnosis. Consult a licensed medical professional before making any healthcare decisions."
        );

        let (status, session) = call(&app, Method::GET, &format!("/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["phase"], "complete");
        assert_eq!(session["profile"]["prior_treatment"], "none");

        let (status, body) = answer(&app, &id, "age", "40").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["phase"], "complete");
    }

    #[tokio::test]
    async fn plan_is_not_ready_while_collecting() {
        let app = app(false);
        let id = start(&app).await;

        let (status, body) = call(&app, Method::GET, &format!("/sessions/{id}/plan"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["phase"], "collecting");
    }

    #[tokio::test]
    async fn upstream_failure_is_reported_with_disclaimer() {
        let app = app(true);
        let id = start(&app).await;

        answer(&app, &id, "stage", "I").await;
        let (status, body) = answer(&app, &id, "surgery_allowed", "no").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "failed");
        assert_eq!(body["failure"]["cause"], "upstream_transient_failure");
        assert!(body["failure"]["disclaimer"]
            .as_str()
            .unwrap()
            .starts_with("This is not a medical diagnosis."));

        let (status, body) = call(&app, Method::GET, &format!("/sessions/{id}/plan"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["phase"], "failed");
        assert_eq!(body["failure"]["cause"], "upstream_transient_failure");
    }

    #[tokio::test]
    async fn abort_then_abort_again_conflicts() {
        let app = app(false);
        let id = start(&app).await;

        let (status, body) = call(&app, Method::POST, &format!("/sessions/{id}/abort"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "failed");
        assert_eq!(body["failure"]["cause"], "aborted");

        let (status, _) = call(&app, Method::POST, &format!("/sessions/{id}/abort"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn bad_requests_are_rejected() {
        let app = app(false);
        let id = start(&app).await;

        let (status, _) = answer(&app, "not-a-session", "stage", "II").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = answer(&app, &id, "blood_type", "O+").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("blood_type"));

        let unknown = SessionId::new().to_string();
        let (status, _) = call(&app, Method::GET, &format!("/sessions/{unknown}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = call(&app, Method::POST, "/sessions", Some(json!({"goal": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let (status, body) = call(&app(false), Method::GET, "/api-docs/openapi.json", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/sessions/{id}/answers"].is_object());
    }
}
