use std::sync::Arc;

use analysis_exchange::{
    AnalysisError, AnalysisExchange, AnalysisRequest, ChatSession, EncodedImage, ModelClient,
    ReportStore, StoredReportRecord,
};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{
    AnalyzeSymptomsRequest, AnalyzeSymptomsResponse, ChatRequest, ChatResponse,
    ReportHistoryResponse, TranscriptResponse,
};

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "session_id": id
        })),
    )
}

/// Convert a core failure into the single user-facing category it belongs
/// to. The full taxonomy stays visible in logs only.
fn map_analysis_error(err: AnalysisError) -> ApiError {
    match &err {
        AnalysisError::Input(message) => bad_request_error(message),
        AnalysisError::Configuration(_) => {
            error!(error = %err, "deployment defect: missing configuration");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.user_message() })),
            )
        }
        AnalysisError::SessionBusy => {
            (StatusCode::CONFLICT, Json(json!({ "error": err.user_message() })))
        }
        AnalysisError::Validation { .. } => {
            warn!(error = %err, "model response rejected");
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": err.user_message() })))
        }
        _ => {
            warn!(error = %err, "model service failure");
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": err.user_message() })))
        }
    }
}

type SharedSession = Arc<Mutex<ChatSession>>;

#[derive(Clone)]
pub struct AppState {
    pub exchange: AnalysisExchange,
    pub store: Arc<dyn ReportStore>,
    sessions: Arc<DashMap<String, SharedSession>>,
}

impl AppState {
    pub fn new(model: Arc<dyn ModelClient>, store: Arc<dyn ReportStore>) -> Self {
        Self {
            exchange: AnalysisExchange::new(model),
            store,
            sessions: Arc::new(DashMap::new()),
        }
    }
}

pub fn create_app(model: Arc<dyn ModelClient>, store: Arc<dyn ReportStore>) -> Router {
    build_router(AppState::new(model, store))
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/analysis", post(analyze))
        .route("/reports/{owner_id}", get(report_history))
        .route("/chat", post(chat))
        .route("/chat/{session_id}", get(transcript).delete(delete_session))
        .route("/chat/{session_id}/context", delete(clear_context))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Symptom Advisor Service",
        "version": "1.0.0",
        "description": "AI symptom analysis with structured reports and follow-up chat",
        "endpoints": {
            "POST /analysis": "Analyze symptoms and return a structured report",
            "GET /reports/{owner_id}": "Recent stored reports, newest first",
            "POST /chat": "Send a follow-up message (creates a session on first use)",
            "GET /chat/{session_id}": "Fetch the session transcript",
            "DELETE /chat/{session_id}/context": "Clear the session's prior-report context",
            "DELETE /chat/{session_id}": "Drop the session",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeSymptomsRequest>,
) -> ApiResult<AnalyzeSymptomsResponse> {
    let analysis_request = build_analysis_request(&request)?;

    let report = state
        .exchange
        .analyze(&analysis_request)
        .await
        .map_err(map_analysis_error)?;

    // Fire-and-forget persistence: the analysis already succeeded, a store
    // failure is logged and never shown to the user.
    if let Some(owner_id) = &request.owner_id {
        let record = StoredReportRecord::new(owner_id.clone(), &analysis_request, report.clone());
        let store = state.store.clone();
        tokio::spawn(async move {
            if let Err(e) = store.create(record).await {
                error!(error = %e, "failed to persist analysis report");
            }
        });
    }

    Ok(Json(AnalyzeSymptomsResponse { report }))
}

fn build_analysis_request(request: &AnalyzeSymptomsRequest) -> Result<AnalysisRequest, ApiError> {
    let parse_image = |uri: &Option<String>| -> Result<Option<EncodedImage>, ApiError> {
        uri.as_deref()
            .map(EncodedImage::from_data_uri)
            .transpose()
            .map_err(map_analysis_error)
    };

    Ok(AnalysisRequest {
        symptoms: request.symptoms.clone(),
        affected_area_image: parse_image(&request.affected_area_image)?,
        seen_doctor: request.seen_doctor,
        doctor_report_image: parse_image(&request.doctor_report_image)?,
    })
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

async fn report_history(
    State(state): State<AppState>,
    Path(owner_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<ReportHistoryResponse> {
    let limit = params.limit.unwrap_or(10);
    let reports = state
        .store
        .recent_for_owner(&owner_id, limit)
        .await
        .map_err(|e| {
            error!(error = %e, owner_id = %owner_id, "failed to load report history");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Failed to load report history" })),
            )
        })?;

    Ok(Json(ReportHistoryResponse { owner_id, reports }))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    let (session_id, session) = match &request.session_id {
        Some(id) => {
            let session = state
                .sessions
                .get(id)
                .map(|entry| entry.value().clone())
                .ok_or_else(|| not_found_error("Chat session not found", id))?;
            (id.clone(), session)
        }
        None => {
            let id = Uuid::new_v4().to_string();
            let session = match &request.report_context {
                Some(report) => ChatSession::with_report(report),
                None => ChatSession::new(),
            };
            let session = Arc::new(Mutex::new(session));
            state.sessions.insert(id.clone(), session.clone());
            info!(session_id = %id, seeded = request.report_context.is_some(), "chat session created");
            (id, session)
        }
    };

    // The lock is held only across state transitions, never across the
    // model call, so a concurrent submission is rejected rather than queued.
    let payload = session
        .lock()
        .await
        .begin_turn(&request.message)
        .map_err(map_analysis_error)?;

    let outcome = state.exchange.follow_up(&payload).await;

    let reply = session.lock().await.complete_turn(outcome).content.clone();
    Ok(Json(ChatResponse { session_id, reply }))
}

async fn transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<TranscriptResponse> {
    let session = state
        .sessions
        .get(&session_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| not_found_error("Chat session not found", &session_id))?;

    let session = session.lock().await;
    Ok(Json(TranscriptResponse {
        session_id,
        context_attached: session.has_context(),
        turns: session.transcript().to_vec(),
    }))
}

async fn clear_context(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    let session = state
        .sessions
        .get(&session_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| not_found_error("Chat session not found", &session_id))?;

    session.lock().await.clear_context();
    info!(session_id = %session_id, "prior-report context cleared");
    Ok(Json(json!({ "session_id": session_id, "context_attached": false })))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    state
        .sessions
        .remove(&session_id)
        .ok_or_else(|| not_found_error("Chat session not found", &session_id))?;
    Ok(Json(json!({ "session_id": session_id, "deleted": true })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_exchange::{GENERIC_FAILURE_MESSAGE, InMemoryReportStore, PromptPayload};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    struct ScriptedModel {
        structured: analysis_exchange::Result<Value>,
        reply: analysis_exchange::Result<String>,
    }

    impl ScriptedModel {
        fn healthy() -> Self {
            Self {
                structured: Ok(valid_candidate()),
                reply: Ok("Plenty of rest should help.".to_string()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn structured_completion(
            &self,
            _payload: &PromptPayload,
            _schema: &Value,
        ) -> analysis_exchange::Result<Value> {
            clone_outcome(&self.structured)
        }

        async fn text_completion(
            &self,
            _payload: &PromptPayload,
        ) -> analysis_exchange::Result<String> {
            clone_outcome(&self.reply)
        }
    }

    fn clone_outcome<T: Clone>(
        outcome: &analysis_exchange::Result<T>,
    ) -> analysis_exchange::Result<T> {
        match outcome {
            Ok(v) => Ok(v.clone()),
            Err(e) => Err(AnalysisError::ServiceUnavailable(e.to_string())),
        }
    }

    fn valid_candidate() -> Value {
        json!({
            "diseaseInfo": { "name": "Common cold", "localName": "Cold", "description": "Viral infection." },
            "whatToDoNow": { "immediateSteps": ["Rest"], "emergencyAdvice": "See a doctor if it worsens." },
            "recommendedMedicine": [],
            "foodAndNutrition": {
                "foodsToInclude": [], "hydrationTips": ["Warm fluids"],
                "foodsToAvoid": [], "lifestyleGuidelines": []
            },
            "whatNotToDo": [],
            "recoveryEstimate": "About a week",
            "additionalInfo": ""
        })
    }

    fn app_with(model: ScriptedModel) -> (Router, Arc<InMemoryReportStore>) {
        let store = Arc::new(InMemoryReportStore::new());
        let app = create_app(Arc::new(model), store.clone());
        (app, store)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check_is_up() {
        let (app, _) = app_with(ScriptedModel::healthy());
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn empty_symptoms_are_a_bad_request() {
        let (app, _) = app_with(ScriptedModel::healthy());
        let response = app
            .oneshot(post_json("/analysis", json!({ "symptoms": "  " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Please describe your symptoms.");
    }

    #[tokio::test]
    async fn successful_analysis_returns_report_and_persists_for_owner() {
        let (app, store) = app_with(ScriptedModel::healthy());
        let response = app
            .oneshot(post_json(
                "/analysis",
                json!({ "symptoms": "dry cough, mild fever", "ownerId": "user-1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["report"]["diseaseInfo"]["name"], "Common cold");

        // persistence is fire-and-forget; give the spawned write a moment
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let history = store.recent_for_owner("user-1", 10).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].symptoms_text, "dry cough, mild fever");
    }

    #[tokio::test]
    async fn model_outage_is_a_generic_bad_gateway() {
        let model = ScriptedModel {
            structured: Err(AnalysisError::ServiceUnavailable("refused".into())),
            reply: Ok(String::new()),
        };
        let (app, _) = app_with(model);
        let response = app
            .oneshot(post_json("/analysis", json!({ "symptoms": "dry cough" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"], GENERIC_FAILURE_MESSAGE);
    }

    #[tokio::test]
    async fn chat_creates_session_and_replies() {
        let (app, _) = app_with(ScriptedModel::healthy());
        let response = app
            .clone()
            .oneshot(post_json("/chat", json!({ "message": "is it contagious?" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let session_id = body["sessionId"].as_str().unwrap().to_string();
        assert_eq!(body["reply"], "Plenty of rest should help.");

        let response = app
            .oneshot(
                Request::get(format!("/chat/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        // greeting + user turn + assistant reply
        assert_eq!(body["turns"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn chat_failure_substitutes_apology_not_an_error_status() {
        let model = ScriptedModel {
            structured: Ok(valid_candidate()),
            reply: Err(AnalysisError::ServiceUnavailable("refused".into())),
        };
        let (app, _) = app_with(model);
        let response = app
            .oneshot(post_json("/chat", json!({ "message": "hello" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["reply"], analysis_exchange::ASSISTANT_APOLOGY);
    }

    #[tokio::test]
    async fn unknown_chat_session_is_not_found() {
        let (app, _) = app_with(ScriptedModel::healthy());
        let response = app
            .oneshot(post_json(
                "/chat",
                json!({ "sessionId": "nope", "message": "hello" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
