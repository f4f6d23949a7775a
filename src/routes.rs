use crate::error::ApiError;
use crate::models::modifiers::{STORY_MODIFIERS, StoryModifier};
use crate::models::{ResponseTimeRecord, StoryParams, StorySegment, now_rfc3339};
use crate::services::dictionary::{LookupOutcome, WordLookup};
use crate::services::jobs::JobStatus;
use crate::services::response_time::ResponseTimeStore;
use crate::services::session::{ChoiceSelection, SessionSnapshot};
use crate::services::story::{GenerationTicket, StoryService};
use crate::services::story_parser::parse_story_response;
use crate::services::tokenizer::{Token, render_tokens};
use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub story: Arc<StoryService>,
    pub lookup: Arc<WordLookup>,
    pub response_times: Arc<dyn ResponseTimeStore>,
}

pub fn router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let api = Router::new()
        .route("/health", get(health_check))
        .route("/modifiers", get(list_modifiers))
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/continue", post(continue_session))
        .route("/sessions/:id/lookup", post(session_lookup))
        .route("/jobs/:id", get(job_status))
        .route("/parse", post(parse_completion))
        .route("/tokenize", post(tokenize_text))
        .route("/translate", get(translate_word))
        .route(
            "/response-times",
            get(get_response_times).post(update_response_times),
        )
        .route("/response-times/estimate", get(current_estimate));

    let mut app = Router::new().route("/", get(index)).nest("/api", api);

    if let Some(dir) = static_dir {
        tracing::info!("Serving static files from {}", dir.display());
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::AllowMethods::any())
                .allow_headers(tower_http::cors::AllowHeaders::any()),
        )
}

async fn index() -> Html<&'static str> {
    Html(
        r#"
    <!DOCTYPE html>
    <html>
    <head>
        <title>ThaiTale Story Service</title>
        <meta charset="utf-8">
        <style>
            body { font-family: Arial, sans-serif; margin: 40px; }
            .info-box { background-color: #f0f8ff; padding: 20px; border-radius: 8px; margin: 20px 0; }
            .endpoint { background-color: #f5f5f5; padding: 10px; margin: 10px 0; border-radius: 4px; font-family: monospace; }
        </style>
    </head>
    <body>
        <h1>ThaiTale Story Service</h1>

        <div class="info-box">
            <p>Generates choose-your-own-adventure stories in Thai, one word at a time.</p>
        </div>

        <h2>Available Endpoints:</h2>
        <div class="endpoint">GET /api/health</div>
        <div class="endpoint">GET /api/modifiers</div>
        <div class="endpoint">POST /api/sessions - start a story</div>
        <div class="endpoint">GET /api/sessions/:id</div>
        <div class="endpoint">POST /api/sessions/:id/continue - pick a choice</div>
        <div class="endpoint">POST /api/sessions/:id/lookup - look up a clicked word</div>
        <div class="endpoint">GET /api/jobs/:id - poll a generation</div>
        <div class="endpoint">POST /api/parse</div>
        <div class="endpoint">POST /api/tokenize</div>
        <div class="endpoint">GET /api/translate?word=...</div>
        <div class="endpoint">GET|POST /api/response-times</div>
        <div class="endpoint">GET /api/response-times/estimate</div>
    </body>
    </html>
    "#,
    )
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_modifiers() -> Json<&'static [StoryModifier]> {
    Json(STORY_MODIFIERS)
}

#[derive(Deserialize)]
struct CreateSessionRequest {
    params: StoryParams,
    #[serde(default)]
    modifiers: Vec<String>,
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<GenerationTicket>), ApiError> {
    let ticket = state
        .story
        .start_session(request.params, request.modifiers)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(ticket)))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let handle = state
        .story
        .sessions()
        .get(id)
        .ok_or_else(|| ApiError::not_found("session", id))?;
    let snapshot = handle.state.lock().await.snapshot();
    Ok(Json(snapshot))
}

async fn continue_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(selection): Json<ChoiceSelection>,
) -> Result<(StatusCode, Json<GenerationTicket>), ApiError> {
    let ticket = state.story.continue_session(id, &selection).await?;
    Ok((StatusCode::ACCEPTED, Json(ticket)))
}

#[derive(Deserialize)]
struct LookupRequest {
    word: String,
}

async fn session_lookup(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<LookupRequest>,
) -> Result<Json<Value>, ApiError> {
    let handle = state
        .story
        .sessions()
        .get(id)
        .ok_or_else(|| ApiError::not_found("session", id))?;

    let ticket = handle.lookups.begin();
    let outcome = state.lookup.lookup(&request.word).await;

    if !handle.lookups.is_current(ticket) {
        tracing::debug!("Dropping superseded lookup for '{}'", request.word);
        return Ok(Json(json!({ "stale": true })));
    }
    Ok(Json(json!({ "stale": false, "result": outcome })))
}

async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<JobStatus>, ApiError> {
    state
        .story
        .jobs()
        .status(id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("job", id))
}

#[derive(Deserialize)]
struct ParseRequest {
    raw: String,
}

async fn parse_completion(Json(request): Json<ParseRequest>) -> Json<StorySegment> {
    Json(parse_story_response(&request.raw))
}

#[derive(Deserialize)]
struct TokenizeRequest {
    text: String,
    #[serde(default = "default_spaced")]
    spaced: bool,
}

fn default_spaced() -> bool {
    true
}

#[derive(Serialize)]
struct TokenView {
    #[serde(flatten)]
    token: Token,
    lookup_key: String,
}

async fn tokenize_text(Json(request): Json<TokenizeRequest>) -> Json<Vec<TokenView>> {
    let tokens = render_tokens(&request.text, request.spaced)
        .into_iter()
        .map(|token| TokenView {
            lookup_key: token.lookup_key(),
            token,
        })
        .collect();
    Json(tokens)
}

#[derive(Deserialize)]
struct TranslateQuery {
    word: Option<String>,
}

async fn translate_word(
    State(state): State<AppState>,
    Query(query): Query<TranslateQuery>,
) -> Result<Json<Value>, ApiError> {
    let word = query
        .word
        .filter(|w| !w.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Word parameter is required".to_string()))?;

    let outcome = state.lookup.lookup(&word).await;
    let (translations, transliteration) = match &outcome {
        LookupOutcome::Translations {
            records,
            transliteration,
            ..
        } => (records.clone(), transliteration.clone()),
        _ => (Vec::new(), None),
    };

    Ok(Json(json!({
        "success": true,
        "word": word,
        "result": outcome,
        "translations": translations,
        "transliteration": transliteration,
    })))
}

async fn get_response_times(
    State(state): State<AppState>,
) -> Result<Json<ResponseTimeRecord>, ApiError> {
    Ok(Json(state.response_times.load().await?))
}

async fn update_response_times(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<ResponseTimeRecord>, ApiError> {
    let invalid = || ApiError::BadRequest("averageTime and samples must be numbers".to_string());

    let average_time = body
        .get("averageTime")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(invalid)?;
    let samples = body
        .get("samples")
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(invalid)?;

    let record = ResponseTimeRecord {
        average_time,
        samples: samples.round() as u64,
        last_updated: now_rfc3339(),
    };
    Ok(Json(state.response_times.save(&record).await?))
}

async fn current_estimate(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "estimated_ms": state.story.estimator().estimate() }))
}
