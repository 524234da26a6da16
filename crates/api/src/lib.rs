mod rate_limit;

use std::env;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::{Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use parley_agents::{CannedFallback, ConciergeAgent};
use parley_core::{ChatInput, Language, RuleSet};
use parley_observability::{AppMetrics, MetricsSnapshot};
use parley_rules::load_rules;
use parley_storage::MemoryStore;
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub use crate::rate_limit::ClientRateLimiter;

const MAX_BODY_BYTES: usize = 16 * 1024;
const SESSION_SWEEP_EVERY: Duration = Duration::from_secs(600);

pub type Agent = ConciergeAgent<MemoryStore, CannedFallback>;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
    pub session_ttl: chrono::Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: "dev-parley-key".to_string(),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max: 120,
            session_ttl: chrono::Duration::hours(24),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            api_key: env::var("PARLEY_API_KEY")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.api_key),
            rate_limit_window: env_parse::<u64>("PARLEY_RATE_LIMIT_WINDOW_SECONDS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.rate_limit_window),
            rate_limit_max: env_parse::<usize>("PARLEY_RATE_LIMIT_MAX")
                .unwrap_or(defaults.rate_limit_max),
            session_ttl: env_parse::<i64>("PARLEY_SESSION_TTL_HOURS")
                .map(chrono::Duration::hours)
                .unwrap_or(defaults.session_ttl),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|value| value.trim().parse::<T>().ok())
}

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<Agent>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    pub limiter: ClientRateLimiter,
}

impl ApiState {
    pub fn new(rules: RuleSet, config: ApiConfig) -> Self {
        let metrics = AppMetrics::shared();
        let agent = ConciergeAgent::new(
            Arc::new(rules),
            Arc::new(CannedFallback),
            Arc::new(MemoryStore::new()),
            metrics.clone(),
        )
        .with_session_ttl(config.session_ttl);

        Self {
            agent: Arc::new(agent),
            metrics,
            api_key: config.api_key,
            limiter: ClientRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    rules_loaded: usize,
    patterns_loaded: usize,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Deserialize)]
struct MatchRequest {
    text: String,
    language: Option<String>,
}

#[derive(Debug, Serialize)]
struct MatchResponse {
    matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    intent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    session_id: Option<String>,
    text: String,
    language: Option<String>,
    user_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct IntentSummary {
    intent: String,
    patterns: Vec<String>,
    languages: Vec<Language>,
}

/// Loads the rule source and builds the router. Fails when no rule source can
/// be located; the caller is expected to abort startup.
pub async fn build_app(rules_path: Option<&Path>) -> Result<Router> {
    let loaded = load_rules(rules_path).context("failed to load intent rules")?;
    info!(
        path = %loaded.path.display(),
        rules = loaded.rules.len(),
        "intent rules ready"
    );

    let state = ApiState::new(loaded.rules, ApiConfig::from_env());
    spawn_session_sweeper(state.agent.clone(), SESSION_SWEEP_EVERY);
    Ok(build_router(state))
}

/// Periodically drops expired conversation sessions so abandoned ids do not
/// accumulate in the in-memory store. Must be called inside a tokio runtime.
pub fn spawn_session_sweeper(agent: Arc<Agent>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match agent.purge_expired_sessions().await {
                Ok(0) => {}
                Ok(removed) => debug!(removed, "expired sessions purged"),
                Err(err) => warn!(error = %err, "session purge failed"),
            }
        }
    })
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/match", post(match_text))
        .route("/v1/chat", post(chat))
        .route("/v1/intents", get(intents))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let rules = state.agent.rules();
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        rules_loaded: rules.len(),
        patterns_loaded: rules.pattern_count(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn match_text(
    State(state): State<ApiState>,
    Json(request): Json<MatchRequest>,
) -> impl IntoResponse {
    let payload = match state
        .agent
        .match_text(&request.text, request.language.as_deref())
    {
        Some(hit) => MatchResponse {
            matched: true,
            intent: Some(hit.intent_id),
            response: Some(hit.response),
        },
        None => MatchResponse {
            matched: false,
            intent: None,
            response: None,
        },
    };

    (StatusCode::OK, Json(payload))
}

async fn chat(State(state): State<ApiState>, Json(request): Json<ChatRequest>) -> Response {
    if request.text.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "empty_text", "text must not be empty");
    }

    let input = ChatInput {
        session_id: request.session_id,
        text: request.text,
        language: request.language,
        user_id: request.user_id,
    };

    match state.agent.handle_chat(input).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(err) => {
            error!(error = %err, "chat handling failed");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "chat_failed",
                "failed to handle chat message",
            )
        }
    }
}

async fn intents(State(state): State<ApiState>) -> impl IntoResponse {
    let summaries = state
        .agent
        .rules()
        .rules()
        .iter()
        .map(|rule| IntentSummary {
            intent: rule.intent_id.clone(),
            patterns: rule.patterns.clone(),
            languages: rule.responses.languages(),
        })
        .collect::<Vec<_>>();

    (StatusCode::OK, Json(summaries))
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": code,
            "message": message,
        })),
    )
        .into_response()
}

fn is_public_endpoint(path: &str) -> bool {
    matches!(path, "/health")
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return error_response(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid x-api-key",
        );
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || is_public_endpoint(request.uri().path()) {
        return next.run(request).await;
    }

    let client = client_key(&request);
    if !state.limiter.allow(&client) {
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "rate limit exceeded for this client",
        );
    }

    next.run(request).await
}

fn client_key(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "local".to_string())
}
