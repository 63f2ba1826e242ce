use crate::config::rules::{ reload_rules_if_changed, LoadedRules };
use crate::conversation::store::format_timestamp;
use crate::engine::ResponseDispatcher;
use crate::models::chat::{ ChatRequest, ChatResponse, ErrorResponse, HealthResponse };
use axum::{
    extract::{ rejection::JsonRejection, State },
    http::{ HeaderValue, StatusCode },
    response::{ IntoResponse, Response },
    routing::{ get, post },
    Json,
    Router,
};
use chrono::Utc;
use governor::{ DefaultDirectRateLimiter, Quota, RateLimiter };
use log::{ debug, error, info, warn };
use rand::Rng;
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{ Mutex, RwLock };
use tower_http::cors::{ AllowOrigin, Any, CorsLayer };

pub const EMPTY_MESSAGE_ERROR: &str = "Message cannot be empty";
pub const EMPTY_MESSAGE_PROMPT: &str = "Please enter a message to continue our conversation.";
pub const HEALTH_MESSAGE: &str = "Chat Assistant API is running";

#[derive(Serialize)]
struct ReloadResponse {
    success: bool,
    message: String,
}

/// Inclusive bounds of the simulated typing delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min: Duration,
    pub max: Duration,
}

impl DelayRange {
    pub const NONE: DelayRange = DelayRange { min: Duration::ZERO, max: Duration::ZERO };

    pub fn from_millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min.min(max)),
            max: Duration::from_millis(max.max(min)),
        }
    }

    fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<RwLock<ResponseDispatcher>>,
    rules: Arc<Mutex<Option<(String, LoadedRules)>>>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
    delay: DelayRange,
}

impl AppState {
    pub fn new(dispatcher: ResponseDispatcher, rate_limit_per_second: u32, delay: DelayRange) -> Self {
        let limiter = NonZeroU32::new(rate_limit_per_second).map(|rate|
            Arc::new(RateLimiter::direct(Quota::per_second(rate)))
        );
        Self {
            dispatcher: Arc::new(RwLock::new(dispatcher)),
            rules: Arc::new(Mutex::new(None)),
            limiter,
            delay,
        }
    }

    /// Enables `/api/reload-rules` for a table loaded from `path`.
    pub fn with_rule_file(self, path: String, loaded: LoadedRules) -> Self {
        Self { rules: Arc::new(Mutex::new(Some((path, loaded)))), ..self }
    }
}

pub fn cors_layer(origins: &str) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(allowed))
    }
}

pub fn router(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/health", get(health_handler))
        .route("/api/reload-rules", get(reload_rules_handler))
        .layer(cors)
        .with_state(state)
}

fn empty_message_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: EMPTY_MESSAGE_ERROR.to_string(),
            response: Some(EMPTY_MESSAGE_PROMPT.to_string()),
        }),
    ).into_response()
}

async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>
) -> Response {
    if let Some(limiter) = &state.limiter {
        if limiter.check().is_err() {
            warn!("Chat rate limit exceeded");
            return (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ErrorResponse { error: "Too many requests".to_string(), response: None }),
            ).into_response();
        }
    }

    let message = match payload {
        Ok(Json(req)) => req.message.unwrap_or_default(),
        Err(rejection) => {
            debug!("Rejected chat body: {}", rejection);
            return empty_message_response();
        }
    };
    if message.trim().is_empty() {
        return empty_message_response();
    }

    let delay = state.delay.sample();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let response = state.dispatcher.read().await.dispatch(&message);
    Json(ChatResponse {
        response,
        timestamp: format_timestamp(&Utc::now()),
    }).into_response()
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: HEALTH_MESSAGE.to_string(),
    })
}

async fn reload_rules_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut rules = match state.rules.try_lock() {
        Ok(g) => g,
        Err(_) =>
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReloadResponse { success: false, message: "Reload already running".into() }),
            ),
    };

    let (path, current) = match rules.as_mut() {
        Some(entry) => entry,
        None =>
            return (
                StatusCode::OK,
                Json(ReloadResponse { success: true, message: "Built-in rules in use".into() }),
            ),
    };

    match reload_rules_if_changed(path.as_str(), current) {
        Ok(Some(fresh)) => {
            let mut dispatcher = state.dispatcher.write().await;
            *dispatcher = dispatcher.with_rules(fresh.table.clone());
            *current = fresh;
            info!("Rule table reloaded from '{}'", path);
            (StatusCode::OK, Json(ReloadResponse { success: true, message: "Rules reloaded".into() }))
        }
        Ok(None) =>
            (StatusCode::OK, Json(ReloadResponse { success: true, message: "Rules unchanged".into() })),
        Err(e) => {
            error!("Rule reload failed: {}", e);
            (
                StatusCode::BAD_REQUEST,
                Json(ReloadResponse { success: false, message: format!("Reload error: {}", e) }),
            )
        }
    }
}
