//! AutoRemedy HTTP API
//!
//! Routes:
//! - GET  /          - Liveness banner
//! - GET  /health    - Store connectivity
//! - GET  /status    - Queue depth and history length
//! - POST /event     - Enqueue an event for the worker
//! - GET  /history   - All recorded decisions
//! - POST /feedback  - Rate a recorded decision
//! - POST /mcp       - JSON-RPC tool calls
//! - GET  /mcp/tools - Tool schemas

pub mod events;
pub mod health;
pub mod mcp;
pub mod server;

pub use server::ApiServer;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::feedback::FeedbackStore;
use crate::llm::LanguageModel;
use crate::remediation::{RemediationRule, Resolver};
use crate::store::{ListStore, StoreError};

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn ListStore>,
    pub feedback: FeedbackStore,
    pub llm: Arc<dyn LanguageModel>,
    pub rules: Arc<Vec<RemediationRule>>,
    pub resolver: Arc<Resolver>,
}

impl ApiState {
    pub fn new(store: Arc<dyn ListStore>, llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            feedback: FeedbackStore::new(store.clone()),
            store,
            llm,
            rules: Arc::new(Vec::new()),
            resolver: Arc::new(Resolver::default()),
        }
    }

    pub fn with_rules(mut self, rules: Arc<Vec<RemediationRule>>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<Resolver>) -> Self {
        self.resolver = resolver;
        self
    }
}

/// Build the full router
pub fn api_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(events::root))
        .route("/health", get(health::health_check))
        .route("/status", get(health::status_handler))
        .route("/event", post(events::submit_event))
        .route("/history", get(events::get_history))
        .route("/feedback", post(events::submit_feedback))
        .route("/mcp", post(mcp::mcp_handler))
        .route("/mcp/tools", get(mcp::list_tools))
        .with_state(state)
}

// ===== Errors =====

/// Error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code
    pub error: &'static str,
    /// Human-readable message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Errors surfaced to API callers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Store unavailable: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::InvalidPayload(_) => (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_PAYLOAD"),
            ApiError::Store(e) => {
                error!("Store error: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
            }
        };

        let body = Json(ErrorResponse {
            error: code,
            message: self.to_string(),
            details: None,
        });

        (status, body).into_response()
    }
}
