//! Health and Status API
//!
//! Both endpoints answer 200 and report store trouble in the body, so
//! monitors can tell "API down" from "Redis down".

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::store::{EVENT_QUEUE_KEY, HISTORY_KEY};

/// Health/status response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_queue: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<usize>,
}

impl StatusResponse {
    fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            detail: None,
            event_queue: None,
            history: None,
        }
    }

    fn error(detail: String) -> Self {
        Self {
            status: "error".to_string(),
            detail: Some(detail),
            event_queue: None,
            history: None,
        }
    }
}

/// GET /health
pub async fn health_check(State(state): State<ApiState>) -> Json<StatusResponse> {
    match state.store.ping().await {
        Ok(()) => Json(StatusResponse::ok()),
        Err(e) => Json(StatusResponse::error(e.to_string())),
    }
}

/// GET /status
pub async fn status_handler(State(state): State<ApiState>) -> Json<StatusResponse> {
    let queue = match state.store.len(EVENT_QUEUE_KEY).await {
        Ok(n) => n,
        Err(e) => return Json(StatusResponse::error(e.to_string())),
    };
    let history = match state.store.len(HISTORY_KEY).await {
        Ok(n) => n,
        Err(e) => return Json(StatusResponse::error(e.to_string())),
    };

    Json(StatusResponse {
        status: "ok".to_string(),
        detail: Some(format!("event_queue={}, history={}", queue, history)),
        event_queue: Some(queue),
        history: Some(history),
    })
}
