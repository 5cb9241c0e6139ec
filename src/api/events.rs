//! Event, history and feedback endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::{ApiError, ApiState};
use crate::event::{Event, JobId};
use crate::feedback::FeedbackEntry;
use crate::memory::{HistoryRecord, RecordFeedback};
use crate::store::{EVENT_QUEUE_KEY, HISTORY_KEY};

/// Feedback submission
#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackRequest {
    pub event_id: JobId,
    pub user: String,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub records: Vec<HistoryRecord>,
}

/// GET /
pub async fn root() -> Json<serde_json::Value> {
    Json(json!({"message": "AutoRemedy API is running"}))
}

/// POST /event - queue for the worker; acknowledges, does not process
pub async fn submit_event(
    State(state): State<ApiState>,
    payload: Result<Json<Event>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(event) = payload.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    let body = serde_json::to_string(&event).map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

    state.store.push(EVENT_QUEUE_KEY, &body).await?;
    info!("Queued event for job {} ({})", event.job_id, event.status);

    Ok(Json(json!({"status": "submitted"})))
}

/// GET /history - unparseable entries are skipped
pub async fn get_history(State(state): State<ApiState>) -> Result<Json<HistoryResponse>, ApiError> {
    let records = state
        .store
        .range(HISTORY_KEY)
        .await?
        .iter()
        .filter_map(|item| serde_json::from_str(item).ok())
        .collect();

    Ok(Json(HistoryResponse { records }))
}

/// POST /feedback - rate the first recorded decision for `event_id`
pub async fn submit_feedback(
    State(state): State<ApiState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidPayload(e.body_text()))?;
    let event_id = request.event_id.to_string();

    let history = state.store.range(HISTORY_KEY).await?;
    let found = history.iter().enumerate().find_map(|(idx, item)| {
        serde_json::from_str::<HistoryRecord>(item)
            .ok()
            .filter(|record| record.event.job_id.to_string() == event_id)
            .map(|record| (idx, record))
    });

    let Some((idx, mut record)) = found else {
        return Err(ApiError::NotFound("Event not found in history".to_string()));
    };

    record.feedback = Some(RecordFeedback::new(
        &request.user,
        request.rating,
        request.comment.as_deref(),
    ));
    let updated = serde_json::to_string(&record).map_err(|e| ApiError::InvalidPayload(e.to_string()))?;
    state.store.set(HISTORY_KEY, idx, &updated).await?;
    info!("Feedback from {} on job {}: {}", request.user, event_id, request.rating);

    let entry = FeedbackEntry::from_rating(
        record.first_remediation().unwrap_or("notify"),
        request.rating,
        request.comment.as_deref(),
    );
    if let Err(e) = state.feedback.store_entry(&record.event, &entry).await {
        warn!("Failed to store feedback entry for job {}: {}", event_id, e);
    }

    Ok(Json(json!({"status": "feedback added"})))
}
