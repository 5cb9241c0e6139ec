//! Feedback Store
//!
//! Remembers how past remediations worked out for similar events and turns
//! that history into prompt context for the next decision.
//!
//! Entries are grouped by the event's Feedback Key, so every event with the
//! same type, source and description shares one list.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

use crate::event::Event;
use crate::store::{ListStore, StoreError, FEEDBACK_KEY_PREFIX};

/// Ratings at or above this count as effective
pub const EFFECTIVE_RATING: i32 = 3;

/// One remediation outcome as judged by a human
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub action: String,
    /// Effectiveness label ("effective", "ineffective", ...)
    pub feedback: String,
    #[serde(default)]
    pub comment: Option<String>,
}

impl FeedbackEntry {
    pub fn new(action: &str, feedback: &str, comment: Option<&str>) -> Self {
        Self {
            action: action.to_string(),
            feedback: feedback.to_string(),
            comment: comment.map(str::to_string),
        }
    }

    /// Build an entry from a numeric rating
    pub fn from_rating(action: &str, rating: i32, comment: Option<&str>) -> Self {
        let label = if rating >= EFFECTIVE_RATING {
            "effective"
        } else {
            "ineffective"
        };
        Self::new(action, label, comment)
    }
}

/// Feedback entries keyed by Feedback Key
#[derive(Clone)]
pub struct FeedbackStore {
    store: Arc<dyn ListStore>,
}

impl FeedbackStore {
    pub fn new(store: Arc<dyn ListStore>) -> Self {
        Self { store }
    }

    /// Storage key for an event: `feedback:event:{sha256}`
    pub fn key_for(event: &Event) -> String {
        format!("{}{}", FEEDBACK_KEY_PREFIX, event.feedback_key())
    }

    /// Append an entry under the event's Feedback Key
    pub async fn store_feedback(
        &self,
        event: &Event,
        action: &str,
        feedback: &str,
        comment: Option<&str>,
    ) -> Result<(), StoreError> {
        self.store_entry(event, &FeedbackEntry::new(action, feedback, comment))
            .await
    }

    pub async fn store_entry(&self, event: &Event, entry: &FeedbackEntry) -> Result<(), StoreError> {
        // Serializing a struct of strings cannot fail
        let payload = serde_json::to_string(entry).unwrap_or_default();
        self.store.push(&Self::key_for(event), &payload).await
    }

    /// All entries for the event's Feedback Key, oldest first
    pub async fn get_feedback(&self, event: &Event) -> Result<Vec<FeedbackEntry>, StoreError> {
        let key = Self::key_for(event);
        let raw = self.store.range(&key).await?;

        Ok(raw
            .iter()
            .filter_map(|item| match serde_json::from_str(item) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping malformed feedback entry under {}: {}", key, e);
                    None
                }
            })
            .collect())
    }

    /// Drop every entry for the event's key (test teardown)
    pub async fn clear(&self, event: &Event) -> Result<(), StoreError> {
        self.store.delete(&Self::key_for(event)).await
    }
}

/// Append a feedback history block to a prompt; no entries leaves it untouched
pub fn enrich_prompt(prompt: &str, entries: &[FeedbackEntry]) -> String {
    if entries.is_empty() {
        return prompt.to_string();
    }

    let mut enriched = format!("{}\n\nFeedback history for similar events:\n", prompt);
    for entry in entries {
        enriched.push_str(&format!(
            "Previous action: {}, Feedback: {}, Comment: {}\n",
            entry.action,
            entry.feedback,
            entry.comment.as_deref().unwrap_or("")
        ));
    }
    enriched
}
