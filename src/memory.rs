//! Agent Memory
//!
//! Append-only record of what an agent saw, what it decided, what happened,
//! and what a human later said about it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::{Action, Outcome};
use crate::event::Event;

/// Human feedback on a recorded decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFeedback {
    pub user: String,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

impl RecordFeedback {
    pub fn new(user: &str, rating: i32, comment: Option<&str>) -> Self {
        Self {
            user: user.to_string(),
            rating,
            comment: comment.map(str::to_string),
        }
    }

    /// Ratings below 3 mark the decision as ineffective
    pub fn is_ineffective(&self) -> bool {
        self.rating < 3
    }
}

/// One decision cycle for one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub event: Event,
    pub actions: Vec<Action>,
    /// Action-major, effector-minor
    pub outcomes: Vec<Outcome>,
    #[serde(default)]
    pub feedback: Option<RecordFeedback>,
    #[serde(default = "Utc::now")]
    pub recorded_at: DateTime<Utc>,
}

impl HistoryRecord {
    pub fn new(event: Event, actions: Vec<Action>, outcomes: Vec<Outcome>) -> Self {
        Self {
            event,
            actions,
            outcomes,
            feedback: None,
            recorded_at: Utc::now(),
        }
    }

    /// Name of the first remediation decided for this record, if any
    pub fn first_remediation(&self) -> Option<&str> {
        self.actions.iter().find_map(|a| match a {
            Action::Remediate { remediation, .. } => Some(remediation.as_str()),
            Action::Notify { .. } => None,
        })
    }
}

/// Per-agent history
///
/// Unbounded by default. With a retention limit the oldest records are
/// dropped once the limit is passed.
#[derive(Debug, Default)]
pub struct Memory {
    history: Vec<HistoryRecord>,
    retention: Option<usize>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` records (at least one)
    pub fn with_retention(limit: usize) -> Self {
        Self {
            history: Vec::new(),
            retention: Some(limit.max(1)),
        }
    }

    /// Append a record and return it
    pub fn record(
        &mut self,
        event: Event,
        actions: Vec<Action>,
        outcomes: Vec<Outcome>,
    ) -> &HistoryRecord {
        self.history.push(HistoryRecord::new(event, actions, outcomes));
        if let Some(limit) = self.retention {
            let excess = self.history.len().saturating_sub(limit);
            self.history.drain(..excess);
        }
        &self.history[self.history.len() - 1]
    }

    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    pub fn last(&self) -> Option<&HistoryRecord> {
        self.history.last()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Set feedback on the most recent record. Returns false when empty.
    pub fn attach_to_last(&mut self, feedback: RecordFeedback) -> bool {
        match self.history.last_mut() {
            Some(record) => {
                record.feedback = Some(feedback);
                true
            }
            None => false,
        }
    }

    /// Set feedback on the first record whose job id renders as `event_id`
    pub fn attach_to_event(&mut self, event_id: &str, feedback: RecordFeedback) -> bool {
        match self
            .history
            .iter_mut()
            .find(|r| r.event.job_id.to_string() == event_id)
        {
            Some(record) => {
                record.feedback = Some(feedback);
                true
            }
            None => false,
        }
    }
}
