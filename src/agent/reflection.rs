//! Self-Reflection
//!
//! Looks at the trailing window of an agent's history and proposes context
//! adjustments:
//! - `escalate`: the whole window failed
//! - `review_strategy`: someone rated a decision in the window as ineffective

use serde_json::Value;

use super::AgentContext;
use crate::event::JobStatus;
use crate::memory::HistoryRecord;

/// Default trailing window and failure threshold
pub const DEFAULT_MIN_FAILURES: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct SelfReflection {
    min_failures_for_escalation: usize,
}

impl Default for SelfReflection {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_FAILURES)
    }
}

impl SelfReflection {
    /// `min_failures` is both the window size and the failure threshold (at least 1)
    pub fn new(min_failures: usize) -> Self {
        Self {
            min_failures_for_escalation: min_failures.max(1),
        }
    }

    pub fn min_failures(&self) -> usize {
        self.min_failures_for_escalation
    }

    pub fn reflect(&self, history: &[HistoryRecord]) -> AgentContext {
        let window = &history[history.len().saturating_sub(self.min_failures_for_escalation)..];

        let fail_count = window
            .iter()
            .filter(|r| r.event.status == JobStatus::Fail)
            .count();
        let ineffective = window.iter().any(|r| {
            r.feedback
                .as_ref()
                .is_some_and(|feedback| feedback.is_ineffective())
        });

        let mut suggestions = AgentContext::new();
        if fail_count >= self.min_failures_for_escalation {
            suggestions.insert("escalate".to_string(), Value::Bool(true));
        }
        if ineffective {
            suggestions.insert("review_strategy".to_string(), Value::Bool(true));
        }
        suggestions
    }
}
