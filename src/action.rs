//! Decided actions and effector outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::event::Event;

/// A decided response to an event
///
/// Serialized as `{"type": "notify", "params": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params", rename_all = "lowercase")]
pub enum Action {
    /// Tell a human, optionally as an escalation
    Notify { job: Event, escalation: bool },
    /// Run a named remediation against the job
    Remediate { job: Event, remediation: String },
}

impl Action {
    pub fn notify(job: &Event, escalation: bool) -> Self {
        Self::Notify {
            job: job.clone(),
            escalation,
        }
    }

    pub fn remediate(job: &Event, remediation: &str) -> Self {
        Self::Remediate {
            job: job.clone(),
            remediation: remediation.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Notify { .. } => "notify",
            Self::Remediate { .. } => "remediate",
        }
    }

    /// The event this action responds to
    pub fn job(&self) -> &Event {
        match self {
            Self::Notify { job, .. } | Self::Remediate { job, .. } => job,
        }
    }

    pub fn is_escalation(&self) -> bool {
        matches!(self, Self::Notify { escalation: true, .. })
    }
}

/// Result of a remediation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationResult {
    Retried,
    Restarted,
    Escalate,
    ClearedTempFiles,
    ClearedQueue,
    Unknown,
}

impl RemediationResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retried => "retried",
            Self::Restarted => "restarted",
            Self::Escalate => "escalate",
            Self::ClearedTempFiles => "cleared_temp_files",
            Self::ClearedQueue => "cleared_queue",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for RemediationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one effector reported for one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Side effect performed
    Done,
    /// Effector does not handle this kind of action
    Skipped,
    Remediation(RemediationResult),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_wire_format() {
        let event = Event::new(5, "fail");
        let json = serde_json::to_value(Action::notify(&event, true)).unwrap();

        assert_eq!(json["type"], "notify");
        assert_eq!(json["params"]["escalation"], true);
        assert_eq!(json["params"]["job"]["job_id"], 5);
    }

    #[test]
    fn test_remediate_wire_format() {
        let event = Event::new(5, "fail");
        let json = serde_json::to_value(Action::remediate(&event, "clear_temp_files")).unwrap();

        assert_eq!(json["type"], "remediate");
        assert_eq!(json["params"]["remediation"], "clear_temp_files");
    }

    #[test]
    fn test_outcome_has_no_failure_variant() {
        assert!(serde_json::from_str::<Outcome>(r#"{"failed": "boom"}"#).is_err());
        assert_eq!(
            serde_json::from_str::<Outcome>(r#""skipped""#).unwrap(),
            Outcome::Skipped
        );
    }

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(serde_json::to_value(Outcome::Done).unwrap(), "done");
        assert_eq!(
            serde_json::to_value(Outcome::Remediation(RemediationResult::ClearedQueue)).unwrap(),
            serde_json::json!({"remediation": "cleared_queue"})
        );
    }

    #[test]
    fn test_is_escalation() {
        let event = Event::new(1, "stuck");
        assert!(Action::notify(&event, true).is_escalation());
        assert!(!Action::notify(&event, false).is_escalation());
        assert!(!Action::remediate(&event, "retry").is_escalation());
    }
}
