//! Job Events
//!
//! Immutable observations about a job's status, produced by sensors or
//! submitted through the HTTP API and consumed by reasoning and
//! remediation matching.

use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Default `event_type` for job observations
pub const DEFAULT_EVENT_TYPE: &str = "job_issue";

/// Job identifier - producers send either integers or strings
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobId {
    Number(i64),
    Text(String),
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for JobId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for JobId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Observed job status
///
/// Open-ended: statuses outside the known set are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Success,
    Fail,
    Stuck,
    Slow,
    Escalate,
    Warning,
    Debug,
    Trace,
    Info,
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Success => "success",
            Self::Fail => "fail",
            Self::Stuck => "stuck",
            Self::Slow => "slow",
            Self::Escalate => "escalate",
            Self::Warning => "warning",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Info => "info",
            Self::Other(s) => s,
        }
    }

    /// Map a (Portuguese) log level to a job status by prefix
    pub fn from_log_level(level: &str) -> Self {
        let level = level.trim().to_lowercase();
        let starts = |prefixes: &[&str]| prefixes.iter().any(|p| level.starts_with(p));

        if starts(&["fatal", "emergência", "emergencia", "crítico", "critico"]) {
            Self::Escalate
        } else if starts(&["erro"]) {
            Self::Fail
        } else if starts(&["alerta", "aviso"]) {
            Self::Warning
        } else if starts(&["debug"]) {
            Self::Debug
        } else if starts(&["trace"]) {
            Self::Trace
        } else if starts(&["informações"]) {
            Self::Success
        } else {
            Self::Info
        }
    }
}

impl From<String> for JobStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "success" => Self::Success,
            "fail" => Self::Fail,
            "stuck" => Self::Stuck,
            "slow" => Self::Slow,
            "escalate" => Self::Escalate,
            "warning" => Self::Warning,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            "info" => Self::Info,
            _ => Self::Other(s),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(s: &str) -> Self {
        Self::from(s.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form event details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Any additional producer-specific keys
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single job observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub details: EventDetails,
    /// Escalation flag set by the producer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalate: Option<bool>,
}

fn default_event_type() -> String {
    DEFAULT_EVENT_TYPE.to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Event {
    /// Create a `job_issue` event with empty details
    pub fn new(job_id: impl Into<JobId>, status: impl Into<JobStatus>) -> Self {
        Self {
            job_id: job_id.into(),
            status: status.into(),
            event_type: default_event_type(),
            details: EventDetails::default(),
            escalate: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.details.source = Some(source.to_string());
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.details.description = Some(description.to_string());
        self
    }

    pub fn with_timestamp(mut self, timestamp: &str) -> Self {
        self.details.timestamp = Some(timestamp.to_string());
        self
    }

    pub fn with_event_type(mut self, event_type: &str) -> Self {
        self.event_type = event_type.to_string();
        self
    }

    pub fn with_escalate(mut self, escalate: bool) -> Self {
        self.escalate = Some(escalate);
        self
    }

    pub fn source(&self) -> Option<&str> {
        self.details.source.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.details.description.as_deref()
    }

    /// True when the producer explicitly asked for escalation
    pub fn requests_escalation(&self) -> bool {
        self.escalate == Some(true) || self.status == JobStatus::Escalate
    }

    /// Feedback Key: SHA256("{event_type}|{source}|{description}")
    ///
    /// Similar events (same type, source and description) share a key, so
    /// feedback recorded for one biases reasoning for all of them.
    pub fn feedback_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.event_type.as_bytes());
        hasher.update(b"|");
        hasher.update(self.source().unwrap_or_default().as_bytes());
        hasher.update(b"|");
        hasher.update(self.description().unwrap_or_default().as_bytes());
        hex::encode(hasher.finalize())
    }
}
