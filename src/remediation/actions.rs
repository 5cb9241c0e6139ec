//! Remediation execution
//!
//! Runs a named remediation against a job. Side effects are simulated and
//! logged; the returned [`RemediationResult`] is what lands in history.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::action::RemediationResult;
use crate::event::Event;
use crate::llm::{suggestion_text, LanguageModel};

/// Default retry budget per job
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Known remediation names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemediationKind {
    Retry,
    RestartService,
    Escalate,
    ClearTempFiles,
    ClearQueue,
}

impl RemediationKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "retry" => Some(Self::Retry),
            "restart_service" => Some(Self::RestartService),
            "escalate" => Some(Self::Escalate),
            "clear_temp_files" => Some(Self::ClearTempFiles),
            "clear_queue" => Some(Self::ClearQueue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Retry => "retry",
            Self::RestartService => "restart_service",
            Self::Escalate => "escalate",
            Self::ClearTempFiles => "clear_temp_files",
            Self::ClearQueue => "clear_queue",
        }
    }
}

/// Executes remediations, tracking a retry count per job id
pub struct Resolver {
    max_retries: u32,
    retries: Mutex<HashMap<String, u32>>,
    llm: Option<Arc<dyn LanguageModel>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES)
    }
}

impl Resolver {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            retries: Mutex::new(HashMap::new()),
            llm: None,
        }
    }

    /// Ask the model to explain escalations
    pub fn with_llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn retries_for(&self, job_id: &str) -> u32 {
        self.retries.lock().get(job_id).copied().unwrap_or(0)
    }

    pub async fn execute(&self, name: &str, event: &Event) -> RemediationResult {
        let job_id = event.job_id.to_string();

        let Some(kind) = RemediationKind::parse(name) else {
            warn!("Unknown remediation '{}' for job {}", name, job_id);
            return RemediationResult::Unknown;
        };

        match kind {
            RemediationKind::Retry => self.retry(&job_id),
            RemediationKind::RestartService => {
                info!("Restarting service for job {}", job_id);
                RemediationResult::Restarted
            }
            RemediationKind::Escalate => {
                info!("Escalating job {} to manual intervention", job_id);
                if let Some(llm) = &self.llm {
                    let log_text = escalation_log_text(event);
                    let explanation =
                        suggestion_text(llm.analyze_log(&log_text, Some(&job_id)).await);
                    info!("LLM analysis for job {}: {}", job_id, explanation);
                }
                RemediationResult::Escalate
            }
            RemediationKind::ClearTempFiles => {
                info!("Clearing temp files for job {} (/tmp/{}_tempfile)", job_id, job_id);
                RemediationResult::ClearedTempFiles
            }
            RemediationKind::ClearQueue => {
                info!("Clearing queue_{} for job {}", job_id, job_id);
                RemediationResult::ClearedQueue
            }
        }
    }

    fn retry(&self, job_id: &str) -> RemediationResult {
        let mut retries = self.retries.lock();
        let count = retries.entry(job_id.to_string()).or_insert(0);

        if *count < self.max_retries {
            *count += 1;
            info!("Retrying job {} (attempt {})", job_id, count);
            RemediationResult::Retried
        } else {
            warn!("Max retries reached for job {}", job_id);
            RemediationResult::Escalate
        }
    }
}

fn escalation_log_text(event: &Event) -> String {
    event
        .description()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Job {} encountered status: {}", event.job_id, event.status))
}
