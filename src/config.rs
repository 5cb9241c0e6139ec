//! Configuration management
//!
//! Process settings come from the environment (optionally via `.env`);
//! remediation rules and simulated jobs come from a TOML policy file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::event::JobId;
use crate::llm::LlmClientConfig;
use crate::remediation::RemediationRule;

/// Which reasoning module the agent uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningMode {
    Llm,
    Simple,
}

impl ReasoningMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "simple" => Self::Simple,
            _ => Self::Llm,
        }
    }
}

/// Process configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,

    /// Language-model endpoint, model and prompt
    pub llm: LlmClientConfig,

    /// TOML file with remediation rules and simulated jobs
    pub policy_path: PathBuf,

    pub reasoning: ReasoningMode,

    /// Agent polling delay in continuous mode
    pub poll_interval: Duration,

    /// Worker sleep when the queue is empty
    pub worker_idle: Duration,

    /// Worker sleep after a store error
    pub worker_backoff: Duration,

    /// Self-reflection window and failure threshold
    pub min_failures: usize,

    /// Retry budget of the `retry` remediation
    pub max_retries: u32,

    /// Demo mode cycle bound
    pub max_events: usize,

    /// Records the worker agent keeps in process (AUTOREMEDY_MEMORY_RETENTION)
    pub memory_retention: usize,

    /// Let a reflected `escalate` context flag force escalation
    pub context_escalation: bool,

    pub api_bind_addr: String,
    pub api_port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let parsed = |key: &str, default: u64| -> Result<u64> {
            match var(key) {
                Some(v) => v
                    .trim()
                    .parse()
                    .with_context(|| format!("{} must be a non-negative integer, got '{}'", key, v)),
                None => Ok(default),
            }
        };
        let flag = |key: &str| {
            var(key)
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false)
        };

        let redis_url = var("REDIS_URL").unwrap_or_else(|| {
            format!(
                "redis://{}:{}/{}",
                var("REDIS_HOST").unwrap_or_else(|| "localhost".to_string()),
                var("REDIS_PORT").unwrap_or_else(|| "6379".to_string()),
                var("REDIS_DB").unwrap_or_else(|| "0".to_string()),
            )
        });

        let defaults = LlmClientConfig::default();
        let llm = LlmClientConfig {
            endpoint: var("LLM_ENDPOINT").unwrap_or(defaults.endpoint),
            model: var("LLM_MODEL").unwrap_or(defaults.model),
            prompt_template: var("LLM_PROMPT").unwrap_or(defaults.prompt_template),
            timeout: Duration::from_secs(parsed("LLM_TIMEOUT_SECS", 60)?),
        };

        let api_port = parsed("API_PORT", 8000)?;
        let api_port = u16::try_from(api_port).context("API_PORT out of range")?;
        let min_failures = usize::try_from(parsed("AUTOREMEDY_MIN_FAILURES", 3)?)
            .context("AUTOREMEDY_MIN_FAILURES out of range")?;
        let max_retries = u32::try_from(parsed("AUTOREMEDY_MAX_RETRIES", 2)?)
            .context("AUTOREMEDY_MAX_RETRIES out of range")?;
        let max_events = usize::try_from(parsed("AUTOREMEDY_MAX_EVENTS", 5)?)
            .context("AUTOREMEDY_MAX_EVENTS out of range")?;
        let memory_retention = usize::try_from(parsed("AUTOREMEDY_MEMORY_RETENTION", 1000)?)
            .context("AUTOREMEDY_MEMORY_RETENTION out of range")?;

        Ok(Self {
            redis_url,
            llm,
            policy_path: var("AUTOREMEDY_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("autoremedy.toml")),
            reasoning: var("AUTOREMEDY_REASONING")
                .map(|v| ReasoningMode::parse(&v))
                .unwrap_or(ReasoningMode::Llm),
            poll_interval: Duration::from_secs(parsed("AUTOREMEDY_POLL_INTERVAL_SECS", 5)?),
            worker_idle: Duration::from_millis(parsed("AUTOREMEDY_WORKER_IDLE_MS", 1000)?),
            worker_backoff: Duration::from_millis(parsed("AUTOREMEDY_WORKER_BACKOFF_MS", 5000)?),
            min_failures,
            max_retries,
            max_events,
            memory_retention,
            context_escalation: flag("AUTOREMEDY_CONTEXT_ESCALATION"),
            api_bind_addr: var("API_BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string()),
            api_port,
        })
    }

    pub fn api_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.api_bind_addr, self.api_port)
            .parse()
            .with_context(|| format!("Invalid API address {}:{}", self.api_bind_addr, self.api_port))
    }
}

// ===== Policy file =====

/// Simulated long-running job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub id: JobId,
    /// Nominal runtime in seconds
    pub expected_duration: f64,
    #[serde(rename = "type")]
    pub job_type: String,
}

/// Static policy: remediation rules and simulated jobs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub remediation_rules: Vec<RemediationRule>,
    #[serde(default)]
    pub jobs: Vec<JobSpec>,
}

impl Policy {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse policy TOML")
    }

    /// Load once at startup; a missing file means an empty policy
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Policy file {} not found, running without remediation rules", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file {}", path.display()))?;
        let policy = Self::parse(&content)
            .with_context(|| format!("Invalid policy file {}", path.display()))?;

        info!(
            "Loaded {} remediation rule(s) and {} job(s) from {}",
            policy.remediation_rules.len(),
            policy.jobs.len(),
            path.display()
        );
        Ok(policy)
    }
}
