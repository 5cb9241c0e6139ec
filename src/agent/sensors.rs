//! Sensors
//!
//! Event producers for the agent loop: random simulation, fixed replay,
//! JSON-lines log replay and the job simulator with its re-run queue.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::Sensor;
use crate::config::JobSpec;
use crate::event::{Event, JobId, JobStatus};

// ===== Simulated =====

/// Random job events; successful jobs produce nothing
pub struct SimulatedSensor {
    rng: StdRng,
}

impl SimulatedSensor {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence for reproducible runs
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Sensor for SimulatedSensor {
    async fn poll(&mut self) -> Option<Event> {
        const STATUSES: [JobStatus; 4] = [
            JobStatus::Success,
            JobStatus::Fail,
            JobStatus::Stuck,
            JobStatus::Slow,
        ];

        let job_id: i64 = self.rng.gen_range(1..=5);
        let status = STATUSES[self.rng.gen_range(0..STATUSES.len())].clone();
        if status == JobStatus::Success {
            return None;
        }
        Some(Event::new(job_id, status))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

// ===== Replay =====

/// Yields a fixed list of events, one per poll
pub struct ReplaySensor {
    events: VecDeque<Event>,
}

impl ReplaySensor {
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events: events.into(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl Sensor for ReplaySensor {
    async fn poll(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    fn name(&self) -> &str {
        "replay"
    }
}

// ===== Log file =====

/// One line of an exported event log
#[derive(Debug, Deserialize)]
struct LogEntry {
    #[serde(default)]
    event_id: Option<JobId>,
    level: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Replays a JSON-lines event log, mapping log levels to job statuses
pub struct LogFileSensor {
    lines: Vec<String>,
    /// 0-based index of the next line to read
    cursor: usize,
}

impl LogFileSensor {
    pub async fn open(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read event log {}", path.display()))?;
        Ok(Self::from_content(&content))
    }

    pub fn from_content(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
            cursor: 0,
        }
    }

    fn to_event(entry: LogEntry, row: usize) -> Event {
        let status = JobStatus::from_log_level(&entry.level);
        let job_id = entry
            .event_id
            .unwrap_or_else(|| JobId::Number(row as i64));

        let mut event = Event::new(job_id, status);
        event.details.timestamp = entry.timestamp;
        event.details.source = entry.source;
        event.details.description = Some(entry.description.unwrap_or_default());
        if event.status == JobStatus::Escalate {
            event.escalate = Some(true);
        }
        event
    }
}

#[async_trait]
impl Sensor for LogFileSensor {
    async fn poll(&mut self) -> Option<Event> {
        while self.cursor < self.lines.len() {
            let row = self.cursor + 1;
            let line = self.lines[self.cursor].trim().to_string();
            self.cursor += 1;

            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(&line) {
                Ok(entry) => return Some(Self::to_event(entry, row)),
                Err(e) => warn!("Skipping malformed log line {}: {}", row, e),
            }
        }
        None
    }

    fn name(&self) -> &str {
        "log_file"
    }
}

// ===== Job simulator =====

/// Outcome weights for one simulated run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeWeights {
    pub success: u32,
    pub fail: u32,
    pub stuck: u32,
    pub slow: u32,
}

impl Default for OutcomeWeights {
    fn default() -> Self {
        Self {
            success: 70,
            fail: 15,
            stuck: 10,
            slow: 5,
        }
    }
}

impl OutcomeWeights {
    fn roll(&self, rng: &mut StdRng) -> JobStatus {
        let total = self.success + self.fail + self.stuck + self.slow;
        if total == 0 {
            return JobStatus::Success;
        }

        let mut n = rng.gen_range(0..total);
        for (weight, status) in [
            (self.success, JobStatus::Success),
            (self.fail, JobStatus::Fail),
            (self.stuck, JobStatus::Stuck),
        ] {
            if n < weight {
                return status;
            }
            n -= weight;
        }
        JobStatus::Slow
    }
}

#[derive(Default)]
struct JobQueueState {
    specs: HashMap<String, JobSpec>,
    pending: VecDeque<String>,
}

/// Pending runs, shared between the simulator and the remediation effector
///
/// `retry` and `restart_service` put a job back here; the simulator runs
/// it again on a later poll.
#[derive(Clone, Default)]
pub struct JobQueue {
    inner: Arc<Mutex<JobQueueState>>,
}

impl JobQueue {
    /// Register `jobs` and queue each of them once
    pub fn new(jobs: Vec<JobSpec>) -> Self {
        let mut state = JobQueueState::default();
        for job in jobs {
            let key = job.id.to_string();
            state.pending.push_back(key.clone());
            state.specs.insert(key, job);
        }
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Queue another run of a known job; unknown ids are ignored
    pub fn requeue(&self, job_id: &str) -> bool {
        let mut state = self.inner.lock();
        if !state.specs.contains_key(job_id) {
            return false;
        }
        if !state.pending.iter().any(|id| id == job_id) {
            state.pending.push_back(job_id.to_string());
        }
        true
    }

    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn pop(&self) -> Option<JobSpec> {
        let mut state = self.inner.lock();
        let id = state.pending.pop_front()?;
        state.specs.get(&id).cloned()
    }
}

/// Runs queued jobs and reports the ones that did not succeed
///
/// A job leaves the queue when it runs. It only comes back if a
/// remediation re-queues it through [`JobSimSensor::queue`].
pub struct JobSimSensor {
    queue: JobQueue,
    weights: OutcomeWeights,
    rng: StdRng,
}

impl JobSimSensor {
    pub fn new(jobs: Vec<JobSpec>) -> Self {
        Self {
            queue: JobQueue::new(jobs),
            weights: OutcomeWeights::default(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_weights(mut self, weights: OutcomeWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Handle for re-queueing jobs
    pub fn queue(&self) -> JobQueue {
        self.queue.clone()
    }

    /// Runs waiting in the queue
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

#[async_trait]
impl Sensor for JobSimSensor {
    async fn poll(&mut self) -> Option<Event> {
        let job = self.queue.pop()?;

        let status = self.weights.roll(&mut self.rng);
        let duration = match status {
            JobStatus::Slow => job.expected_duration * self.rng.gen_range(1.5..2.5),
            JobStatus::Stuck => job.expected_duration * self.rng.gen_range(2.5..5.0),
            _ => job.expected_duration,
        };
        debug!("Job {} ({}) finished with status {} after {:.1}s", job.id, job.job_type, status, duration);

        if status == JobStatus::Success {
            return None;
        }

        let mut event = Event::new(job.id.clone(), status.clone())
            .with_source(&job.job_type)
            .with_description(&format!("Job {} finished with status: {}", job.id, status));
        event
            .details
            .extra
            .insert("duration_secs".to_string(), serde_json::json!(duration));
        Some(event)
    }

    fn name(&self) -> &str {
        "job_sim"
    }
}
