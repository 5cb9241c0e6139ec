//! Queue Worker
//!
//! Pops events submitted through the API off the shared queue, runs them
//! through an agent and appends the resulting history records to the
//! shared history log.
//!
//! Nothing that goes wrong with a single event stops the loop: store
//! errors back off, bad payloads are dropped.
//!
//! Self-reflection reads the tail of the shared history log rather than the
//! agent's own memory, so ratings posted to `/feedback` feed back into it.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::agent::Agent;
use crate::event::Event;
use crate::memory::HistoryRecord;
use crate::store::{ListStore, EVENT_QUEUE_KEY, HISTORY_KEY};

/// Result of one worker tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// An event was processed and recorded
    Processed,
    /// The queue was empty
    Idle,
    /// The payload did not parse and was discarded
    Dropped,
    /// The store could not be reached
    TransportError,
}

pub struct Worker {
    agent: Agent,
    store: Arc<dyn ListStore>,
    idle: Duration,
    backoff: Duration,
}

impl Worker {
    pub fn new(agent: Agent, store: Arc<dyn ListStore>) -> Self {
        Self {
            agent,
            store,
            idle: Duration::from_secs(1),
            backoff: Duration::from_secs(5),
        }
    }

    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Pop and handle at most one queued event
    pub async fn tick(&mut self) -> Tick {
        let payload = match self.store.pop_front(EVENT_QUEUE_KEY).await {
            Ok(Some(payload)) => payload,
            Ok(None) => return Tick::Idle,
            Err(e) => {
                error!("Failed to read event queue: {}", e);
                return Tick::TransportError;
            }
        };

        let event: Event = match serde_json::from_str(&payload) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping malformed event payload ({}): {}", e, payload);
                return Tick::Dropped;
            }
        };

        info!("Processing event for job {} ({})", event.job_id, event.status);
        let record = self.agent.process_event(event).await;
        let record_json = match serde_json::to_string(record) {
            Ok(json) => Some(json),
            Err(e) => {
                error!("Failed to serialize history record: {}", e);
                None
            }
        };

        let mut shared = false;
        if let Some(json) = record_json {
            match self.store.push(HISTORY_KEY, &json).await {
                Ok(()) => shared = true,
                Err(e) => error!("Failed to append history record: {}", e),
            }
        }

        if !(shared && self.reflect_on_shared_history().await) {
            self.agent.reflect();
        }
        Tick::Processed
    }

    /// Reflect over the tail of the shared history log, so feedback
    /// submitted over HTTP is seen. Returns false if the log could not be read.
    async fn reflect_on_shared_history(&mut self) -> bool {
        let Some(window) = self.agent.reflection_window() else {
            return true;
        };

        let entries = match self.store.tail(HISTORY_KEY, window).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read history tail, reflecting on local memory: {}", e);
                return false;
            }
        };
        let records: Vec<HistoryRecord> = entries
            .iter()
            .filter_map(|entry| serde_json::from_str(entry).ok())
            .collect();

        self.agent.reflect_on(&records);
        true
    }

    /// Process the queue until the process is stopped
    pub async fn run(&mut self) {
        info!("Worker started, reading {}", EVENT_QUEUE_KEY);
        loop {
            match self.tick().await {
                Tick::Idle => {
                    debug!("Queue empty, sleeping {:?}", self.idle);
                    tokio::time::sleep(self.idle).await;
                }
                Tick::TransportError => tokio::time::sleep(self.backoff).await,
                Tick::Processed | Tick::Dropped => {}
            }
        }
    }
}
