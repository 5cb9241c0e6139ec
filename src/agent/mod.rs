//! Agent Decision Loop
//!
//! One agent cycle runs Sensing → Deciding → Acting → Recording → Reflecting:
//! - Sensors are polled once each, in registration order
//! - The reasoning module turns each event into actions
//! - Every action goes to every effector (action-major, effector-minor)
//! - The event, actions and outcomes are appended to memory
//! - Self-reflection inspects memory and updates the shared context
//!
//! Agents own their memory and context outright; the orchestrator runs
//! several of them side by side without sharing anything.

pub mod effectors;
pub mod orchestrator;
pub mod reasoning;
pub mod reflection;
pub mod sensors;

pub use effectors::{NotifierEffector, RemediationEffector, ESCALATION_LOG_TARGET};
pub use orchestrator::MultiAgentOrchestrator;
pub use reasoning::{LlmReasoning, ReasoningModule, SimpleReasoning};
pub use reflection::SelfReflection;
pub use sensors::{
    JobQueue, JobSimSensor, LogFileSensor, OutcomeWeights, ReplaySensor, SimulatedSensor,
};

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::action::{Action, Outcome};
use crate::event::Event;
use crate::memory::{HistoryRecord, Memory, RecordFeedback};

/// Shared mutable context, written only by self-reflection
pub type AgentContext = BTreeMap<String, serde_json::Value>;

/// Source of observations
#[async_trait]
pub trait Sensor: Send {
    /// Next observation, or `None` when there is nothing this tick
    async fn poll(&mut self) -> Option<Event>;

    fn name(&self) -> &str;
}

/// Performs the side effect of an action
#[async_trait]
pub trait Effector: Send {
    async fn execute(&mut self, action: &Action) -> Outcome;

    fn name(&self) -> &str;
}

/// Error types for agent feedback
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("no history to attach feedback to")]
    NoHistory,

    #[error("no history record for event '{0}'")]
    EventNotFound(String),
}

/// A single sensing/deciding/acting agent
pub struct Agent {
    name: String,
    sensors: Vec<Box<dyn Sensor>>,
    effectors: Vec<Box<dyn Effector>>,
    reasoning: Box<dyn ReasoningModule>,
    memory: Memory,
    context: AgentContext,
    reflection: Option<SelfReflection>,
}

impl Agent {
    pub fn new(name: &str, reasoning: Box<dyn ReasoningModule>) -> Self {
        Self {
            name: name.to_string(),
            sensors: Vec::new(),
            effectors: Vec::new(),
            reasoning,
            memory: Memory::new(),
            context: AgentContext::new(),
            reflection: None,
        }
    }

    pub fn with_sensor(mut self, sensor: Box<dyn Sensor>) -> Self {
        self.sensors.push(sensor);
        self
    }

    pub fn with_effector(mut self, effector: Box<dyn Effector>) -> Self {
        self.effectors.push(effector);
        self
    }

    pub fn with_reflection(mut self, reflection: SelfReflection) -> Self {
        self.reflection = Some(reflection);
        self
    }

    /// Start from an existing memory instead of an empty one
    pub fn with_memory(mut self, memory: Memory) -> Self {
        self.memory = memory;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn history(&self) -> &[HistoryRecord] {
        self.memory.history()
    }

    pub fn context(&self) -> &AgentContext {
        &self.context
    }

    /// One full cycle; returns the number of events handled
    pub async fn run_once(&mut self) -> usize {
        let mut handled = 0;

        for i in 0..self.sensors.len() {
            let Some(event) = self.sensors[i].poll().await else {
                continue;
            };
            debug!(
                "[{}] {} produced job {} ({})",
                self.name,
                self.sensors[i].name(),
                event.job_id,
                event.status
            );
            self.process_event(event).await;
            handled += 1;
        }

        self.reflect();
        handled
    }

    /// Decide, act and record for a single event
    pub async fn process_event(&mut self, event: Event) -> &HistoryRecord {
        let actions = self.reasoning.decide(&event, &self.context).await;

        let mut outcomes = Vec::with_capacity(actions.len() * self.effectors.len());
        for action in &actions {
            for effector in self.effectors.iter_mut() {
                outcomes.push(effector.execute(action).await);
            }
        }

        self.memory.record(event, actions, outcomes)
    }

    /// Run self-reflection over the full history and merge its suggestions
    pub fn reflect(&mut self) -> AgentContext {
        let Some(reflection) = &self.reflection else {
            return AgentContext::new();
        };
        if self.memory.is_empty() {
            return AgentContext::new();
        }

        let suggestions = reflection.reflect(self.memory.history());
        self.apply_suggestions(suggestions)
    }

    /// Reflect over records kept outside this agent, e.g. a shared history log
    pub fn reflect_on(&mut self, history: &[HistoryRecord]) -> AgentContext {
        let Some(reflection) = &self.reflection else {
            return AgentContext::new();
        };
        if history.is_empty() {
            return AgentContext::new();
        }

        let suggestions = reflection.reflect(history);
        self.apply_suggestions(suggestions)
    }

    /// Trailing records self-reflection looks at, if reflection is enabled
    pub fn reflection_window(&self) -> Option<usize> {
        self.reflection.as_ref().map(SelfReflection::min_failures)
    }

    fn apply_suggestions(&mut self, suggestions: AgentContext) -> AgentContext {
        if !suggestions.is_empty() {
            info!("[{}] Self-reflection suggests {:?}", self.name, suggestions);
        }
        for (key, value) in &suggestions {
            self.context.insert(key.clone(), value.clone());
        }
        suggestions
    }

    /// Run a bounded number of cycles, sleeping `delay` between them
    pub async fn run_cycles(&mut self, cycles: usize, delay: Option<Duration>) -> usize {
        let mut handled = 0;
        for cycle in 0..cycles {
            handled += self.run_once().await;
            if let Some(delay) = delay {
                if cycle + 1 < cycles {
                    tokio::time::sleep(delay).await;
                }
            }
        }
        handled
    }

    /// Poll until the process is stopped
    pub async fn run_forever(&mut self, poll_interval: Duration) {
        info!("[{}] Polling every {:?}", self.name, poll_interval);
        loop {
            self.run_once().await;
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Attach feedback to the most recent record
    ///
    /// This always targets the last record, whichever event the caller had
    /// in mind. Use [`Agent::feedback_for`] to target a specific event.
    pub fn feedback(&mut self, feedback: RecordFeedback) -> Result<(), AgentError> {
        if self.memory.attach_to_last(feedback) {
            Ok(())
        } else {
            Err(AgentError::NoHistory)
        }
    }

    /// Attach feedback to the first record whose job id equals `event_id`
    pub fn feedback_for(&mut self, event_id: &str, feedback: RecordFeedback) -> Result<(), AgentError> {
        if self.memory.is_empty() {
            return Err(AgentError::NoHistory);
        }
        if self.memory.attach_to_event(event_id, feedback) {
            Ok(())
        } else {
            Err(AgentError::EventNotFound(event_id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::RemediationResult;

    /// Records every action it sees and answers with a fixed outcome
    struct Recorder {
        label: &'static str,
        seen: std::sync::Arc<parking_lot::Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Effector for Recorder {
        async fn execute(&mut self, action: &Action) -> Outcome {
            self.seen
                .lock()
                .push(format!("{}:{}", self.label, action.kind()));
            Outcome::Done
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    struct TwoActions;

    #[async_trait]
    impl ReasoningModule for TwoActions {
        async fn decide(&self, event: &Event, _context: &AgentContext) -> Vec<Action> {
            vec![Action::notify(event, true), Action::remediate(event, "retry")]
        }
    }

    #[tokio::test]
    async fn test_action_major_effector_minor_dispatch() {
        let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
        let mut agent = Agent::new("test", Box::new(TwoActions))
            .with_sensor(Box::new(ReplaySensor::new(vec![Event::new(1, "fail")])))
            .with_effector(Box::new(Recorder { label: "a", seen: seen.clone() }))
            .with_effector(Box::new(Recorder { label: "b", seen: seen.clone() }));

        assert_eq!(agent.run_once().await, 1);

        assert_eq!(
            *seen.lock(),
            vec!["a:notify", "b:notify", "a:remediate", "b:remediate"]
        );
        let record = agent.memory().last().unwrap();
        assert_eq!(record.actions.len(), 2);
        assert_eq!(record.outcomes.len(), 4);
    }

    #[tokio::test]
    async fn test_no_event_no_record() {
        let mut agent = Agent::new("idle", Box::new(SimpleReasoning))
            .with_sensor(Box::new(ReplaySensor::new(vec![])))
            .with_effector(Box::new(NotifierEffector::new()));

        assert_eq!(agent.run_once().await, 0);
        assert!(agent.memory().is_empty());
    }

    #[tokio::test]
    async fn test_records_in_arrival_order() {
        let mut agent = Agent::new("order", Box::new(SimpleReasoning))
            .with_sensor(Box::new(ReplaySensor::new(vec![Event::new(1, "fail")])))
            .with_sensor(Box::new(ReplaySensor::new(vec![Event::new(2, "slow")])));

        agent.run_once().await;

        let ids: Vec<String> = agent.history().iter().map(|r| r.event.job_id.to_string()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        // No effectors: actions are still recorded, outcomes are empty
        assert_eq!(agent.history()[0].actions.len(), 1);
        assert!(agent.history()[0].outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_reflection_updates_context() {
        let events = vec![Event::new(1, "fail"), Event::new(2, "fail")];
        let mut agent = Agent::new("reflective", Box::new(SimpleReasoning))
            .with_sensor(Box::new(ReplaySensor::new(events)))
            .with_reflection(SelfReflection::new(2));

        agent.run_once().await;
        assert!(agent.context().get("escalate").is_none());

        agent.run_once().await;
        assert_eq!(agent.context().get("escalate"), Some(&serde_json::json!(true)));
    }

    #[tokio::test]
    async fn test_remediation_outcome_recorded() {
        let mut agent = Agent::new("fixer", Box::new(TwoActions))
            .with_effector(Box::new(RemediationEffector::default()));

        let record = agent.process_event(Event::new(3, "fail")).await;
        assert_eq!(
            record.outcomes,
            vec![Outcome::Skipped, Outcome::Remediation(RemediationResult::Retried)]
        );
    }

    #[test]
    fn test_feedback_errors() {
        let mut agent = Agent::new("empty", Box::new(SimpleReasoning));
        assert!(matches!(
            agent.feedback(RecordFeedback::new("u", 1, None)),
            Err(AgentError::NoHistory)
        ));
        assert!(matches!(
            agent.feedback_for("1", RecordFeedback::new("u", 1, None)),
            Err(AgentError::NoHistory)
        ));
    }

    #[tokio::test]
    async fn test_feedback_for_unknown_event() {
        let mut agent = Agent::new("fb", Box::new(SimpleReasoning));
        agent.process_event(Event::new(1, "fail")).await;

        assert!(matches!(
            agent.feedback_for("2", RecordFeedback::new("u", 1, None)),
            Err(AgentError::EventNotFound(id)) if id == "2"
        ));
        assert!(agent.feedback_for("1", RecordFeedback::new("u", 4, None)).is_ok());
        assert_eq!(agent.history()[0].feedback.as_ref().unwrap().rating, 4);
    }
}
