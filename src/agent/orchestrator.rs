//! Multi-Agent Orchestration
//!
//! Runs several independent agents in a fixed order. Agents share nothing:
//! each keeps its own memory and context.

use std::time::Duration;
use tracing::info;

use super::Agent;

#[derive(Default)]
pub struct MultiAgentOrchestrator {
    agents: Vec<Agent>,
}

impl MultiAgentOrchestrator {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self { agents }
    }

    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name() == name)
    }

    pub fn agent_mut(&mut self, name: &str) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|a| a.name() == name)
    }

    /// One cycle of every agent, in order; returns events handled
    pub async fn run_once(&mut self) -> usize {
        let mut handled = 0;
        for agent in self.agents.iter_mut() {
            handled += agent.run_once().await;
        }
        handled
    }

    pub async fn run_forever(&mut self, poll_interval: Duration) {
        info!(
            "Orchestrating {} agent(s), polling every {:?}",
            self.agents.len(),
            poll_interval
        );
        loop {
            self.run_once().await;
            tokio::time::sleep(poll_interval).await;
        }
    }
}
