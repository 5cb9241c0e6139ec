//! Reasoning Modules
//!
//! Turn an event plus the agent context into an ordered action list.
//!
//! - [`SimpleReasoning`]: status-only rule, no I/O
//! - [`LlmReasoning`]: language-model suggestion, feedback history and
//!   remediation rules combined; never returns an empty list

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use super::AgentContext;
use crate::action::Action;
use crate::event::{Event, JobStatus};
use crate::feedback::{enrich_prompt, FeedbackStore};
use crate::llm::{suggestion_text, LanguageModel};
use crate::remediation::{find_remediation_action, RemediationRule};

/// Decides what to do about an event
#[async_trait]
pub trait ReasoningModule: Send + Sync {
    async fn decide(&self, event: &Event, context: &AgentContext) -> Vec<Action>;
}

// ===== Simple =====

/// fail/stuck escalate, everything else is a plain notification
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleReasoning;

#[async_trait]
impl ReasoningModule for SimpleReasoning {
    async fn decide(&self, event: &Event, _context: &AgentContext) -> Vec<Action> {
        let escalation = matches!(event.status, JobStatus::Fail | JobStatus::Stuck);
        vec![Action::notify(event, escalation)]
    }
}

// ===== LLM-backed =====

/// Language-model reasoning with feedback enrichment and rule cross-check
pub struct LlmReasoning {
    llm: Arc<dyn LanguageModel>,
    feedback: Option<FeedbackStore>,
    rules: Arc<Vec<RemediationRule>>,
    honor_context_escalation: bool,
}

impl LlmReasoning {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            feedback: None,
            rules: Arc::new(Vec::new()),
            honor_context_escalation: false,
        }
    }

    /// Enrich prompts with feedback for similar events
    pub fn with_feedback(mut self, feedback: FeedbackStore) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn with_rules(mut self, rules: Arc<Vec<RemediationRule>>) -> Self {
        self.rules = rules;
        self
    }

    /// Treat `context["escalate"] == true` as an escalation signal
    pub fn with_context_escalation(mut self, enabled: bool) -> Self {
        self.honor_context_escalation = enabled;
        self
    }

    /// Plain-text description fed to the model
    pub fn describe(event: &Event) -> String {
        let mut text = format!("Job {} encountered status: {}", event.job_id, event.status);
        if let Some(source) = event.source() {
            text.push_str(&format!(" (source: {})", source));
        }
        if let Some(description) = event.description() {
            text.push_str(&format!(": {}", description));
        }
        text
    }

    async fn build_log_text(&self, event: &Event) -> String {
        let description = Self::describe(event);
        let Some(store) = &self.feedback else {
            return description;
        };

        match store.get_feedback(event).await {
            Ok(entries) => enrich_prompt(&description, &entries),
            Err(e) => {
                warn!("Feedback lookup failed for job {}: {}", event.job_id, e);
                description
            }
        }
    }

    fn context_escalation(&self, context: &AgentContext) -> bool {
        self.honor_context_escalation
            && context.get("escalate").and_then(|v| v.as_bool()) == Some(true)
    }
}

#[async_trait]
impl ReasoningModule for LlmReasoning {
    async fn decide(&self, event: &Event, context: &AgentContext) -> Vec<Action> {
        let log_text = self.build_log_text(event).await;
        let job_id = event.job_id.to_string();
        let suggestion = suggestion_text(self.llm.analyze_log(&log_text, Some(&job_id)).await);
        let lowered = suggestion.to_lowercase();

        let mut actions = Vec::new();

        if lowered.contains("escalate")
            || event.requests_escalation()
            || self.context_escalation(context)
        {
            actions.push(Action::notify(event, true));
        } else if lowered.contains("notify") {
            actions.push(Action::notify(event, false));
        }

        if let Some(remediation) = find_remediation_action(event, &self.rules) {
            actions.push(Action::remediate(event, remediation));
        }

        if actions.is_empty() {
            actions.push(Action::notify(event, false));
        }

        debug!(
            "Job {}: {} action(s) [{}]",
            job_id,
            actions.len(),
            actions.iter().map(Action::kind).collect::<Vec<_>>().join(", ")
        );
        actions
    }
}
