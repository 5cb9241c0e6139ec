//! AutoRemedy
//!
//! Agentic job monitoring: observe job events, decide whether to notify,
//! escalate or remediate, record what happened and learn from human
//! feedback.
//!
//! # Features
//!
//! - **Agent loop**: sensors → reasoning → effectors → memory → self-reflection
//! - **Reasoning**: status rules or a local LLM (LM Studio) with feedback-enriched prompts
//! - **Remediation rules**: first-match TOML rules mapped to retry/restart/cleanup actions
//! - **Feedback store**: ratings grouped by a SHA256 key over similar events
//! - **HTTP API**: event submission, history, feedback and JSON-RPC tools
//! - **Queue worker**: Redis-backed event queue and history log
//!
//! # Architecture
//!
//! ```text
//! POST /event ──► agentic:events ──► Worker ──► Agent ──► agentic:history
//!                   (Redis list)                  │
//!                                                 ├── Reasoning (Simple / LLM)
//!                                                 ├── Remediation rules
//!                                                 ├── Effectors (notify / remediate)
//!                                                 ├── Memory
//!                                                 └── Self-reflection
//! ```

pub mod action;
pub mod agent;
pub mod api;
pub mod config;
pub mod event;
pub mod feedback;
pub mod llm;
pub mod memory;
pub mod remediation;
pub mod store;
pub mod worker;

pub use action::{Action, Outcome, RemediationResult};
pub use agent::{
    Agent, AgentContext, AgentError, Effector, LlmReasoning, MultiAgentOrchestrator,
    NotifierEffector, ReasoningModule, RemediationEffector, SelfReflection, Sensor,
    SimpleReasoning,
};
pub use api::{api_router, ApiError, ApiServer, ApiState};
pub use config::{Config, JobSpec, Policy, ReasoningMode};
pub use event::{Event, EventDetails, JobId, JobStatus};
pub use feedback::{enrich_prompt, FeedbackEntry, FeedbackStore};
pub use llm::{suggestion_text, ChatCompletionClient, LanguageModel, LlmClientConfig, LlmError};
pub use memory::{HistoryRecord, Memory, RecordFeedback};
pub use remediation::{find_remediation_action, RemediationRule, Resolver, RuleMatch};
pub use store::{InMemoryStore, ListStore, RedisStore, StoreError};
pub use worker::{Tick, Worker};
