//! Agent Loop Integration Tests
//!
//! Full decision cycles with fake language models: orchestrator isolation,
//! last-record feedback semantics and the never-empty action list.

use async_trait::async_trait;
use autoremedy::agent::{JobSimSensor, LogFileSensor, OutcomeWeights, ReplaySensor};
use autoremedy::{
    Action, Agent, AgentError, Event, FeedbackStore, InMemoryStore, JobId, JobSpec, LanguageModel,
    LlmError, LlmReasoning, MultiAgentOrchestrator, NotifierEffector, Outcome, RecordFeedback,
    RemediationEffector, RemediationResult, RemediationRule, Resolver, RuleMatch, SelfReflection,
    SimpleReasoning,
};
use std::sync::Arc;

/// Always fails, like an unreachable LM Studio
struct OfflineModel;

#[async_trait]
impl LanguageModel for OfflineModel {
    async fn analyze_log(&self, _log_text: &str, _request_id: Option<&str>) -> Result<String, LlmError> {
        Err(LlmError::Status {
            status: 503,
            body: "model not loaded".to_string(),
        })
    }
}

/// Answers with a fixed suggestion
struct FixedModel(&'static str);

#[async_trait]
impl LanguageModel for FixedModel {
    async fn analyze_log(&self, _log_text: &str, _request_id: Option<&str>) -> Result<String, LlmError> {
        Ok(self.0.to_string())
    }
}

fn replay_agent(name: &str, events: Vec<Event>) -> Agent {
    Agent::new(name, Box::new(SimpleReasoning))
        .with_sensor(Box::new(ReplaySensor::new(events)))
        .with_effector(Box::new(NotifierEffector::new()))
}

#[tokio::test]
async fn test_orchestrated_agents_keep_disjoint_histories() {
    let mut orchestrator = MultiAgentOrchestrator::default()
        .with_agent(replay_agent("a", vec![Event::new(1, "fail"), Event::new(2, "fail")]))
        .with_agent(replay_agent("b", vec![Event::new(10, "slow")]));

    orchestrator.run_once().await;
    orchestrator.run_once().await;

    orchestrator
        .agent_mut("a")
        .unwrap()
        .feedback(RecordFeedback::new("ops", 1, Some("wrong call")))
        .unwrap();

    let a = orchestrator.agent("a").unwrap();
    let b = orchestrator.agent("b").unwrap();

    assert_eq!(a.history().len(), 2);
    assert_eq!(b.history().len(), 1);
    assert!(a.history()[1].feedback.is_some());
    assert!(b.history().iter().all(|r| r.feedback.is_none()));
    assert_eq!(b.history()[0].event.job_id.to_string(), "10");
}

#[tokio::test]
async fn test_feedback_targets_last_record_only() {
    let mut agent = replay_agent("fb", vec![]);
    agent.process_event(Event::new(1, "fail")).await;
    agent.process_event(Event::new(2, "stuck")).await;

    // Meant for job 1, but the direct API always lands on the newest record
    agent
        .feedback(RecordFeedback::new("alice", 2, Some("about job 1")))
        .unwrap();
    agent
        .feedback(RecordFeedback::new("bob", 5, None))
        .unwrap();

    let history = agent.history();
    assert!(history[0].feedback.is_none());
    let last = history[1].feedback.as_ref().unwrap();
    assert_eq!(last.user, "bob");
    assert_eq!(last.rating, 5);
    assert!(last.comment.is_none());
}

#[tokio::test]
async fn test_feedback_for_matches_event_id() {
    let mut agent = replay_agent("fb", vec![]);
    agent.process_event(Event::new(1, "fail")).await;
    agent.process_event(Event::new(2, "stuck")).await;

    agent
        .feedback_for("1", RecordFeedback::new("alice", 2, None))
        .unwrap();
    assert_eq!(agent.history()[0].feedback.as_ref().unwrap().user, "alice");
    assert!(agent.history()[1].feedback.is_none());

    assert!(matches!(
        agent.feedback_for("99", RecordFeedback::new("x", 1, None)),
        Err(AgentError::EventNotFound(_))
    ));
}

#[tokio::test]
async fn test_llm_outage_still_decides() {
    let events = vec![
        Event::new(1, "fail"),
        Event::new(2, "success"),
        Event::new("job-x", "degraded"),
        Event::new(3, "stuck").with_source("DiskMonitor"),
    ];
    let count = events.len();
    let mut agent = Agent::new("offline", Box::new(LlmReasoning::new(Arc::new(OfflineModel))))
        .with_sensor(Box::new(ReplaySensor::new(events)))
        .with_effector(Box::new(NotifierEffector::new()));

    agent.run_cycles(count, None).await;

    assert_eq!(agent.history().len(), count);
    for record in agent.history() {
        assert_eq!(record.actions, vec![Action::notify(&record.event, false)]);
        assert_eq!(record.outcomes, vec![Outcome::Done]);
    }
}

#[tokio::test]
async fn test_llm_escalation_and_remediation_flow() {
    let rules = Arc::new(vec![
        RemediationRule::new(
            RuleMatch {
                source: Some("DiskMonitor".to_string()),
                ..Default::default()
            },
            "clear_temp_files",
        ),
        RemediationRule::new(RuleMatch::default(), "generic_retry"),
    ]);
    let reasoning = LlmReasoning::new(Arc::new(FixedModel("Escalate to on-call.")))
        .with_rules(rules);

    let mut agent = Agent::new("llm", Box::new(reasoning))
        .with_effector(Box::new(NotifierEffector::new()))
        .with_effector(Box::new(RemediationEffector::default()));

    let disk = Event::new(2002, "fail")
        .with_source("DiskMonitor")
        .with_description("Disk full on /dev/sda1.");
    let record = agent.process_event(disk.clone()).await;

    assert_eq!(
        record.actions,
        vec![
            Action::notify(&disk, true),
            Action::remediate(&disk, "clear_temp_files"),
        ]
    );
    assert_eq!(
        record.outcomes,
        vec![
            Outcome::Done,
            Outcome::Skipped,
            Outcome::Skipped,
            Outcome::Remediation(RemediationResult::ClearedTempFiles),
        ]
    );

    // Catch-all rule names an action the resolver does not know
    let other = Event::new(2004, "fail").with_source("UnknownSource");
    let record = agent.process_event(other).await;
    assert_eq!(
        record.outcomes.last(),
        Some(&Outcome::Remediation(RemediationResult::Unknown))
    );
}

#[tokio::test]
async fn test_feedback_round_trip_and_clear() {
    let store = FeedbackStore::new(Arc::new(InMemoryStore::new()));
    let event = Event::new(1, "fail")
        .with_source("TestSource")
        .with_description("Disk full error");

    assert!(store.get_feedback(&event).await.unwrap().is_empty());

    store
        .store_feedback(&event, "clear_temp_files", "ineffective", Some("still full"))
        .await
        .unwrap();

    let entries = store.get_feedback(&event).await.unwrap();
    let last = entries.last().unwrap();
    assert_eq!(last.feedback, "ineffective");
    assert_eq!(last.action, "clear_temp_files");
    assert_eq!(last.comment.as_deref(), Some("still full"));

    store.clear(&event).await.unwrap();
    assert!(store.get_feedback(&event).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reflection_escalates_after_repeated_failures() {
    let events = vec![Event::new(1, "fail"), Event::new(2, "fail"), Event::new(3, "fail")];
    let mut agent = replay_agent("reflect", events).with_reflection(SelfReflection::new(3));

    agent.run_cycles(2, None).await;
    assert!(agent.context().is_empty());

    agent.run_once().await;
    assert_eq!(agent.context().get("escalate"), Some(&serde_json::json!(true)));

    agent
        .feedback(RecordFeedback::new("ops", 1, None))
        .unwrap();
    agent.run_once().await;
    assert_eq!(agent.context().get("review_strategy"), Some(&serde_json::json!(true)));
}

#[tokio::test]
async fn test_log_file_replay_through_agent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("events.jsonl");
    std::fs::write(
        &path,
        concat!(
            r#"{"event_id": 41, "level": "Crítico", "source": "Kernel-Power", "description": "Unexpected shutdown"}"#,
            "\n",
            r#"{"event_id": 42, "level": "Aviso", "source": "Disk", "description": "Slow I/O"}"#,
            "\n",
        ),
    )
    .unwrap();

    let mut agent = Agent::new("logs", Box::new(LlmReasoning::new(Arc::new(OfflineModel))))
        .with_sensor(Box::new(LogFileSensor::open(&path).await.unwrap()))
        .with_effector(Box::new(NotifierEffector::new()));

    agent.run_cycles(3, None).await;

    let history = agent.history();
    assert_eq!(history.len(), 2);
    // Critical entries carry the escalate flag, which survives an LLM outage
    assert!(history[0].actions[0].is_escalation());
    assert!(!history[1].actions[0].is_escalation());
}

#[tokio::test]
async fn test_retried_job_reruns_until_budget_escalates() {
    let job = JobSpec {
        id: JobId::from("nightly-etl"),
        expected_duration: 5.0,
        job_type: "Updater".to_string(),
    };
    let sensor = JobSimSensor::new(vec![job])
        .with_seed(11)
        .with_weights(OutcomeWeights {
            success: 0,
            fail: 1,
            stuck: 0,
            slow: 0,
        });
    let queue = sensor.queue();

    let rules = Arc::new(vec![RemediationRule::new(RuleMatch::default(), "retry")]);
    let reasoning = LlmReasoning::new(Arc::new(FixedModel("notify the owner"))).with_rules(rules);
    let remediation =
        RemediationEffector::new(Arc::new(Resolver::new(2))).with_requeue(queue.clone());

    let mut agent = Agent::new("jobs", Box::new(reasoning))
        .with_sensor(Box::new(sensor))
        .with_effector(Box::new(NotifierEffector::new()))
        .with_effector(Box::new(remediation));

    let handled = agent.run_cycles(10, None).await;

    assert_eq!(handled, 3);
    let results: Vec<_> = agent
        .history()
        .iter()
        .map(|record| record.outcomes.last().cloned())
        .collect();
    assert_eq!(
        results,
        vec![
            Some(Outcome::Remediation(RemediationResult::Retried)),
            Some(Outcome::Remediation(RemediationResult::Retried)),
            Some(Outcome::Remediation(RemediationResult::Escalate)),
        ]
    );
    assert!(agent
        .history()
        .iter()
        .all(|record| record.event.job_id.to_string() == "nightly-etl"));
    assert!(queue.is_empty());
}
