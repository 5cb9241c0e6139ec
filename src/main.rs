//! AutoRemedy - Entry Point
//!
//! Modes:
//! - Default / --demo: bounded agent run over simulated jobs
//! - --api / -a: HTTP API server
//! - --worker / -w: queue worker

use anyhow::{Context, Result};
use autoremedy::agent::{JobQueue, JobSimSensor, SimulatedSensor};
use autoremedy::api::server::shutdown_signal;
use autoremedy::{
    Agent, ApiServer, ApiState, ChatCompletionClient, Config, FeedbackStore, InMemoryStore,
    LanguageModel, ListStore, LlmReasoning, Memory, NotifierEffector, Policy, ReasoningMode,
    ReasoningModule, RecordFeedback, RedisStore, RemediationEffector, Resolver, SelfReflection,
    SimpleReasoning, Worker,
};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    // Parse args
    let args: Vec<String> = std::env::args().collect();
    let api_mode = args.iter().any(|a| a == "--api" || a == "-a");
    let worker_mode = args.iter().any(|a| a == "--worker" || a == "-w");
    let help_mode = args.iter().any(|a| a == "--help" || a == "-h");

    if help_mode {
        print_help();
        return Ok(());
    }

    init_logging()?;

    let config = Config::from_env()?;
    let policy = Policy::load(&config.policy_path)?;

    if api_mode {
        info!("AutoRemedy API v{}", env!("CARGO_PKG_VERSION"));
        run_api(&config, policy).await
    } else if worker_mode {
        info!("AutoRemedy Worker v{}", env!("CARGO_PKG_VERSION"));
        run_worker(&config, policy).await
    } else {
        info!("AutoRemedy Demo v{}", env!("CARGO_PKG_VERSION"));
        run_demo(&config, policy).await
    }
}

fn print_help() {
    println!("AutoRemedy v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: autoremedy [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --api, -a      Run the HTTP API server");
    println!("  --worker, -w   Run the queue worker");
    println!("  --demo         Run a bounded demo (default)");
    println!("  --help, -h     Show this help");
    println!();
    println!("Environment variables:");
    println!("  REDIS_URL                      Redis URL (or REDIS_HOST/REDIS_PORT/REDIS_DB)");
    println!("  LLM_ENDPOINT                   Chat completion endpoint (default: http://localhost:1234/v1)");
    println!("  LLM_MODEL                      Model name (default: llama-3)");
    println!("  LLM_PROMPT                     Log analysis prompt");
    println!("  LLM_TIMEOUT_SECS               LLM request timeout (default: 60)");
    println!("  AUTOREMEDY_CONFIG              Policy file (default: autoremedy.toml)");
    println!("  AUTOREMEDY_REASONING           llm | simple (default: llm)");
    println!("  AUTOREMEDY_POLL_INTERVAL_SECS  Agent polling delay (default: 5)");
    println!("  AUTOREMEDY_WORKER_IDLE_MS      Worker sleep on empty queue (default: 1000)");
    println!("  AUTOREMEDY_WORKER_BACKOFF_MS   Worker sleep after store errors (default: 5000)");
    println!("  AUTOREMEDY_MIN_FAILURES        Self-reflection threshold (default: 3)");
    println!("  AUTOREMEDY_MAX_RETRIES         Retry budget per job (default: 2)");
    println!("  AUTOREMEDY_MAX_EVENTS          Demo cycles (default: 5)");
    println!("  AUTOREMEDY_MEMORY_RETENTION    Worker in-process history size (default: 1000)");
    println!("  AUTOREMEDY_CONTEXT_ESCALATION  Honor reflected escalation (default: false)");
    println!("  API_BIND_ADDR / API_PORT       API address (default: 127.0.0.1:8000)");
    println!("  RUST_LOG                       trace | debug | info | warn | error");
    println!("  LOG_FORMAT                     json for JSON logs on stderr");
}

fn init_logging() -> Result<()> {
    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(())
}

fn build_llm(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    let client = ChatCompletionClient::new(config.llm.clone()).context("Failed to create LLM client")?;
    info!("LLM: {} at {}", config.llm.model, config.llm.endpoint);
    Ok(Arc::new(client))
}

fn build_reasoning(
    config: &Config,
    llm: Arc<dyn LanguageModel>,
    feedback: FeedbackStore,
    rules: Arc<Vec<autoremedy::RemediationRule>>,
) -> Box<dyn ReasoningModule> {
    match config.reasoning {
        ReasoningMode::Simple => Box::new(SimpleReasoning),
        ReasoningMode::Llm => Box::new(
            LlmReasoning::new(llm)
                .with_feedback(feedback)
                .with_rules(rules)
                .with_context_escalation(config.context_escalation),
        ),
    }
}

/// Agent with notifier and remediation effectors plus self-reflection
///
/// With a `requeue` queue, retried and restarted jobs run again.
fn build_agent(
    name: &str,
    config: &Config,
    store: Arc<dyn ListStore>,
    llm: Arc<dyn LanguageModel>,
    rules: Arc<Vec<autoremedy::RemediationRule>>,
    requeue: Option<JobQueue>,
) -> Agent {
    let resolver = Arc::new(Resolver::new(config.max_retries).with_llm(llm.clone()));
    let reasoning = build_reasoning(config, llm, FeedbackStore::new(store), rules);

    let mut remediation = RemediationEffector::new(resolver);
    if let Some(queue) = requeue {
        remediation = remediation.with_requeue(queue);
    }

    Agent::new(name, reasoning)
        .with_effector(Box::new(NotifierEffector::new()))
        .with_effector(Box::new(remediation))
        .with_reflection(SelfReflection::new(config.min_failures))
}

async fn run_api(config: &Config, policy: Policy) -> Result<()> {
    let store: Arc<dyn ListStore> = Arc::new(
        RedisStore::connect(&config.redis_url)
            .await
            .context("Failed to connect to Redis")?,
    );
    let llm = build_llm(config)?;
    let resolver = Arc::new(Resolver::new(config.max_retries).with_llm(llm.clone()));

    let state = ApiState::new(store, llm)
        .with_rules(Arc::new(policy.remediation_rules))
        .with_resolver(resolver);

    ApiServer::new(config.api_addr()?, state).run().await
}

async fn run_worker(config: &Config, policy: Policy) -> Result<()> {
    let store: Arc<dyn ListStore> = Arc::new(
        RedisStore::connect(&config.redis_url)
            .await
            .context("Failed to connect to Redis")?,
    );
    let llm = build_llm(config)?;
    let agent = build_agent(
        "worker",
        config,
        store.clone(),
        llm,
        Arc::new(policy.remediation_rules),
        None,
    )
    .with_memory(Memory::with_retention(config.memory_retention));

    let mut worker = Worker::new(agent, store)
        .with_idle(config.worker_idle)
        .with_backoff(config.worker_backoff);

    tokio::select! {
        _ = worker.run() => {}
        _ = shutdown_signal() => {}
    }
    info!("Worker stopped after {} event(s)", worker.agent().memory().len());
    Ok(())
}

async fn run_demo(config: &Config, policy: Policy) -> Result<()> {
    let store: Arc<dyn ListStore> = match RedisStore::connect(&config.redis_url).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("Redis unavailable ({}), keeping feedback in memory", e);
            Arc::new(InMemoryStore::new())
        }
    };
    let llm = build_llm(config)?;

    let rules = Arc::new(policy.remediation_rules);
    let mut agent = if policy.jobs.is_empty() {
        build_agent("demo", config, store, llm, rules, None)
            .with_sensor(Box::new(SimulatedSensor::new()))
    } else {
        info!("Simulating {} configured job(s)", policy.jobs.len());
        let sensor = JobSimSensor::new(policy.jobs);
        let queue = sensor.queue();
        build_agent("demo", config, store, llm, rules, Some(queue)).with_sensor(Box::new(sensor))
    };

    let handled = agent.run_cycles(config.max_events, None).await;
    info!("Demo finished: {} event(s) over {} cycle(s)", handled, config.max_events);

    println!("\nAgent stopped. Event/action history:");
    println!("{}", serde_json::to_string_pretty(agent.history())?);

    if agent
        .feedback(RecordFeedback::new("admin", 5, Some("Handled well")))
        .is_ok()
    {
        println!("\nFeedback added to last record:");
        if let Some(last) = agent.memory().last() {
            println!("{}", serde_json::to_string_pretty(last)?);
        }
    }

    Ok(())
}
