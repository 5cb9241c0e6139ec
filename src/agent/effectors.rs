//! Effectors
//!
//! Each effector handles one action kind and skips the other, so an agent
//! can register both and dispatch every action to every effector.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::Effector;
use super::sensors::JobQueue;
use crate::action::{Action, Outcome, RemediationResult};
use crate::remediation::Resolver;

/// Log target for escalation notices
pub const ESCALATION_LOG_TARGET: &str = "escalation";

/// Handles `notify`
#[derive(Debug, Default, Clone, Copy)]
pub struct NotifierEffector;

impl NotifierEffector {
    pub fn new() -> Self {
        Self
    }

    /// Emit the notification for `action`; anything but `notify` is skipped
    pub fn notify(action: &Action) -> Outcome {
        match action {
            Action::Notify { job, escalation: true } => {
                warn!(
                    target: ESCALATION_LOG_TARGET,
                    "ESCALATION: Manual intervention required for job {} (status: {})",
                    job.job_id,
                    job.status
                );
                Outcome::Done
            }
            Action::Notify { job, escalation: false } => {
                info!(
                    "Notification: Issue detected and handled for job {} (status: {})",
                    job.job_id, job.status
                );
                Outcome::Done
            }
            Action::Remediate { .. } => Outcome::Skipped,
        }
    }
}

#[async_trait]
impl Effector for NotifierEffector {
    async fn execute(&mut self, action: &Action) -> Outcome {
        Self::notify(action)
    }

    fn name(&self) -> &str {
        "notifier"
    }
}

/// Handles `remediate` through a shared [`Resolver`]
pub struct RemediationEffector {
    resolver: Arc<Resolver>,
    requeue: Option<JobQueue>,
}

impl RemediationEffector {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self {
            resolver,
            requeue: None,
        }
    }

    /// Put retried or restarted jobs back on a simulator queue
    pub fn with_requeue(mut self, queue: JobQueue) -> Self {
        self.requeue = Some(queue);
        self
    }
}

impl Default for RemediationEffector {
    fn default() -> Self {
        Self::new(Arc::new(Resolver::default()))
    }
}

#[async_trait]
impl Effector for RemediationEffector {
    async fn execute(&mut self, action: &Action) -> Outcome {
        match action {
            Action::Remediate { job, remediation } => {
                let result = self.resolver.execute(remediation, job).await;
                if matches!(result, RemediationResult::Retried | RemediationResult::Restarted) {
                    if let Some(queue) = &self.requeue {
                        if queue.requeue(&job.job_id.to_string()) {
                            debug!("Job {} queued to run again", job.job_id);
                        }
                    }
                }
                Outcome::Remediation(result)
            }
            Action::Notify { .. } => Outcome::Skipped,
        }
    }

    fn name(&self) -> &str {
        "remediation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JobSpec;
    use crate::event::{Event, JobId};

    #[tokio::test]
    async fn test_notifier_handles_notify_only() {
        let event = Event::new(1, "fail");
        let mut notifier = NotifierEffector::new();

        assert_eq!(notifier.execute(&Action::notify(&event, true)).await, Outcome::Done);
        assert_eq!(notifier.execute(&Action::notify(&event, false)).await, Outcome::Done);
        assert_eq!(
            notifier.execute(&Action::remediate(&event, "retry")).await,
            Outcome::Skipped
        );
    }

    #[tokio::test]
    async fn test_remediation_effector() {
        let event = Event::new(1, "fail");
        let resolver = Arc::new(Resolver::new(0));
        let mut effector = RemediationEffector::new(resolver);

        assert_eq!(effector.execute(&Action::notify(&event, true)).await, Outcome::Skipped);
        assert_eq!(
            effector.execute(&Action::remediate(&event, "restart_service")).await,
            Outcome::Remediation(RemediationResult::Restarted)
        );
        // Zero retry budget escalates immediately
        assert_eq!(
            effector.execute(&Action::remediate(&event, "retry")).await,
            Outcome::Remediation(RemediationResult::Escalate)
        );
        assert_eq!(
            effector.execute(&Action::remediate(&event, "reboot_planet")).await,
            Outcome::Remediation(RemediationResult::Unknown)
        );
    }

    #[tokio::test]
    async fn test_remediation_effector_requeues_reruns() {
        let queue = JobQueue::new(vec![JobSpec {
            id: JobId::Number(4),
            expected_duration: 1.0,
            job_type: "Updater".to_string(),
        }]);
        let mut effector =
            RemediationEffector::new(Arc::new(Resolver::new(1))).with_requeue(queue.clone());
        let event = Event::new(4, "fail");
        assert!(queue.pop().is_some());

        assert_eq!(
            effector.execute(&Action::remediate(&event, "clear_queue")).await,
            Outcome::Remediation(RemediationResult::ClearedQueue)
        );
        assert!(queue.is_empty());

        effector.execute(&Action::remediate(&event, "retry")).await;
        assert_eq!(queue.pop().map(|job| job.id), Some(JobId::Number(4)));

        // Budget spent: escalated, not re-run
        assert_eq!(
            effector.execute(&Action::remediate(&event, "retry")).await,
            Outcome::Remediation(RemediationResult::Escalate)
        );
        assert!(queue.is_empty());

        effector.execute(&Action::remediate(&event, "restart_service")).await;
        assert_eq!(queue.len(), 1);
    }
}
