// Crash recovery: settle jobs a dead daemon left behind
use crate::domain::{Job, JobState, TaskState};
use crate::error::Result;
use crate::port::{JobInventory, QueueInventory, TimeProvider};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::application::worker::constants::DEFAULT_RECOVERY_WINDOW_MS;

/// Detail recorded on RUNNING jobs abandoned by a crashed worker
pub const WORKER_CRASHED_DETAIL: &str = "Aborted: worker crashed";

/// Detail recorded on QUEUED jobs that never reached a queue
pub const UNASSIGNED_DETAIL: &str = "SubmissionFailed: no queue assignment";

/// Detail recorded on QUEUED jobs whose task was taken but never claimed
pub const ABANDONED_TASK_DETAIL: &str = "Aborted: task taken but never claimed";

/// Crash recovery service
///
/// Runs once on daemon startup, before workers are spawned.
pub struct RecoveryService {
    job_inventory: Arc<dyn JobInventory>,
    queue_inventory: Arc<dyn QueueInventory>,
    time_provider: Arc<dyn TimeProvider>,
    recovery_window_ms: i64,
}

impl RecoveryService {
    /// # Arguments
    /// * `recovery_window_ms` - Optional custom recovery window (default: 5 minutes)
    pub fn new(
        job_inventory: Arc<dyn JobInventory>,
        queue_inventory: Arc<dyn QueueInventory>,
        time_provider: Arc<dyn TimeProvider>,
        recovery_window_ms: Option<i64>,
    ) -> Self {
        Self {
            job_inventory,
            queue_inventory,
            time_provider,
            recovery_window_ms: recovery_window_ms.unwrap_or(DEFAULT_RECOVERY_WINDOW_MS),
        }
    }

    /// Fail orphaned jobs
    ///
    /// 1. RUNNING jobs with `started_at < now - recovery_window` (or no `started_at`)
    /// 2. QUEUED jobs without a queue assignment (compensation never landed)
    /// 3. QUEUED jobs whose task already left PENDING (a worker took it and died
    ///    before the claim); the task is acknowledged as well
    ///
    /// # Returns
    /// Number of jobs recovered
    pub async fn recover_orphaned_jobs(&self) -> Result<usize> {
        let now = self.time_provider.now_millis();
        let cutoff = now - self.recovery_window_ms;

        info!(
            cutoff_time = %cutoff,
            recovery_window_ms = %self.recovery_window_ms,
            "Starting orphaned job recovery"
        );

        let mut recovered_count = 0;

        for job in self.job_inventory.find_by_state(JobState::Running).await? {
            let stale = match job.started_at {
                Some(started_at) => started_at < cutoff,
                None => {
                    warn!(job_id = %job.id, "RUNNING job without started_at");
                    true
                }
            };
            if stale && self.fail(&job, WORKER_CRASHED_DETAIL).await {
                recovered_count += 1;
            }
        }

        for job in self.job_inventory.find_by_state(JobState::Queued).await? {
            let recovered = match self.queue_inventory.assignment(&job.id).await? {
                None => self.fail(&job, UNASSIGNED_DETAIL).await,
                Some(assignment) if assignment.task_state != TaskState::Pending => {
                    warn!(
                        job_id = %job.id,
                        task_id = %assignment.task_id,
                        task_state = %assignment.task_state,
                        "QUEUED job lost its task"
                    );
                    if let Err(e) = self.queue_inventory.acknowledge(&assignment.task_id).await {
                        warn!(task_id = %assignment.task_id, "Acknowledge failed: {}", e);
                    }
                    self.fail(&job, ABANDONED_TASK_DETAIL).await
                }
                Some(_) => false,
            };
            if recovered {
                recovered_count += 1;
            }
        }

        info!(recovered_count = %recovered_count, "Orphaned job recovery complete");
        Ok(recovered_count)
    }

    /// Returns false when the job moved on in the meantime
    async fn fail(&self, job: &Job, detail: &str) -> bool {
        match self
            .job_inventory
            .update_status(&job.id, JobState::Failed, Some(detail))
            .await
        {
            Ok(_) => {
                info!(job_id = %job.id, from = %job.state, detail, "Recovered orphaned job");
                true
            }
            Err(e) if e.is_transition_rejected() => false,
            Err(e) => {
                error!(job_id = %job.id, error = %e, "Failed to recover job");
                false
            }
        }
    }
}
