// Worker - task execution loop bound to one queue

mod completion;
pub mod constants;
mod shutdown;

use constants::*;
pub use completion::{completion_channel, Completer, Completion, CompletionSink, NoopSink};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::processor::Processor;
use crate::domain::{JobId, JobState, Task, TaskId};
use crate::error::{AppError, Result};
use crate::port::{JobInventory, ProcessingError, QueueInventory, TransformReport};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Worker processes tasks from one queue with one processor.
///
/// Holds no state between tasks and at most one task at a time.
pub struct Worker {
    queue: String,
    job_inventory: Arc<dyn JobInventory>,
    queue_inventory: Arc<dyn QueueInventory>,
    processor: Arc<dyn Processor>,
    completions: Arc<dyn CompletionSink>,
}

impl Worker {
    pub fn new(
        queue: impl Into<String>,
        job_inventory: Arc<dyn JobInventory>,
        queue_inventory: Arc<dyn QueueInventory>,
        processor: Arc<dyn Processor>,
        completions: Arc<dyn CompletionSink>,
    ) -> Self {
        Self {
            queue: queue.into(),
            job_inventory,
            queue_inventory,
            processor,
            completions,
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Run worker loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(queue = %self.queue, category = %self.processor.category(), "Worker started");
        loop {
            if shutdown.is_shutdown() {
                info!(queue = %self.queue, "Worker shutting down");
                break;
            }
            match self.process_next_task().await {
                Ok(true) => {}
                Ok(false) => {
                    tokio::select! {
                        _ = sleep(IDLE_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!(queue = %self.queue, "Worker interrupted during idle");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!(queue = %self.queue, "Worker error: {}", e);
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!(queue = %self.queue, "Worker interrupted during error recovery");
                            break;
                        }
                    }
                }
            }
        }
        info!(queue = %self.queue, "Worker stopped");
        Ok(())
    }

    /// Process the next task of the queue (returns true if a task was taken)
    pub async fn process_next_task(&self) -> Result<bool> {
        let task = match self.queue_inventory.try_dequeue(&self.queue).await {
            Ok(Some(t)) => t,
            Ok(None) => return Ok(false),
            Err(AppError::UnreadableTask {
                task_id,
                job_id,
                reason,
            }) => {
                error!(job_id = %job_id, task_id = %task_id, "Unreadable task: {}", reason);
                self.abandon(&job_id, &task_id, format!("unreadable task payload: {}", reason))
                    .await;
                return Ok(true);
            }
            Err(e) => return Err(e),
        };
        let job_id = task.payload.job_id.clone();

        // Claim: QUEUED -> RUNNING succeeds for exactly one worker
        match self
            .job_inventory
            .update_status(&job_id, JobState::Running, None)
            .await
        {
            Ok(_) => {}
            Err(e) if e.is_transition_rejected() => {
                warn!(job_id = %job_id, task_id = %task.id, "Job already claimed, dropping task: {}", e);
                self.queue_inventory.acknowledge(&task.id).await?;
                return Ok(true);
            }
            Err(e) => {
                error!(job_id = %job_id, task_id = %task.id, "Claim failed: {}", e);
                self.abandon(&job_id, &task.id, format!("claim failed: {}", e))
                    .await;
                return Err(e);
            }
        }

        let completer = Completer::new(job_id.clone(), task.id.clone(), Arc::clone(&self.completions));
        info!(job_id = %job_id, task_id = %task.id, scheme = %task.payload.scheme, "Processing task");

        let mut result = self.execute(task.clone()).await;
        if let Err(e) = self.record(&job_id, &result).await {
            if result.is_ok() {
                result = Err(ProcessingError::Aborted(format!(
                    "terminal state not recorded: {}",
                    e
                )));
            }
        }

        if let Err(e) = self.queue_inventory.acknowledge(&task.id).await {
            warn!(job_id = %job_id, task_id = %task.id, "Acknowledge failed: {}", e);
        }
        completer.complete(result);
        Ok(true)
    }

    /// Settle a taken task that will never run: acknowledge it, fail its
    /// still-QUEUED job and emit an `Aborted` completion
    async fn abandon(&self, job_id: &JobId, task_id: &TaskId, reason: String) {
        if let Err(e) = self.queue_inventory.acknowledge(task_id).await {
            warn!(job_id = %job_id, task_id = %task_id, "Acknowledge failed: {}", e);
        }
        let error = ProcessingError::Aborted(reason);
        match self
            .job_inventory
            .update_status(job_id, JobState::Failed, Some(&error.detail()))
            .await
        {
            Ok(_) => {}
            // someone else owns the job now; their completion stands
            Err(e) if e.is_transition_rejected() => return,
            Err(e) => error!(job_id = %job_id, "Failed to record abandoned job: {}", e),
        }
        Completer::new(job_id.clone(), task_id.clone(), Arc::clone(&self.completions))
            .complete(Err(error));
    }

    /// Run the processor on a spawned task so a panic cannot take the worker down
    async fn execute(&self, task: Task) -> std::result::Result<TransformReport, ProcessingError> {
        let processor = Arc::clone(&self.processor);
        let handle = tokio::task::spawn(async move { processor.process(&task.payload).await });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    "processor panicked"
                } else {
                    "processor cancelled"
                };
                error!(queue = %self.queue, "{}: {:?}", reason, join_err);
                Err(ProcessingError::Aborted(reason.to_string()))
            }
        }
    }

    /// Persist the terminal state
    async fn record(
        &self,
        job_id: &JobId,
        result: &std::result::Result<TransformReport, ProcessingError>,
    ) -> Result<()> {
        let outcome = match result {
            Ok(report) => {
                info!(
                    job_id = %job_id,
                    output = %report.output_path.display(),
                    bytes_read = report.bytes_read,
                    bytes_written = report.bytes_written,
                    duration_ms = report.duration_ms,
                    "Job succeeded"
                );
                match self
                    .job_inventory
                    .update_status(job_id, JobState::Succeeded, None)
                    .await
                {
                    Ok(job) => Ok(job),
                    Err(e) => {
                        // the completion turns into a failure, keep the record in step
                        let detail = ProcessingError::Aborted(format!(
                            "terminal state not recorded: {}",
                            e
                        ))
                        .detail();
                        if let Err(fallback) = self
                            .job_inventory
                            .update_status(job_id, JobState::Failed, Some(&detail))
                            .await
                        {
                            error!(job_id = %job_id, "Failed to record fallback failure: {}", fallback);
                        }
                        Err(e)
                    }
                }
            }
            Err(e) => {
                warn!(job_id = %job_id, kind = e.kind(), "Job failed: {}", e);
                self.job_inventory
                    .update_status(job_id, JobState::Failed, Some(&e.detail()))
                    .await
            }
        };
        outcome.map(|_| ()).map_err(|e| {
            error!(job_id = %job_id, "Failed to record terminal state: {}", e);
            e
        })
    }
}
