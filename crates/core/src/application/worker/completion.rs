// Completion signalling: exactly one Completion per claimed task

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::{JobId, TaskId};
use crate::port::{ProcessingError, TransformReport};

/// Outcome of one claimed task
#[derive(Debug, Clone)]
pub struct Completion {
    pub job_id: JobId,
    pub task_id: TaskId,
    pub result: Result<TransformReport, ProcessingError>,
}

impl Completion {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Where completions are delivered
pub trait CompletionSink: Send + Sync {
    fn deliver(&self, completion: Completion);
}

impl CompletionSink for mpsc::UnboundedSender<Completion> {
    fn deliver(&self, completion: Completion) {
        if let Err(e) = self.send(completion) {
            // receiver gone, nobody is listening any more
            warn!(job_id = %e.0.job_id, "Completion dropped: listener closed");
        }
    }
}

/// Sink that discards everything
pub struct NoopSink;

impl CompletionSink for NoopSink {
    fn deliver(&self, _completion: Completion) {}
}

/// Channel for workers (sink) and a listener (receiver)
pub fn completion_channel() -> (Arc<dyn CompletionSink>, mpsc::UnboundedReceiver<Completion>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(tx), rx)
}

/// Move-only handle owed to the task that claimed a job.
///
/// `complete` consumes it; dropping it unsent emits an `Aborted` failure instead.
pub struct Completer {
    job_id: JobId,
    task_id: TaskId,
    sink: Arc<dyn CompletionSink>,
    sent: bool,
}

impl Completer {
    pub fn new(job_id: JobId, task_id: TaskId, sink: Arc<dyn CompletionSink>) -> Self {
        Self {
            job_id,
            task_id,
            sink,
            sent: false,
        }
    }

    pub fn complete(mut self, result: Result<TransformReport, ProcessingError>) {
        self.send(result);
    }

    fn send(&mut self, result: Result<TransformReport, ProcessingError>) {
        self.sent = true;
        self.sink.deliver(Completion {
            job_id: self.job_id.clone(),
            task_id: self.task_id.clone(),
            result,
        });
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if !self.sent {
            warn!(job_id = %self.job_id, task_id = %self.task_id, "Completer dropped without a result");
            self.send(Err(ProcessingError::Aborted(
                "task abandoned before completion".to_string(),
            )));
        }
    }
}
