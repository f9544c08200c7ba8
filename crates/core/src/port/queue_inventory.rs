// Queue Inventory Port (Interface)

use crate::domain::{JobId, JobPayload, QueueAssignment, Task, TaskId};
use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Durable queue hand-off between submission and workers
#[async_trait]
pub trait QueueInventory: Send + Sync {
    /// Submit a task for `payload.job_id` to `queue`
    ///
    /// # Errors
    /// - AppError::Conflict if the job already has an assignment
    async fn enqueue(&self, queue: &str, payload: &JobPayload) -> Result<QueueAssignment>;

    /// Take the oldest pending task of a queue, if any (atomic: a task is taken once)
    ///
    /// # Errors
    /// - AppError::UnreadableTask if the task was taken but its payload does not decode
    async fn try_dequeue(&self, queue: &str) -> Result<Option<Task>>;

    /// Wait until a task is available on `queue`
    async fn dequeue(&self, queue: &str, poll_interval: Duration) -> Result<Task> {
        loop {
            if let Some(task) = self.try_dequeue(queue).await? {
                return Ok(task);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    /// Mark a taken task as handled
    async fn acknowledge(&self, task_id: &TaskId) -> Result<()>;

    /// Queue assignment of a job (operator visibility / recovery)
    async fn assignment(&self, job_id: &JobId) -> Result<Option<QueueAssignment>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::TaskState;
    use crate::error::AppError;
    use crate::port::id_provider::{IdProvider, UuidProvider};
    use crate::port::time_provider::{SystemTimeProvider, TimeProvider};
    use std::collections::{HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct QueueState {
        pending: HashMap<String, VecDeque<Task>>,
        task_states: HashMap<TaskId, TaskState>,
        assignments: HashMap<JobId, QueueAssignment>,
    }

    /// In-memory queue inventory with failure injection
    pub struct InMemoryQueueInventory {
        state: Mutex<QueueState>,
        reject_enqueue: AtomicBool,
        unreadable_payloads: AtomicBool,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    }

    impl InMemoryQueueInventory {
        pub fn new(id_provider: Arc<dyn IdProvider>, time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                state: Mutex::new(QueueState::default()),
                reject_enqueue: AtomicBool::new(false),
                unreadable_payloads: AtomicBool::new(false),
                id_provider,
                time_provider,
            }
        }

        /// Make every subsequent enqueue fail (simulates a broker outage)
        pub fn set_reject_enqueue(&self, reject: bool) {
            self.reject_enqueue.store(reject, Ordering::SeqCst);
        }

        /// Make every subsequent dequeue take the task but fail to decode it
        pub fn set_unreadable_payloads(&self, unreadable: bool) {
            self.unreadable_payloads.store(unreadable, Ordering::SeqCst);
        }

        pub fn pending_len(&self, queue: &str) -> usize {
            self.state
                .lock()
                .unwrap()
                .pending
                .get(queue)
                .map(|q| q.len())
                .unwrap_or(0)
        }

        pub fn task_state(&self, task_id: &TaskId) -> Option<TaskState> {
            self.state.lock().unwrap().task_states.get(task_id).copied()
        }
    }

    impl Default for InMemoryQueueInventory {
        fn default() -> Self {
            Self::new(Arc::new(UuidProvider), Arc::new(SystemTimeProvider))
        }
    }

    #[async_trait]
    impl QueueInventory for InMemoryQueueInventory {
        async fn enqueue(&self, queue: &str, payload: &JobPayload) -> Result<QueueAssignment> {
            if self.reject_enqueue.load(Ordering::SeqCst) {
                return Err(AppError::Internal(format!("queue '{}' unavailable", queue)));
            }

            let mut state = self.state.lock().unwrap();
            if state.assignments.contains_key(&payload.job_id) {
                return Err(AppError::Conflict(format!(
                    "Job {} already assigned to a queue",
                    payload.job_id
                )));
            }

            let now = self.time_provider.now_millis();
            let task = Task {
                id: self.id_provider.generate_id(),
                queue: queue.to_string(),
                payload: payload.clone(),
                enqueued_at: now,
            };
            let assignment = QueueAssignment {
                job_id: payload.job_id.clone(),
                queue: queue.to_string(),
                task_id: task.id.clone(),
                assigned_at: now,
                task_state: TaskState::Pending,
            };

            state.task_states.insert(task.id.clone(), TaskState::Pending);
            state
                .assignments
                .insert(payload.job_id.clone(), assignment.clone());
            state
                .pending
                .entry(queue.to_string())
                .or_default()
                .push_back(task);
            Ok(assignment)
        }

        async fn try_dequeue(&self, queue: &str) -> Result<Option<Task>> {
            let mut state = self.state.lock().unwrap();
            let task = state.pending.get_mut(queue).and_then(|q| q.pop_front());
            if let Some(task) = &task {
                state.task_states.insert(task.id.clone(), TaskState::Taken);
                if self.unreadable_payloads.load(Ordering::SeqCst) {
                    return Err(AppError::UnreadableTask {
                        task_id: task.id.clone(),
                        job_id: task.payload.job_id.clone(),
                        reason: "payload does not decode".to_string(),
                    });
                }
            }
            Ok(task)
        }

        async fn acknowledge(&self, task_id: &TaskId) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            match state.task_states.get_mut(task_id) {
                Some(s) => {
                    *s = TaskState::Acknowledged;
                    Ok(())
                }
                None => Err(AppError::NotFound(format!("Task {} not found", task_id))),
            }
        }

        async fn assignment(&self, job_id: &JobId) -> Result<Option<QueueAssignment>> {
            let state = self.state.lock().unwrap();
            Ok(state.assignments.get(job_id).map(|a| QueueAssignment {
                task_state: state
                    .task_states
                    .get(&a.task_id)
                    .copied()
                    .unwrap_or(a.task_state),
                ..a.clone()
            }))
        }
    }
}
