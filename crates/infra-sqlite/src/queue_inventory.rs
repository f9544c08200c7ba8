// SQLite QueueInventory Implementation

use async_trait::async_trait;
use cryptq_core::domain::{JobId, JobPayload, QueueAssignment, Task, TaskId, TaskState};
use cryptq_core::error::{AppError, Result};
use cryptq_core::port::{IdProvider, QueueInventory, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use crate::error::map_sqlx_error;

pub struct SqliteQueueInventory {
    pool: SqlitePool,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteQueueInventory {
    pub fn new(
        pool: SqlitePool,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            pool,
            id_provider,
            time_provider,
        }
    }
}

#[async_trait]
impl QueueInventory for SqliteQueueInventory {
    async fn enqueue(&self, queue: &str, payload: &JobPayload) -> Result<QueueAssignment> {
        let task_id = self.id_provider.generate_id();
        let now = self.time_provider.now_millis();

        sqlx::query(
            r#"
            INSERT INTO queue_tasks (id, job_id, queue, payload, state, enqueued_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&task_id)
        .bind(&payload.job_id)
        .bind(queue)
        .bind(payload.to_json()?)
        .bind(TaskState::Pending.to_string())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error(e) {
            AppError::Conflict(_) => AppError::Conflict(format!(
                "Job {} already assigned to a queue",
                payload.job_id
            )),
            other => other,
        })?;

        debug!(job_id = %payload.job_id, queue = %queue, task_id = %task_id, "Task enqueued");
        Ok(QueueAssignment {
            job_id: payload.job_id.clone(),
            queue: queue.to_string(),
            task_id,
            assigned_at: now,
            task_state: TaskState::Pending,
        })
    }

    async fn try_dequeue(&self, queue: &str) -> Result<Option<Task>> {
        let now = self.time_provider.now_millis();

        // Single statement: the oldest pending task is taken by exactly one caller
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE queue_tasks
            SET state = ?, taken_at = ?
            WHERE id = (
                SELECT id FROM queue_tasks
                WHERE queue = ? AND state = ?
                ORDER BY enqueued_at ASC, rowid ASC
                LIMIT 1
            )
            RETURNING id, job_id, queue, payload, enqueued_at
            "#,
        )
        .bind(TaskState::Taken.to_string())
        .bind(now)
        .bind(queue)
        .bind(TaskState::Pending.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TaskRow::into_task).transpose()
    }

    async fn acknowledge(&self, task_id: &TaskId) -> Result<()> {
        let now = self.time_provider.now_millis();
        let result = sqlx::query(
            r#"
            UPDATE queue_tasks
            SET state = ?, acknowledged_at = COALESCE(acknowledged_at, ?)
            WHERE id = ?
            "#,
        )
        .bind(TaskState::Acknowledged.to_string())
        .bind(now)
        .bind(task_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Task {} not found", task_id)));
        }
        Ok(())
    }

    async fn assignment(&self, job_id: &JobId) -> Result<Option<QueueAssignment>> {
        let row: Option<(String, String, String, i64, String)> = sqlx::query_as(
            "SELECT job_id, queue, id, enqueued_at, state FROM queue_tasks WHERE job_id = ?",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(|(job_id, queue, task_id, assigned_at, state)| {
            let task_state = state.parse().map_err(|_| {
                AppError::Database(format!("Task {} has invalid state '{}'", task_id, state))
            })?;
            Ok(QueueAssignment {
                job_id,
                queue,
                task_id,
                assigned_at,
                task_state,
            })
        })
        .transpose()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: String,
    job_id: String,
    queue: String,
    payload: String,
    enqueued_at: i64,
}

impl TaskRow {
    fn into_task(self) -> Result<Task> {
        let payload = match JobPayload::from_json(&self.payload) {
            Ok(payload) => payload,
            Err(e) => {
                return Err(AppError::UnreadableTask {
                    task_id: self.id,
                    job_id: self.job_id,
                    reason: e.to_string(),
                })
            }
        };
        Ok(Task {
            payload,
            id: self.id,
            queue: self.queue,
            enqueued_at: self.enqueued_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations, SqliteJobInventory};
    use cryptq_core::domain::{Job, KeyRef, OperationCategory, Scheme};
    use cryptq_core::port::id_provider::SequentialIdProvider;
    use cryptq_core::port::time_provider::ManualClock;
    use cryptq_core::port::JobInventory;

    struct Fixture {
        pool: SqlitePool,
        jobs: SqliteJobInventory,
        queues: SqliteQueueInventory,
        clock: Arc<ManualClock>,
    }

    async fn setup() -> Fixture {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let clock = Arc::new(ManualClock::new(1_000));
        Fixture {
            jobs: SqliteJobInventory::new(pool.clone(), clock.clone()),
            queues: SqliteQueueInventory::new(
                pool.clone(),
                Arc::new(SequentialIdProvider::new("task")),
                clock.clone(),
            ),
            clock,
            pool,
        }
    }

    async fn stored_payload(f: &Fixture) -> JobPayload {
        let job = Job::new_test(OperationCategory::Encrypt, Scheme::Pgp);
        f.jobs.create_job(&job).await.unwrap();
        JobPayload::for_job(&job, Some(KeyRef::new("alice")), None)
    }

    #[tokio::test]
    async fn test_fifo_and_payload_round_trip() {
        let f = setup().await;
        let first = stored_payload(&f).await;
        f.queues.enqueue("encryption", &first).await.unwrap();
        f.clock.advance(10);
        let second = stored_payload(&f).await;
        f.queues.enqueue("encryption", &second).await.unwrap();

        let task = f.queues.try_dequeue("encryption").await.unwrap().unwrap();
        assert_eq!(task.payload, first);
        assert_eq!(task.queue, "encryption");

        let task = f.queues.try_dequeue("encryption").await.unwrap().unwrap();
        assert_eq!(task.payload, second);

        assert!(f.queues.try_dequeue("encryption").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_queues_are_isolated() {
        let f = setup().await;
        let payload = stored_payload(&f).await;
        f.queues.enqueue("encryption", &payload).await.unwrap();
        assert!(f.queues.try_dequeue("compression").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_one_assignment_per_job() {
        let f = setup().await;
        let payload = stored_payload(&f).await;

        let assignment = f.queues.enqueue("encryption", &payload).await.unwrap();
        assert_eq!(assignment.task_id, "task-1");
        assert_eq!(assignment.assigned_at, 1_000);

        let err = f.queues.enqueue("decryption", &payload).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = f.queues.assignment(&payload.job_id).await.unwrap().unwrap();
        assert_eq!(stored, assignment);
    }

    #[tokio::test]
    async fn test_enqueue_for_unknown_job_fails() {
        let f = setup().await;
        let job = Job::new_test(OperationCategory::Compress, Scheme::Zstd);
        let payload = JobPayload::for_job(&job, None, None);
        assert!(f.queues.enqueue("compression", &payload).await.is_err());
    }

    #[tokio::test]
    async fn test_acknowledge() {
        let f = setup().await;
        let payload = stored_payload(&f).await;
        f.queues.enqueue("encryption", &payload).await.unwrap();
        let task = f.queues.try_dequeue("encryption").await.unwrap().unwrap();

        f.queues.acknowledge(&task.id).await.unwrap();
        // acknowledging twice is harmless
        f.queues.acknowledge(&task.id).await.unwrap();

        let err = f.queues.acknowledge(&"task-404".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    async fn task_state(f: &Fixture, payload: &JobPayload) -> TaskState {
        let assignment = f.queues.assignment(&payload.job_id).await.unwrap();
        assignment.unwrap().task_state
    }

    #[tokio::test]
    async fn test_assignment_tracks_task_state() {
        let f = setup().await;
        let payload = stored_payload(&f).await;
        f.queues.enqueue("encryption", &payload).await.unwrap();

        assert_eq!(task_state(&f, &payload).await, TaskState::Pending);

        let task = f.queues.try_dequeue("encryption").await.unwrap().unwrap();
        assert_eq!(task_state(&f, &payload).await, TaskState::Taken);

        f.queues.acknowledge(&task.id).await.unwrap();
        assert_eq!(task_state(&f, &payload).await, TaskState::Acknowledged);
    }

    #[tokio::test]
    async fn test_unreadable_payload_names_task_and_job() {
        let f = setup().await;
        let payload = stored_payload(&f).await;
        let assignment = f.queues.enqueue("encryption", &payload).await.unwrap();
        sqlx::query("UPDATE queue_tasks SET payload = '{not json' WHERE id = ?")
            .bind(&assignment.task_id)
            .execute(&f.pool)
            .await
            .unwrap();

        match f.queues.try_dequeue("encryption").await.unwrap_err() {
            AppError::UnreadableTask {
                task_id, job_id, ..
            } => {
                assert_eq!(task_id, assignment.task_id);
                assert_eq!(job_id, payload.job_id);
            }
            other => panic!("unexpected error: {}", other),
        }
        // taken, so a later dequeue does not hand it out again
        assert!(f.queues.try_dequeue("encryption").await.unwrap().is_none());
    }
}
