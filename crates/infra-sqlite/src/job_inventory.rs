// SQLite JobInventory Implementation

use async_trait::async_trait;
use cryptq_core::domain::{Job, JobId, JobState, OperationCategory, Scheme};
use cryptq_core::error::{AppError, Result};
use cryptq_core::port::{JobInventory, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

use crate::error::map_sqlx_error;

const ALL_STATES: [JobState; 4] = [
    JobState::Queued,
    JobState::Running,
    JobState::Succeeded,
    JobState::Failed,
];

/// `?, ?, ...` for an `IN (...)` list of `n` values
fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub struct SqliteJobInventory {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteJobInventory {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl JobInventory for SqliteJobInventory {
    async fn create_job(&self, job: &Job) -> Result<Job> {
        sqlx::query(
            r#"
            INSERT INTO jobs (
                id, owner_id, category, scheme, queue,
                source_path, output_path, sign_with_encryption,
                state, created_at, started_at, finished_at, error_detail
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&job.id)
        .bind(&job.owner_id)
        .bind(job.category.to_string())
        .bind(job.scheme.as_str())
        .bind(&job.queue)
        .bind(&job.source_path)
        .bind(&job.output_path)
        .bind(job.sign_with_encryption)
        .bind(job.state.to_string())
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.finished_at)
        .bind(&job.error_detail)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(job.clone())
    }

    async fn get_job(&self, id: &JobId) -> Result<Job> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(r) => r.into_job(),
            None => Err(AppError::NotFound(format!("Job {} not found", id))),
        }
    }

    async fn update_status(
        &self,
        id: &JobId,
        state: JobState,
        error_detail: Option<&str>,
    ) -> Result<Job> {
        let now = self.time_provider.now_millis();

        // Only rows currently in a state that may legally move to `state` are touched,
        // so two racing claims cannot both succeed.
        let from: Vec<String> = ALL_STATES
            .iter()
            .filter(|s| s.can_transition_to(state))
            .map(|s| s.to_string())
            .collect();
        if from.is_empty() {
            return Err(AppError::InvalidState(format!(
                "No transition leads to {}",
                state
            )));
        }

        let (started_at, finished_at, detail) = match state {
            JobState::Running => (Some(now), None, None),
            JobState::Succeeded => (None, Some(now), None),
            _ => (
                None,
                Some(now),
                Some(error_detail.unwrap_or("unknown failure").to_string()),
            ),
        };

        let sql = format!(
            r#"
            UPDATE jobs
            SET state = ?,
                started_at = COALESCE(?, started_at),
                finished_at = COALESCE(?, finished_at),
                error_detail = ?
            WHERE id = ? AND state IN ({})
            RETURNING *
            "#,
            placeholders(from.len())
        );
        let mut query = sqlx::query_as::<_, JobRow>(&sql)
            .bind(state.to_string())
            .bind(started_at)
            .bind(finished_at)
            .bind(&detail)
            .bind(id);
        for predecessor in &from {
            query = query.bind(predecessor);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if let Some(row) = row {
            debug!(job_id = %id, state = %state, "Job state updated");
            return row.into_job();
        }

        let current: Option<String> = sqlx::query_scalar("SELECT state FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        match current {
            None => Err(AppError::NotFound(format!("Job {} not found", id))),
            Some(current_state) => Err(AppError::InvalidState(format!(
                "Cannot update job {} from {} to {}",
                id, current_state, state
            ))),
        }
    }

    async fn find_by_state(&self, state: JobState) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            r#"
            SELECT * FROM jobs
            WHERE state = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(state.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(JobRow::into_job).collect()
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    owner_id: String,
    category: String,
    scheme: String,
    queue: String,
    source_path: String,
    output_path: String,
    sign_with_encryption: bool,
    state: String,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
    error_detail: Option<String>,
}

impl JobRow {
    fn into_job(self) -> Result<Job> {
        let corrupt = |field: &str, value: &str| {
            AppError::Database(format!(
                "Job {} has invalid {} '{}'",
                self.id, field, value
            ))
        };
        let state: JobState = self
            .state
            .parse()
            .map_err(|_| corrupt("state", &self.state))?;
        let category: OperationCategory = self
            .category
            .parse()
            .map_err(|_| corrupt("category", &self.category))?;

        Ok(Job {
            id: self.id,
            owner_id: self.owner_id,
            category,
            scheme: Scheme::parse(&self.scheme),
            queue: self.queue,
            source_path: self.source_path,
            output_path: self.output_path,
            sign_with_encryption: self.sign_with_encryption,
            state,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            error_detail: self.error_detail,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use cryptq_core::port::time_provider::ManualClock;

    async fn setup() -> SqliteJobInventory {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteJobInventory::new(pool, Arc::new(ManualClock::new(5_000)))
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let inventory = setup().await;
        let mut job = Job::new_test(OperationCategory::Encrypt, Scheme::Hybrid);
        job.sign_with_encryption = true;

        inventory.create_job(&job).await.unwrap();

        let found = inventory.get_job(&job.id).await.unwrap();
        assert_eq!(found.id, job.id);
        assert_eq!(found.scheme, Scheme::Hybrid);
        assert_eq!(found.category, OperationCategory::Encrypt);
        assert!(found.sign_with_encryption);
        assert_eq!(found.state, JobState::Queued);
    }

    #[tokio::test]
    async fn test_duplicate_id_conflicts() {
        let inventory = setup().await;
        let job = Job::new_test(OperationCategory::Compress, Scheme::Zstd);
        inventory.create_job(&job).await.unwrap();
        let err = inventory.create_job(&job).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let inventory = setup().await;
        let err = inventory.get_job(&"nope".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_lifecycle_timestamps() {
        let inventory = setup().await;
        let job = Job::new_test(OperationCategory::Decrypt, Scheme::Pgp);
        inventory.create_job(&job).await.unwrap();

        let running = inventory
            .update_status(&job.id, JobState::Running, None)
            .await
            .unwrap();
        assert_eq!(running.started_at, Some(5_000));

        let failed = inventory
            .update_status(&job.id, JobState::Failed, Some("DecryptionFailed: bad MDC"))
            .await
            .unwrap();
        assert_eq!(failed.finished_at, Some(5_000));
        assert_eq!(failed.error_detail.as_deref(), Some("DecryptionFailed: bad MDC"));
    }

    #[test]
    fn test_placeholders_cover_every_predecessor() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[tokio::test]
    async fn test_failure_reachable_from_every_predecessor() {
        let inventory = setup().await;
        let queued = Job::new_test(OperationCategory::Encrypt, Scheme::Pgp);
        let running = Job::new_test(OperationCategory::Encrypt, Scheme::Pgp);
        inventory.create_job(&queued).await.unwrap();
        inventory.create_job(&running).await.unwrap();
        inventory
            .update_status(&running.id, JobState::Running, None)
            .await
            .unwrap();

        for id in [&queued.id, &running.id] {
            let failed = inventory
                .update_status(id, JobState::Failed, Some("Aborted: test"))
                .await
                .unwrap();
            assert_eq!(failed.state, JobState::Failed);
        }
    }

    #[tokio::test]
    async fn test_second_claim_is_rejected() {
        let inventory = setup().await;
        let job = Job::new_test(OperationCategory::Compress, Scheme::Gzip);
        inventory.create_job(&job).await.unwrap();

        inventory
            .update_status(&job.id, JobState::Running, None)
            .await
            .unwrap();
        let err = inventory
            .update_status(&job.id, JobState::Running, None)
            .await
            .unwrap_err();
        assert!(err.is_transition_rejected());
    }

    #[tokio::test]
    async fn test_terminal_state_is_final() {
        let inventory = setup().await;
        let job = Job::new_test(OperationCategory::Compress, Scheme::Gzip);
        inventory.create_job(&job).await.unwrap();
        inventory
            .update_status(&job.id, JobState::Running, None)
            .await
            .unwrap();
        inventory
            .update_status(&job.id, JobState::Succeeded, None)
            .await
            .unwrap();

        for next in [JobState::Failed, JobState::Running, JobState::Queued] {
            let err = inventory
                .update_status(&job.id, next, Some("late"))
                .await
                .unwrap_err();
            assert!(err.is_transition_rejected());
        }
        let stored = inventory.get_job(&job.id).await.unwrap();
        assert_eq!(stored.state, JobState::Succeeded);
        assert!(stored.error_detail.is_none());
    }

    #[tokio::test]
    async fn test_queued_cannot_succeed_directly() {
        let inventory = setup().await;
        let job = Job::new_test(OperationCategory::Compress, Scheme::Zstd);
        inventory.create_job(&job).await.unwrap();
        assert!(inventory
            .update_status(&job.id, JobState::Succeeded, None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_find_by_state() {
        let inventory = setup().await;
        let a = Job::new_test(OperationCategory::Compress, Scheme::Zstd);
        let b = Job::new_test(OperationCategory::Compress, Scheme::Zstd);
        inventory.create_job(&a).await.unwrap();
        inventory.create_job(&b).await.unwrap();
        inventory
            .update_status(&b.id, JobState::Running, None)
            .await
            .unwrap();

        let queued = inventory.find_by_state(JobState::Queued).await.unwrap();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].id, a.id);
    }
}
