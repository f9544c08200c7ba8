// Job Inventory Port (Interface)

use crate::domain::{Job, JobId, JobState};
use crate::error::Result;
use async_trait::async_trait;

/// Durable record of job metadata; the single source of truth for job state
#[async_trait]
pub trait JobInventory: Send + Sync {
    /// Persist a new job (state QUEUED)
    async fn create_job(&self, job: &Job) -> Result<Job>;

    /// Load a job by ID
    ///
    /// # Errors
    /// - AppError::NotFound if no such job exists
    async fn get_job(&self, id: &JobId) -> Result<Job>;

    /// Apply a monotonic state transition and return the updated job
    ///
    /// The write is conditional on the state that was read, so two workers can
    /// never both claim (QUEUED -> RUNNING) the same job.
    ///
    /// # Errors
    /// - AppError::Domain(InvalidStateTransition) for a non-monotonic move
    /// - AppError::Conflict if another writer changed the job first
    async fn update_status(
        &self,
        id: &JobId,
        state: JobState,
        error_detail: Option<&str>,
    ) -> Result<Job>;

    /// Find all jobs in a state (used by recovery)
    async fn find_by_state(&self, state: JobState) -> Result<Vec<Job>>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use crate::port::time_provider::{SystemTimeProvider, TimeProvider};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// In-memory job inventory with failure injection
    pub struct InMemoryJobInventory {
        jobs: Mutex<HashMap<JobId, Job>>,
        failing_target: Mutex<Option<JobState>>,
        time_provider: Arc<dyn TimeProvider>,
    }

    impl InMemoryJobInventory {
        pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                jobs: Mutex::new(HashMap::new()),
                failing_target: Mutex::new(None),
                time_provider,
            }
        }

        /// Make every update towards `state` fail as a storage error
        pub fn fail_updates_to(&self, state: Option<JobState>) {
            *self.failing_target.lock().unwrap() = state;
        }

        pub fn len(&self) -> usize {
            self.jobs.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl Default for InMemoryJobInventory {
        fn default() -> Self {
            Self::new(Arc::new(SystemTimeProvider))
        }
    }

    #[async_trait]
    impl JobInventory for InMemoryJobInventory {
        async fn create_job(&self, job: &Job) -> Result<Job> {
            let mut jobs = self.jobs.lock().unwrap();
            if jobs.contains_key(&job.id) {
                return Err(AppError::Conflict(format!("Job {} already exists", job.id)));
            }
            jobs.insert(job.id.clone(), job.clone());
            Ok(job.clone())
        }

        async fn get_job(&self, id: &JobId) -> Result<Job> {
            self.jobs
                .lock()
                .unwrap()
                .get(id)
                .cloned()
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))
        }

        async fn update_status(
            &self,
            id: &JobId,
            state: JobState,
            error_detail: Option<&str>,
        ) -> Result<Job> {
            if *self.failing_target.lock().unwrap() == Some(state) {
                return Err(AppError::Database(format!(
                    "write of {} for job {} refused",
                    state, id
                )));
            }
            let now = self.time_provider.now_millis();
            let mut jobs = self.jobs.lock().unwrap();
            let job = jobs
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("Job {} not found", id)))?;

            // Transition on a copy so a rejected move leaves the stored job untouched
            let mut updated = job.clone();
            updated.transition(state, now, error_detail)?;
            *job = updated.clone();
            Ok(updated)
        }

        async fn find_by_state(&self, state: JobState) -> Result<Vec<Job>> {
            let mut found: Vec<Job> = self
                .jobs
                .lock()
                .unwrap()
                .values()
                .filter(|j| j.state == state)
                .cloned()
                .collect();
            found.sort_by_key(|j| j.created_at);
            Ok(found)
        }
    }
}
