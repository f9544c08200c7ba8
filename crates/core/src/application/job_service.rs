// Job Service - submission facade over the factory registry

use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::factory::{CreateJobRequest, FactoryContext, JobFactoryRegistry};
use crate::domain::{Job, JobId, OperationCategory, Scheme};
use crate::error::Result;

/// Entry point for callers that submit and inspect jobs
pub struct JobService {
    registry: Arc<JobFactoryRegistry>,
    ctx: FactoryContext,
}

impl JobService {
    pub fn new(registry: Arc<JobFactoryRegistry>, ctx: FactoryContext) -> Self {
        Self { registry, ctx }
    }

    /// Select a constructor for (category, scheme) and submit the job.
    ///
    /// An unsupported scheme is rejected here, before anything is persisted.
    pub async fn submit(
        &self,
        category: OperationCategory,
        scheme: Scheme,
        req: CreateJobRequest,
    ) -> Result<Job> {
        let constructor = self.registry.select(category, &scheme).map_err(|e| {
            warn!(category = %category, scheme = %scheme, "Rejected submission: {}", e);
            e
        })?;
        debug!(constructor = constructor.name(), owner_id = %req.owner_id, "Constructing job");
        constructor.construct(&self.ctx, scheme, req).await
    }

    pub async fn get_job(&self, id: &JobId) -> Result<Job> {
        self.ctx.job_inventory.get_job(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, JobState, KeyRef};
    use crate::error::AppError;
    use crate::port::job_inventory::mocks::InMemoryJobInventory;
    use crate::port::owner_resolver::mocks::MockOwnerResolver;
    use crate::port::queue_inventory::mocks::InMemoryQueueInventory;
    use crate::port::id_provider::UuidProvider;
    use crate::port::time_provider::SystemTimeProvider;
    use crate::port::OwnerIdentity;
    use tokio_test::assert_ok;

    fn service() -> (JobService, Arc<InMemoryJobInventory>, Arc<InMemoryQueueInventory>) {
        let jobs = Arc::new(InMemoryJobInventory::default());
        let queues = Arc::new(InMemoryQueueInventory::default());
        let owners = MockOwnerResolver::new().with_owner(OwnerIdentity {
            owner_id: "alice".to_string(),
            public_key: KeyRef::new("alice"),
            private_key: Some(KeyRef::new("alice")),
        });
        let ctx = FactoryContext {
            job_inventory: jobs.clone(),
            queue_inventory: queues.clone(),
            owner_resolver: Arc::new(owners),
            id_provider: Arc::new(UuidProvider),
            time_provider: Arc::new(SystemTimeProvider),
            routing: Default::default(),
        };
        (
            JobService::new(Arc::new(JobFactoryRegistry::with_defaults()), ctx),
            jobs,
            queues,
        )
    }

    #[tokio::test]
    async fn test_submit_and_get() {
        let (svc, _, queues) = service();
        let job = assert_ok!(
            svc.submit(
                OperationCategory::Decrypt,
                Scheme::Hybrid,
                CreateJobRequest::new("alice", "/data/a.bin.enc").with_output("/data/a.bin"),
            )
            .await
        );

        let fetched = svc.get_job(&job.id).await.unwrap();
        assert_eq!(fetched.state, JobState::Queued);
        assert_eq!(fetched.scheme, Scheme::Hybrid);
        assert_eq!(queues.pending_len("decryption"), 1);
    }

    #[tokio::test]
    async fn test_unsupported_scheme_has_no_side_effects() {
        let (svc, jobs, queues) = service();
        let err = svc
            .submit(
                OperationCategory::Decrypt,
                Scheme::parse("CAESAR"),
                CreateJobRequest::new("alice", "/data/a.bin.enc"),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::Domain(DomainError::UnsupportedScheme { .. })
        ));
        assert!(jobs.is_empty());
        assert_eq!(queues.pending_len("decryption"), 0);
    }

    #[tokio::test]
    async fn test_get_unknown_job() {
        let (svc, _, _) = service();
        let err = svc.get_job(&"missing".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
