// Job Factories - strategy selection keyed by (category, scheme)

mod constructors;
pub mod output_path;
pub mod request;
mod submit;

pub use constructors::{
    DecompressionJob, GzipCompressionJob, HybridDecryptionJob, HybridEncryptionJob,
    PgpDecryptionJob, PgpEncryptionJob, ZstdCompressionJob,
};
pub use request::{validate_request, CreateJobRequest};

use crate::domain::{DomainError, Job, OperationCategory, QueueRouting, Scheme};
use crate::error::Result;
use crate::port::{IdProvider, JobInventory, OwnerResolver, QueueInventory, TimeProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Handles a constructor needs to persist and dispatch a job
#[derive(Clone)]
pub struct FactoryContext {
    pub job_inventory: Arc<dyn JobInventory>,
    pub queue_inventory: Arc<dyn QueueInventory>,
    pub owner_resolver: Arc<dyn OwnerResolver>,
    pub id_provider: Arc<dyn IdProvider>,
    pub time_provider: Arc<dyn TimeProvider>,
    pub routing: QueueRouting,
}

/// Builds, persists and enqueues one kind of job
#[async_trait]
pub trait JobConstructor: Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> OperationCategory;

    /// Returns the persisted job (QUEUED) once its task is on the queue
    ///
    /// # Errors
    /// - AppError::Validation / NotFound before anything is written
    /// - AppError::SubmissionFailed after compensation if the enqueue failed
    async fn construct(
        &self,
        ctx: &FactoryContext,
        scheme: Scheme,
        req: CreateJobRequest,
    ) -> Result<Job>;
}

/// (category, scheme) -> constructor
#[derive(Default)]
pub struct JobFactoryRegistry {
    exact: HashMap<(OperationCategory, Scheme), Arc<dyn JobConstructor>>,
    defaults: HashMap<OperationCategory, Arc<dyn JobConstructor>>,
}

impl JobFactoryRegistry {
    /// Empty registry (every selection is rejected)
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in constructors
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register(Scheme::Pgp, Arc::new(PgpEncryptionJob))
            .register(Scheme::Hybrid, Arc::new(HybridEncryptionJob))
            .register(Scheme::Pgp, Arc::new(PgpDecryptionJob))
            .register(Scheme::Hybrid, Arc::new(HybridDecryptionJob))
            .register(Scheme::Zstd, Arc::new(ZstdCompressionJob))
            .register(Scheme::Gzip, Arc::new(GzipCompressionJob))
            // codec is sniffed from the stream, any scheme value is accepted
            .register_default(Arc::new(DecompressionJob));
        registry
    }

    /// Register a constructor for `scheme` within its own category
    pub fn register(&mut self, scheme: Scheme, constructor: Arc<dyn JobConstructor>) -> &mut Self {
        self.exact
            .insert((constructor.category(), scheme), constructor);
        self
    }

    /// Register the fallback constructor of a category
    pub fn register_default(&mut self, constructor: Arc<dyn JobConstructor>) -> &mut Self {
        self.defaults.insert(constructor.category(), constructor);
        self
    }

    /// Pure lookup, no side effects
    ///
    /// # Errors
    /// - DomainError::UnsupportedScheme when neither an exact entry nor a category default exists
    pub fn select(
        &self,
        category: OperationCategory,
        scheme: &Scheme,
    ) -> std::result::Result<Arc<dyn JobConstructor>, DomainError> {
        self.exact
            .get(&(category, scheme.clone()))
            .or_else(|| self.defaults.get(&category))
            .cloned()
            .ok_or_else(|| DomainError::UnsupportedScheme {
                category: category.to_string(),
                scheme: scheme.to_string(),
            })
    }

    pub fn encryption_factory(
        &self,
        scheme: &Scheme,
    ) -> std::result::Result<Arc<dyn JobConstructor>, DomainError> {
        self.select(OperationCategory::Encrypt, scheme)
    }

    pub fn decryption_factory(
        &self,
        scheme: &Scheme,
    ) -> std::result::Result<Arc<dyn JobConstructor>, DomainError> {
        self.select(OperationCategory::Decrypt, scheme)
    }

    pub fn compression_factory(
        &self,
        scheme: &Scheme,
    ) -> std::result::Result<Arc<dyn JobConstructor>, DomainError> {
        self.select(OperationCategory::Compress, scheme)
    }

    pub fn decompression_factory(
        &self,
        scheme: &Scheme,
    ) -> std::result::Result<Arc<dyn JobConstructor>, DomainError> {
        self.select(OperationCategory::Decompress, scheme)
    }

    /// Schemes with an exact registration in `category`, sorted
    pub fn supported_schemes(&self, category: OperationCategory) -> Vec<Scheme> {
        let mut schemes: Vec<Scheme> = self
            .exact
            .keys()
            .filter(|(c, _)| *c == category)
            .map(|(_, s)| s.clone())
            .collect();
        schemes.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        schemes
    }
}
