//! Shared harness: SQLite on disk, the real engine, a file keyring and two owners
#![allow(dead_code)]

use cryptq_core::application::worker::{completion_channel, Completion, Worker};
use cryptq_core::application::{
    processor_for, CreateJobRequest, FactoryContext, JobFactoryRegistry, JobService,
};
use cryptq_core::domain::{Job, KeyRef, OperationCategory, QueueRouting, Scheme};
use cryptq_core::error::Result;
use cryptq_core::port::id_provider::UuidProvider;
use cryptq_core::port::time_provider::SystemTimeProvider;
use cryptq_core::port::{
    CryptoEngine, JobInventory, KeyProvider, OwnerIdentity, QueueInventory,
};
use cryptq_infra_crypto::{EngineConfig, FsKeyring, StaticOwnerResolver, StreamingCryptoEngine};
use cryptq_infra_sqlite::{create_pool, run_migrations, SqliteJobInventory, SqliteQueueInventory};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

const ALICE_PUB: &str = include_str!("../../../infra-crypto/tests/fixtures/alice.pub.asc");
const ALICE_SEC: &str = include_str!("../../../infra-crypto/tests/fixtures/alice.sec.asc");
const MALLORY_PUB: &str = include_str!("../../../infra-crypto/tests/fixtures/mallory.pub.asc");

pub struct Harness {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub jobs: Arc<dyn JobInventory>,
    pub queues: Arc<dyn QueueInventory>,
    pub keys: Arc<dyn KeyProvider>,
    pub engine: Arc<dyn CryptoEngine>,
    pub routing: QueueRouting,
    pub service: JobService,
}

impl Harness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("cryptq.db").display());
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let keyring_dir = dir.path().join("keys");
        std::fs::create_dir_all(&keyring_dir).unwrap();
        std::fs::write(keyring_dir.join("alice.pub.asc"), ALICE_PUB).unwrap();
        std::fs::write(keyring_dir.join("alice.sec.asc"), ALICE_SEC).unwrap();
        std::fs::write(keyring_dir.join("mallory.pub.asc"), MALLORY_PUB).unwrap();

        let time_provider = Arc::new(SystemTimeProvider);
        let id_provider = Arc::new(UuidProvider);
        let jobs: Arc<dyn JobInventory> =
            Arc::new(SqliteJobInventory::new(pool.clone(), time_provider.clone()));
        let queues: Arc<dyn QueueInventory> = Arc::new(SqliteQueueInventory::new(
            pool.clone(),
            id_provider.clone(),
            time_provider.clone(),
        ));
        let owners = StaticOwnerResolver::new(vec![
            OwnerIdentity {
                owner_id: "alice".to_string(),
                public_key: KeyRef::new("alice.pub"),
                private_key: Some(KeyRef::new("alice.sec")),
            },
            // encrypts to mallory but can only decrypt with alice's key
            OwnerIdentity {
                owner_id: "eve".to_string(),
                public_key: KeyRef::new("mallory.pub"),
                private_key: Some(KeyRef::new("alice.sec")),
            },
        ]);

        let routing = QueueRouting::default();
        let ctx = FactoryContext {
            job_inventory: jobs.clone(),
            queue_inventory: queues.clone(),
            owner_resolver: Arc::new(owners),
            id_provider,
            time_provider,
            routing: routing.clone(),
        };
        let service = JobService::new(Arc::new(JobFactoryRegistry::with_defaults()), ctx);

        let engine = StreamingCryptoEngine::new(EngineConfig::default()).unwrap();

        Self {
            dir,
            pool,
            jobs,
            queues,
            keys: Arc::new(FsKeyring::new(keyring_dir)),
            engine: Arc::new(engine),
            routing,
            service,
        }
    }

    pub fn path(&self, name: &str) -> String {
        self.dir.path().join(name).display().to_string()
    }

    pub fn write_file(&self, name: &str, data: &[u8]) -> String {
        let path = self.path(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    pub fn worker(&self, category: OperationCategory) -> (Worker, UnboundedReceiver<Completion>) {
        let (sink, rx) = completion_channel();
        let worker = Worker::new(
            self.routing.queue_for(category),
            self.jobs.clone(),
            self.queues.clone(),
            processor_for(category, self.engine.clone(), self.keys.clone()),
            sink,
        );
        (worker, rx)
    }

    pub async fn submit(
        &self,
        category: OperationCategory,
        scheme: &str,
        req: CreateJobRequest,
    ) -> Result<Job> {
        self.service.submit(category, Scheme::parse(scheme), req).await
    }

    /// Run one worker of `category` until its queue is empty
    pub async fn drain(&self, category: OperationCategory) -> Vec<Completion> {
        let (worker, mut rx) = self.worker(category);
        while worker.process_next_task().await.unwrap() {}
        drop(worker);
        let mut completions = Vec::new();
        while let Some(c) = rx.recv().await {
            completions.push(c);
        }
        completions
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        sqlx::query_scalar(&sql).fetch_one(&self.pool).await.unwrap()
    }
}

pub fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 253) as u8 ^ (i / 253) as u8).collect()
}

pub fn artifact(job: &Job) -> PathBuf {
    job.artifact_path()
}
