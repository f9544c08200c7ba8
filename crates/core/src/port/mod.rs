// Port Layer - Interfaces for external dependencies

pub mod crypto_engine;
pub mod id_provider; // For deterministic testing
pub mod job_inventory;
pub mod key_provider;
pub mod owner_resolver;
pub mod queue_inventory;
pub mod time_provider;

// Re-exports
pub use crypto_engine::{
    CodecRequest, CryptoEngine, DecryptRequest, EncryptRequest, ProcessingError, TransformReport,
};
pub use id_provider::IdProvider;
pub use job_inventory::JobInventory;
pub use key_provider::KeyProvider;
pub use owner_resolver::{OwnerIdentity, OwnerResolver};
pub use queue_inventory::QueueInventory;
pub use time_provider::TimeProvider;
