// Domain Layer - Pure business logic and entities

pub mod error;
pub mod job;
pub mod key;
pub mod payload;
pub mod queue;
pub mod scheme;

// Re-exports
pub use error::DomainError;
pub use job::{Job, JobId, JobState, OperationCategory, OwnerId, ENCRYPTED_SUFFIX};
pub use key::{ArmoredKey, KeyRef, Passphrase, SecretKeyMaterial};
pub use payload::JobPayload;
pub use queue::{QueueAssignment, QueueId, QueueRouting, Task, TaskId, TaskState};
pub use scheme::Scheme;
