// Application Layer - Use Cases and Business Logic

pub mod factory;
pub mod job_service;
pub mod processor;
pub mod recovery;
pub mod worker;

// Re-exports
pub use factory::{CreateJobRequest, FactoryContext, JobConstructor, JobFactoryRegistry};
pub use job_service::JobService;
pub use processor::{processor_for, Processor};
pub use recovery::RecoveryService;
pub use worker::{
    completion_channel, shutdown_channel, Completer, Completion, CompletionSink, ShutdownSender,
    ShutdownToken, Worker,
};
