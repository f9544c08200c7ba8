// cryptq Infrastructure - SQLite Adapter
// Implements: JobInventory, QueueInventory

mod connection;
mod error;
mod job_inventory;
mod migration;
mod queue_inventory;

pub use connection::create_pool;
pub use job_inventory::SqliteJobInventory;
pub use migration::run_migrations;
pub use queue_inventory::SqliteQueueInventory;

// Note: sqlx::Error conversion is handled by a helper function
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
