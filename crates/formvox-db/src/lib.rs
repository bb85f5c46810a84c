//! SQLite persistence for formvox.
//!
//! Connection pooling with `r2d2`, WAL-mode connections, embedded
//! migrations, and storage of submitted answer sets.

mod migrations;
mod pool;
pub mod store;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, open_database, DbPool, DbRuntimeSettings, PoolError};
pub use store::{get_submission, insert_submission, StoreError, StoredSubmission};
