//! Database connection pool and embedded migrations.
//!
//! Async PostgreSQL pooling through diesel_async with bb8.

mod migrate;
mod pool;

pub use migrate::{pending_migrations, revert_migrations, run_pending_migrations};
pub use pool::{AsyncDbPool, MIGRATIONS, establish_async_connection_pool};
