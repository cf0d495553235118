//! Student records store.
//!
//! Postgres-backed through sqlx. The messaging core never touches it; when no
//! database is configured the student endpoints fail on their own.

pub mod models;
pub mod operations;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::error::DatabaseError;

pub use models::{Student, StudentIn};
pub use operations::DbOperations;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudentStore: Send + Sync {
    async fn create_student(&self, student: &StudentIn) -> Result<(), DatabaseError>;

    /// All students, ordered by id.
    async fn list_students(&self) -> Result<Vec<Student>, DatabaseError>;

    /// Runs the schema script at `path` if it exists. Returns whether it ran.
    async fn apply_migrations(&self, path: &Path) -> Result<bool, DatabaseError>;

    async fn close(&self);
}

/// Connects and migrates on a best-effort basis. `None` means the student API is disabled.
pub async fn init_store(config: &DatabaseConfig) -> Option<Arc<dyn StudentStore>> {
    let Some(url) = config.url.as_deref() else {
        warn!("Database pool init failed: DATABASE_URL is not set");
        return None;
    };

    let ops = match DbOperations::new_with_options(
        url,
        config.max_connections,
        Duration::from_secs(config.acquire_timeout_secs),
    )
    .await
    {
        Ok(ops) => ops,
        Err(e) => {
            warn!("Database pool init failed: {}", e);
            return None;
        }
    };
    info!("Database pool ready ({} max connections)", config.max_connections);

    if let Err(e) = ops.apply_migrations(Path::new(&config.migrations_path)).await {
        warn!("Failed to apply {}: {}", config.migrations_path, e);
    }

    Some(Arc::new(ops))
}
