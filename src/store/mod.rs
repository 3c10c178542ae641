//! Persistence seam for users, work orders and their status logs.
//!
//! Implementations must make each mutating call atomic: a work order row and
//! the log entry written with it either both land or neither does.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::audit::StatusLogEntry;
use crate::config::TrackerConfig;
use crate::identity::{Role, User};
use crate::work_orders::{Page, WorkOrder, WorkOrderNumber, WorkOrderQuery};

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

pub mod memory;

pub use memory::InMemoryStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("work order number {number} is already taken")]
    DuplicateNumber { number: WorkOrderNumber },

    #[error("user handle '{handle}' is already taken")]
    DuplicateHandle { handle: String },

    #[error("work order {id} does not exist")]
    WorkOrderNotFound { id: Uuid },

    #[error("work order {id} is at version {found}, expected {expected}")]
    VersionMismatch { id: Uuid, expected: u64, found: u64 },

    #[error("unknown {entity} {id}")]
    MissingReference { entity: &'static str, id: Uuid },

    #[error("corrupt record: {reason}")]
    Corrupt { reason: String },

    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[cfg(feature = "database")]
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait WorkOrderStore: Send + Sync {
    async fn insert_user(&self, user: User) -> Result<(), StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_handle(&self, handle: &str) -> Result<Option<User>, StoreError>;

    async fn users_with_role(&self, role: Role) -> Result<Vec<User>, StoreError>;

    /// Atomically allocate the next sequence value for `date`, starting at 1.
    async fn next_sequence(&self, date: NaiveDate) -> Result<u32, StoreError>;

    /// The value [`WorkOrderStore::next_sequence`] would return, without allocating it.
    async fn peek_sequence(&self, date: NaiveDate) -> Result<u32, StoreError>;

    /// Insert a new work order together with its initial log entry.
    async fn insert_work_order(
        &self,
        order: WorkOrder,
        entry: StatusLogEntry,
    ) -> Result<(), StoreError>;

    async fn find_work_order(&self, id: Uuid) -> Result<Option<WorkOrder>, StoreError>;

    /// Lookup by number, ignoring any operator scope.
    async fn find_work_order_by_number(
        &self,
        number: &WorkOrderNumber,
    ) -> Result<Option<WorkOrder>, StoreError>;

    /// Replace the stored row if it is still at `expected_version`, appending
    /// `entry` in the same transaction.
    async fn save_work_order(
        &self,
        order: WorkOrder,
        expected_version: u64,
        entry: Option<StatusLogEntry>,
    ) -> Result<(), StoreError>;

    async fn append_log(&self, entry: StatusLogEntry) -> Result<(), StoreError>;

    /// Log entries for one work order, most recent first.
    async fn history(&self, work_order_id: Uuid) -> Result<Vec<StatusLogEntry>, StoreError>;

    /// Matching work orders, newest created first.
    async fn query_work_orders(&self, query: WorkOrderQuery) -> Result<Page<WorkOrder>, StoreError>;
}

/// Pick the store implementation for this build and configuration.
pub async fn open_store(config: &TrackerConfig) -> anyhow::Result<Arc<dyn WorkOrderStore>> {
    #[cfg(feature = "database")]
    if let Some(db) = &config.database {
        info!(url = %db.url, "Opening SQLite work order store");
        let store = crate::database::SqliteStore::new(&db.url, db.max_connections, db.auto_migrate).await?;
        return Ok(Arc::new(store));
    }

    #[cfg(not(feature = "database"))]
    if config.database.is_some() {
        warn!("Database configured but the database feature is not enabled");
    }

    warn!("Using in-memory work order store; nothing will be persisted");
    Ok(Arc::new(InMemoryStore::new()))
}
