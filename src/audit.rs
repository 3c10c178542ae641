//! Append-only status history.
//!
//! Entries are written in the same store transaction as the status change they
//! describe. The first entry of every work order has no previous status; read in
//! creation order they replay the order's full status history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::store::{StoreError, WorkOrderStore};
use crate::work_orders::WorkOrderStatus;

/// One recorded status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLogEntry {
    pub id: Uuid,
    pub work_order_id: Uuid,
    pub previous_status: Option<WorkOrderStatus>,
    pub new_status: WorkOrderStatus,
    pub notes: Option<String>,
    pub changed_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl StatusLogEntry {
    /// Entry written when a work order is created.
    pub fn initial(
        work_order_id: Uuid,
        status: WorkOrderStatus,
        notes: Option<String>,
        changed_by: Uuid,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            work_order_id,
            previous_status: None,
            new_status: status,
            notes: normalize_notes(notes),
            changed_by,
            created_at: at,
        }
    }

    /// Entry written for an accepted change from `from` to `to`.
    pub fn transition(
        work_order_id: Uuid,
        from: WorkOrderStatus,
        to: WorkOrderStatus,
        notes: Option<String>,
        changed_by: Uuid,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            work_order_id,
            previous_status: Some(from),
            new_status: to,
            notes: normalize_notes(notes),
            changed_by,
            created_at: at,
        }
    }

    pub fn is_initial(&self) -> bool {
        self.previous_status.is_none()
    }
}

/// Blank notes are stored as absent.
fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Read side of the status history plus a raw append for callers outside the
/// transition engine.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn WorkOrderStore>,
}

impl AuditLog {
    pub fn new(store: Arc<dyn WorkOrderStore>) -> Self {
        Self { store }
    }

    /// Insert-only. Fails only when the work order or the changing user is unknown.
    pub async fn append(&self, entry: StatusLogEntry) -> Result<(), StoreError> {
        self.store.append_log(entry.clone()).await?;
        info!(
            work_order_id = %entry.work_order_id,
            changed_by = %entry.changed_by,
            previous_status = ?entry.previous_status,
            new_status = %entry.new_status,
            "Status log entry appended"
        );
        Ok(())
    }

    /// Entries for one work order, most recent first.
    pub async fn history(&self, work_order_id: Uuid) -> Result<Vec<StatusLogEntry>, StoreError> {
        let entries = self.store.history(work_order_id).await?;
        debug!(work_order_id = %work_order_id, entries = entries.len(), "Loaded status history");
        Ok(entries)
    }

    /// Notes attached to the most recent entry, if it has any.
    pub async fn latest_notes(&self, work_order_id: Uuid) -> Result<Option<String>, StoreError> {
        Ok(self
            .history(work_order_id)
            .await?
            .into_iter()
            .next()
            .and_then(|entry| entry.notes))
    }
}

/// Replays entries (any order) into the sequence of statuses they describe,
/// oldest first. Returns `None` if the entries do not form one unbroken chain.
pub fn replay(entries: &[StatusLogEntry]) -> Option<Vec<WorkOrderStatus>> {
    let mut ordered: Vec<&StatusLogEntry> = entries.iter().collect();
    ordered.reverse();
    ordered.sort_by_key(|entry| entry.created_at);

    let (first, rest) = ordered.split_first()?;
    if !first.is_initial() {
        return None;
    }
    let mut statuses = vec![first.new_status];
    for entry in rest {
        let current = *statuses.last()?;
        if entry.previous_status != Some(current) {
            return None;
        }
        statuses.push(entry.new_status);
    }
    Some(statuses)
}
