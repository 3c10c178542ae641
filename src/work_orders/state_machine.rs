// Operator-driven status transitions.
// A transition either lands completely (row + log entry) or leaves no trace.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::types::{WorkOrder, WorkOrderStatus};
use super::validation::validate_quantity_change;
use crate::audit::StatusLogEntry;
use crate::clock::Clock;
use crate::errors::TrackerError;
use crate::identity::{authorize, Action, Denial, User};
use crate::store::{StoreError, WorkOrderStore};

/// The edges of the operator transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorTransition {
    StartWork,
    CompleteWork,
}

impl OperatorTransition {
    /// The legal edge from `from` to `to`, if there is one.
    pub fn between(from: WorkOrderStatus, to: WorkOrderStatus) -> Option<Self> {
        match (from, to) {
            (WorkOrderStatus::Pending, WorkOrderStatus::InProgress) => Some(Self::StartWork),
            (WorkOrderStatus::InProgress, WorkOrderStatus::Completed) => Some(Self::CompleteWork),
            _ => None,
        }
    }

    pub fn from_status(&self) -> WorkOrderStatus {
        match self {
            Self::StartWork => WorkOrderStatus::Pending,
            Self::CompleteWork => WorkOrderStatus::InProgress,
        }
    }

    pub fn to_status(&self) -> WorkOrderStatus {
        match self {
            Self::StartWork => WorkOrderStatus::InProgress,
            Self::CompleteWork => WorkOrderStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub work_order_id: Uuid,
    pub requested: WorkOrderStatus,
    /// Replaces the stored quantity; not a delta.
    pub quantity_change: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub order: WorkOrder,
    pub entry: StatusLogEntry,
}

impl TransitionOutcome {
    pub fn previous_status(&self) -> Option<WorkOrderStatus> {
        self.entry.previous_status
    }
}

pub struct TransitionEngine {
    store: Arc<dyn WorkOrderStore>,
    clock: Arc<dyn Clock>,
}

impl TransitionEngine {
    pub fn new(store: Arc<dyn WorkOrderStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Authorize, check the edge, then write the order and its log entry
    /// under a version check. Nothing is written on any rejection.
    pub async fn execute_atomic_transition(
        &self,
        actor: &User,
        request: TransitionRequest,
    ) -> Result<TransitionOutcome, TrackerError> {
        authorize(actor, Action::UpdateWorkOrderStatus).map_err(|denial| {
            warn!(actor_id = %actor.id, %denial, "Transition rejected");
            TrackerError::forbidden(actor.id, denial)
        })?;

        let current = self
            .store
            .find_work_order(request.work_order_id)
            .await?
            .ok_or(TrackerError::NotFound {
                id: request.work_order_id,
            })?;

        if !current.is_assigned_to(actor.id) {
            warn!(
                actor_id = %actor.id,
                work_order_id = %current.id,
                "Transition rejected: not the assigned operator"
            );
            return Err(TrackerError::forbidden(actor.id, Denial::NotAssignedOperator));
        }

        let Some(edge) = OperatorTransition::between(current.status, request.requested) else {
            warn!(
                work_order_id = %current.id,
                from = %current.status,
                to = %request.requested,
                "Transition rejected: not a legal edge"
            );
            return Err(TrackerError::InvalidTransition {
                from: current.status,
                to: request.requested,
            });
        };

        let quantity = validate_quantity_change(request.quantity_change).map_err(TrackerError::Validation)?;

        let now = self.clock.now();
        let expected_version = current.version;
        let mut updated = current.clone();
        updated.status = edge.to_status();
        updated.quantity = quantity;
        updated.updated_at = now;
        updated.version = expected_version + 1;

        let entry = StatusLogEntry::transition(
            current.id,
            edge.from_status(),
            edge.to_status(),
            request.notes,
            actor.id,
            now,
        );

        self.store
            .save_work_order(updated.clone(), expected_version, Some(entry.clone()))
            .await
            .map_err(|e| {
                if matches!(e, StoreError::VersionMismatch { .. }) {
                    warn!(work_order_id = %current.id, expected_version, "Transition lost a concurrent write");
                }
                TrackerError::from_save(e)
            })?;

        info!(
            work_order_id = %updated.id,
            number = %updated.number,
            actor_id = %actor.id,
            from = %current.status,
            to = %updated.status,
            quantity = updated.quantity,
            "Work order status transitioned"
        );

        Ok(TransitionOutcome { order: updated, entry })
    }
}
