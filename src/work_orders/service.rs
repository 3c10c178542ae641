use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use super::number::WorkOrderNumber;
use super::query::{Page, WorkOrderFilter, WorkOrderQuery, PAGE_SIZE};
use super::state_machine::{TransitionEngine, TransitionRequest};
use super::types::{WorkOrder, WorkOrderStatus};
use super::validation::{ValidWorkOrder, WorkOrderInput};
use crate::audit::{AuditLog, StatusLogEntry};
use crate::clock::Clock;
use crate::config::WorkOrdersConfig;
use crate::errors::{TrackerError, ValidationErrors};
use crate::identity::{authorize, Action, Denial, Role, User};
use crate::store::{StoreError, WorkOrderStore};
use crate::telemetry::{create_work_order_span, generate_correlation_id};

/// A work order together with its status history, most recent entry first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkOrderDetail {
    pub order: WorkOrder,
    pub history: Vec<StatusLogEntry>,
}

/// Entry point for every work order operation. Each call takes the acting user
/// explicitly and checks it against the permission table before touching the store.
pub struct WorkOrderService {
    store: Arc<dyn WorkOrderStore>,
    clock: Arc<dyn Clock>,
    audit: AuditLog,
    engine: TransitionEngine,
    settings: WorkOrdersConfig,
}

fn check(actor: &User, action: Action) -> Result<(), TrackerError> {
    authorize(actor, action).map_err(|denial| {
        warn!(actor_id = %actor.id, %denial, "Request rejected");
        TrackerError::forbidden(actor.id, denial)
    })
}

impl WorkOrderService {
    pub fn new(store: Arc<dyn WorkOrderStore>, clock: Arc<dyn Clock>, settings: WorkOrdersConfig) -> Self {
        Self {
            audit: AuditLog::new(store.clone()),
            engine: TransitionEngine::new(store.clone(), clock.clone()),
            store,
            clock,
            settings,
        }
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Field checks plus the assigned operator lookup, all reported together.
    async fn validate(&self, input: &WorkOrderInput) -> Result<ValidWorkOrder, TrackerError> {
        let fields = input.validate();
        let mut errors = fields.as_ref().err().cloned().unwrap_or_else(ValidationErrors::new);
        match self.store.find_user(input.operator_id).await? {
            Some(user) if user.role == Some(Role::Operator) => {}
            Some(_) => errors.add("operator_id", "is not an operator"),
            None => errors.add("operator_id", "does not exist"),
        }
        match fields {
            Ok(valid) if errors.is_empty() => Ok(valid),
            _ => Err(TrackerError::Validation(errors)),
        }
    }

    pub async fn create_work_order(&self, input: WorkOrderInput, actor: &User) -> Result<WorkOrder, TrackerError> {
        let correlation_id = generate_correlation_id();
        let span = create_work_order_span("create_work_order", None, Some(actor.id), Some(&correlation_id));

        async {
            check(actor, Action::CreateWorkOrder)?;
            let valid = self.validate(&input).await?;
            let today = self.clock.today();

            let mut last_error = None;
            for attempt in 1..=self.settings.max_number_attempts.max(1) {
                let sequence = self.store.next_sequence(today).await?;
                let number = WorkOrderNumber::new(today, sequence)
                    .ok_or(TrackerError::SequenceExhausted { date: today })?;

                let now = self.clock.now();
                let order = WorkOrder {
                    id: Uuid::new_v4(),
                    number,
                    product_name: valid.product_name.clone(),
                    quantity: valid.quantity,
                    deadline: valid.deadline,
                    status: valid.status,
                    operator_id: valid.operator_id,
                    created_by: actor.id,
                    created_at: now,
                    updated_at: now,
                    version: 1,
                };
                let entry = StatusLogEntry::initial(order.id, order.status, valid.notes.clone(), actor.id, now);

                match self.store.insert_work_order(order.clone(), entry).await {
                    Ok(()) => {
                        info!(
                            work_order_id = %order.id,
                            number = %order.number,
                            status = %order.status,
                            operator_id = %order.operator_id,
                            "Work order created"
                        );
                        return Ok(order);
                    }
                    Err(StoreError::DuplicateNumber { number }) => {
                        warn!(%number, attempt, "Work order number already taken, allocating another");
                        last_error = Some(StoreError::DuplicateNumber { number });
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            Err(last_error
                .map(TrackerError::Storage)
                .unwrap_or(TrackerError::SequenceExhausted { date: today }))
        }
        .instrument(span)
        .await
    }

    /// Production manager edit. Any status value is accepted here; a log entry
    /// is written only when the status actually changes.
    pub async fn update_work_order(
        &self,
        id: Uuid,
        input: WorkOrderInput,
        actor: &User,
    ) -> Result<WorkOrder, TrackerError> {
        let correlation_id = generate_correlation_id();
        let span = create_work_order_span("update_work_order", Some(id), Some(actor.id), Some(&correlation_id));

        async {
            check(actor, Action::UpdateWorkOrder)?;
            let current = self.load(id).await?;
            let valid = self.validate(&input).await?;
            if valid.operator_id != current.operator_id {
                check(actor, Action::AssignOperator)?;
            }

            let now = self.clock.now();
            let mut updated = current.clone();
            updated.product_name = valid.product_name;
            updated.quantity = valid.quantity;
            updated.deadline = valid.deadline;
            updated.operator_id = valid.operator_id;
            updated.status = valid.status;
            updated.updated_at = now;
            updated.version = current.version + 1;

            let entry = (current.status != updated.status).then(|| {
                StatusLogEntry::transition(id, current.status, updated.status, valid.notes, actor.id, now)
            });

            self.store
                .save_work_order(updated.clone(), current.version, entry)
                .await
                .map_err(TrackerError::from_save)?;

            info!(
                work_order_id = %id,
                number = %updated.number,
                from = %current.status,
                to = %updated.status,
                "Work order updated"
            );
            Ok(updated)
        }
        .instrument(span)
        .await
    }

    /// Operator-driven move along the legal transition graph.
    pub async fn transition_status(
        &self,
        id: Uuid,
        requested: WorkOrderStatus,
        quantity_change: i64,
        notes: Option<String>,
        actor: &User,
    ) -> Result<WorkOrder, TrackerError> {
        let correlation_id = generate_correlation_id();
        let span = create_work_order_span("transition_status", Some(id), Some(actor.id), Some(&correlation_id));

        let request = TransitionRequest {
            work_order_id: id,
            requested,
            quantity_change,
            notes,
        };
        let outcome = self
            .engine
            .execute_atomic_transition(actor, request)
            .instrument(span)
            .await?;
        Ok(outcome.order)
    }

    /// Sets the status to Canceled from any state and logs it with the configured note.
    pub async fn cancel_work_order(&self, id: Uuid, actor: &User) -> Result<WorkOrder, TrackerError> {
        let correlation_id = generate_correlation_id();
        let span = create_work_order_span("cancel_work_order", Some(id), Some(actor.id), Some(&correlation_id));

        async {
            check(actor, Action::UpdateWorkOrder)?;
            let current = self.load(id).await?;

            let now = self.clock.now();
            let mut updated = current.clone();
            updated.status = WorkOrderStatus::Canceled;
            updated.updated_at = now;
            updated.version = current.version + 1;

            let entry = StatusLogEntry::transition(
                id,
                current.status,
                WorkOrderStatus::Canceled,
                Some(self.settings.cancel_note.clone()),
                actor.id,
                now,
            );
            self.store
                .save_work_order(updated.clone(), current.version, Some(entry))
                .await
                .map_err(TrackerError::from_save)?;

            info!(work_order_id = %id, number = %updated.number, from = %current.status, "Work order canceled");
            Ok(updated)
        }
        .instrument(span)
        .await
    }

    /// Managers see every order; operators only their own assignments.
    pub async fn get_work_order(&self, id: Uuid, actor: &User) -> Result<WorkOrderDetail, TrackerError> {
        let correlation_id = generate_correlation_id();
        let span = create_work_order_span("get_work_order", Some(id), Some(actor.id), Some(&correlation_id));

        async {
            let sees_all = actor.can(Action::ViewWorkOrders);
            if !sees_all {
                check(actor, Action::ViewAssignedWorkOrders)?;
            }
            let order = self.load(id).await?;
            if !sees_all && !order.is_assigned_to(actor.id) {
                warn!(actor_id = %actor.id, work_order_id = %id, "Work order view rejected");
                return Err(TrackerError::forbidden(actor.id, Denial::NotAssignedOperator));
            }
            let history = self.audit.history(id).await?;
            Ok(WorkOrderDetail { order, history })
        }
        .instrument(span)
        .await
    }

    /// One page of matching orders, newest first. Operators are always scoped
    /// to their own assignments whatever the filter says.
    pub async fn list_work_orders(
        &self,
        actor: &User,
        filter: WorkOrderFilter,
        page: u32,
    ) -> Result<Page<WorkOrder>, TrackerError> {
        let correlation_id = generate_correlation_id();
        let span = create_work_order_span("list_work_orders", None, Some(actor.id), Some(&correlation_id));

        async {
            let operator_id = if actor.can(Action::ViewWorkOrders) {
                None
            } else {
                check(actor, Action::ViewAssignedWorkOrders)?;
                Some(actor.id)
            };
            let query = WorkOrderQuery {
                filter,
                operator_id,
                page: page.max(1),
                per_page: PAGE_SIZE,
            };
            Ok(self.store.query_work_orders(query).await?)
        }
        .instrument(span)
        .await
    }

    /// The number the next creation today would receive. Not reserved.
    pub async fn preview_number(&self) -> Result<WorkOrderNumber, TrackerError> {
        let today = self.clock.today();
        let sequence = self.store.peek_sequence(today).await?;
        WorkOrderNumber::new(today, sequence).ok_or(TrackerError::SequenceExhausted { date: today })
    }

    async fn load(&self, id: Uuid) -> Result<WorkOrder, TrackerError> {
        self.store
            .find_work_order(id)
            .await?
            .ok_or(TrackerError::NotFound { id })
    }
}
