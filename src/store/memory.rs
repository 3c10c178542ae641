use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{StoreError, WorkOrderStore};
use crate::audit::StatusLogEntry;
use crate::identity::{Role, User};
use crate::work_orders::{Page, WorkOrder, WorkOrderNumber, WorkOrderQuery};

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    orders: HashMap<Uuid, WorkOrder>,
    /// Insertion order, used as the tie-breaker for equal timestamps.
    logs: Vec<StatusLogEntry>,
    sequences: HashMap<NaiveDate, u32>,
}

impl State {
    fn require_user(&self, id: Uuid) -> Result<(), StoreError> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference { entity: "user", id })
        }
    }

    fn check_entry(&self, entry: &StatusLogEntry) -> Result<(), StoreError> {
        if !self.orders.contains_key(&entry.work_order_id) {
            return Err(StoreError::MissingReference {
                entity: "work order",
                id: entry.work_order_id,
            });
        }
        self.require_user(entry.changed_by)
    }
}

/// Store kept entirely in process memory. One lock guards everything, so every
/// call is trivially atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkOrderStore for InMemoryStore {
    async fn insert_user(&self, user: User) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.handle == user.handle) {
            return Err(StoreError::DuplicateHandle { handle: user.handle });
        }
        state.users.insert(user.id, user);
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_handle(&self, handle: &str) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.handle == handle).cloned())
    }

    async fn users_with_role(&self, role: Role) -> Result<Vec<User>, StoreError> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = state
            .users
            .values()
            .filter(|u| u.role == Some(role))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.handle.cmp(&b.handle)));
        Ok(users)
    }

    async fn next_sequence(&self, date: NaiveDate) -> Result<u32, StoreError> {
        let mut state = self.state.lock().await;
        let counter = state.sequences.entry(date).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn peek_sequence(&self, date: NaiveDate) -> Result<u32, StoreError> {
        let state = self.state.lock().await;
        Ok(state.sequences.get(&date).copied().unwrap_or(0) + 1)
    }

    async fn insert_work_order(
        &self,
        order: WorkOrder,
        entry: StatusLogEntry,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.orders.values().any(|o| o.number == order.number) {
            return Err(StoreError::DuplicateNumber { number: order.number });
        }
        state.require_user(order.created_by)?;
        state.require_user(order.operator_id)?;
        state.require_user(entry.changed_by)?;
        if entry.work_order_id != order.id {
            return Err(StoreError::MissingReference {
                entity: "work order",
                id: entry.work_order_id,
            });
        }
        state.orders.insert(order.id, order);
        state.logs.push(entry);
        Ok(())
    }

    async fn find_work_order(&self, id: Uuid) -> Result<Option<WorkOrder>, StoreError> {
        Ok(self.state.lock().await.orders.get(&id).cloned())
    }

    async fn find_work_order_by_number(
        &self,
        number: &WorkOrderNumber,
    ) -> Result<Option<WorkOrder>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.orders.values().find(|order| &order.number == number).cloned())
    }

    async fn save_work_order(
        &self,
        order: WorkOrder,
        expected_version: u64,
        entry: Option<StatusLogEntry>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let found = state
            .orders
            .get(&order.id)
            .map(|o| o.version)
            .ok_or(StoreError::WorkOrderNotFound { id: order.id })?;
        if found != expected_version {
            return Err(StoreError::VersionMismatch {
                id: order.id,
                expected: expected_version,
                found,
            });
        }
        state.require_user(order.operator_id)?;
        if let Some(entry) = &entry {
            state.check_entry(entry)?;
        }
        state.orders.insert(order.id, order);
        if let Some(entry) = entry {
            state.logs.push(entry);
        }
        Ok(())
    }

    async fn append_log(&self, entry: StatusLogEntry) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.check_entry(&entry)?;
        state.logs.push(entry);
        Ok(())
    }

    async fn history(&self, work_order_id: Uuid) -> Result<Vec<StatusLogEntry>, StoreError> {
        let state = self.state.lock().await;
        // Reverse first so the stable sort keeps later inserts ahead on equal timestamps.
        let mut entries: Vec<StatusLogEntry> = state
            .logs
            .iter()
            .rev()
            .filter(|e| e.work_order_id == work_order_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn query_work_orders(&self, query: WorkOrderQuery) -> Result<Page<WorkOrder>, StoreError> {
        let state = self.state.lock().await;
        let mut matching: Vec<&WorkOrder> = state.orders.values().filter(|o| query.matches(o)).collect();
        matching.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.number.cmp(&a.number))
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(usize::try_from(query.offset()).unwrap_or(usize::MAX))
            .take(query.per_page as usize)
            .cloned()
            .collect();
        Ok(Page::new(items, query.page, query.per_page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work_orders::{WorkOrderNumber, WorkOrderStatus};
    use chrono::Utc;

    fn user(handle: &str, role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            handle: handle.to_string(),
            name: handle.to_uppercase(),
            role: Some(role),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    fn order(manager: &User, operator: &User, seq: u32) -> WorkOrder {
        let now = Utc::now();
        WorkOrder {
            id: Uuid::new_v4(),
            number: WorkOrderNumber::new(now.date_naive(), seq).unwrap(),
            product_name: "Bracket".to_string(),
            quantity: 3,
            deadline: now.date_naive(),
            status: WorkOrderStatus::Pending,
            operator_id: operator.id,
            created_by: manager.id,
            created_at: now,
            updated_at: now,
            version: 1,
        }
    }

    async fn seeded() -> (InMemoryStore, User, User) {
        let store = InMemoryStore::new();
        let manager = user("manager", Role::ProductionManager);
        let operator = user("operator", Role::Operator);
        store.insert_user(manager.clone()).await.unwrap();
        store.insert_user(operator.clone()).await.unwrap();
        (store, manager, operator)
    }

    #[tokio::test]
    async fn test_sequence_counter_is_per_date() {
        let store = InMemoryStore::new();
        let today = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
        let tomorrow = today.succ_opt().unwrap();

        assert_eq!(store.peek_sequence(today).await.unwrap(), 1);
        assert_eq!(store.next_sequence(today).await.unwrap(), 1);
        assert_eq!(store.next_sequence(today).await.unwrap(), 2);
        assert_eq!(store.peek_sequence(today).await.unwrap(), 3);
        assert_eq!(store.next_sequence(tomorrow).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_handle_rejected() {
        let (store, _, _) = seeded().await;
        let err = store
            .insert_user(user("manager", Role::Operator))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateHandle { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_number_rejected() {
        let (store, manager, operator) = seeded().await;
        let first = order(&manager, &operator, 1);
        let second = order(&manager, &operator, 1);
        let entry = |o: &WorkOrder| StatusLogEntry::initial(o.id, o.status, None, manager.id, o.created_at);

        store.insert_work_order(first.clone(), entry(&first)).await.unwrap();
        let err = store
            .insert_work_order(second.clone(), entry(&second))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateNumber { .. }));
        assert!(store.find_work_order(second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected_without_logging() {
        let (store, manager, operator) = seeded().await;
        let original = order(&manager, &operator, 1);
        let initial = StatusLogEntry::initial(original.id, original.status, None, manager.id, original.created_at);
        store.insert_work_order(original.clone(), initial).await.unwrap();

        let mut updated = original.clone();
        updated.status = WorkOrderStatus::InProgress;
        updated.version = 2;
        let entry = StatusLogEntry::transition(
            original.id,
            WorkOrderStatus::Pending,
            WorkOrderStatus::InProgress,
            None,
            operator.id,
            Utc::now(),
        );
        store.save_work_order(updated.clone(), 1, Some(entry.clone())).await.unwrap();

        let err = store
            .save_work_order(updated, 1, Some(entry))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionMismatch { expected: 1, found: 2, .. }));
        assert_eq!(store.history(original.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_append_log_checks_references() {
        let (store, manager, _) = seeded().await;
        let entry = StatusLogEntry::initial(Uuid::new_v4(), WorkOrderStatus::Pending, None, manager.id, Utc::now());
        let err = store.append_log(entry).await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference { entity: "work order", .. }));
    }

    #[tokio::test]
    async fn test_history_is_newest_first_with_stable_ties() {
        let (store, manager, operator) = seeded().await;
        let o = order(&manager, &operator, 1);
        let at = o.created_at;
        store
            .insert_work_order(o.clone(), StatusLogEntry::initial(o.id, WorkOrderStatus::Pending, None, manager.id, at))
            .await
            .unwrap();
        store
            .append_log(StatusLogEntry::transition(o.id, WorkOrderStatus::Pending, WorkOrderStatus::InProgress, None, operator.id, at))
            .await
            .unwrap();

        let history = store.history(o.id).await.unwrap();
        assert_eq!(history[0].new_status, WorkOrderStatus::InProgress);
        assert!(history[1].is_initial());
    }
}
