// Shared setup for the work order integration tests.
#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use uuid::Uuid;

use work_order_tracker::config::WorkOrdersConfig;
use work_order_tracker::{
    FixedClock, InMemoryStore, Role, User, WorkOrderInput, WorkOrderService, WorkOrderStore,
};

/// The simulated "today" for every fixture.
pub fn sim_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 7, 9, 30, 0).unwrap()
}

pub fn user(handle: &str, role: Option<Role>) -> User {
    User {
        id: Uuid::new_v4(),
        handle: handle.to_string(),
        name: handle.to_uppercase(),
        role,
        password_hash: String::new(),
        created_at: sim_now(),
    }
}

/// A production floor: one manager, two operators and a user with no role.
pub struct Floor {
    pub store: Arc<dyn WorkOrderStore>,
    pub clock: Arc<FixedClock>,
    pub service: WorkOrderService,
    pub manager: User,
    pub o1: User,
    pub o2: User,
    pub nobody: User,
}

impl Floor {
    pub async fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::new())).await
    }

    pub async fn with_store(store: Arc<dyn WorkOrderStore>) -> Self {
        let manager = user("pm", Some(Role::ProductionManager));
        let o1 = user("o1", Some(Role::Operator));
        let o2 = user("o2", Some(Role::Operator));
        let nobody = user("nobody", None);
        for u in [&manager, &o1, &o2, &nobody] {
            store.insert_user(u.clone()).await.unwrap();
        }

        let clock = Arc::new(FixedClock::new(sim_now()));
        let service = WorkOrderService::new(store.clone(), clock.clone(), WorkOrdersConfig::default());
        Self {
            store,
            clock,
            service,
            manager,
            o1,
            o2,
            nobody,
        }
    }

    /// Advance the clock one second so successive writes get distinct timestamps.
    pub fn tick(&self) {
        self.clock.advance(chrono::Duration::seconds(1));
    }
}

pub fn order_input(operator: &User) -> WorkOrderInput {
    WorkOrderInput {
        product_name: "Hydraulic pump".to_string(),
        quantity: 100,
        deadline: "2025-03-31".to_string(),
        status: "Pending".to_string(),
        operator_id: operator.id,
        notes: None,
    }
}
