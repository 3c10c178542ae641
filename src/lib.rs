// Work Order Tracker Library - role-gated production work orders
// This exposes the core components for testing and integration

pub mod audit;
pub mod cli;
pub mod clock;
pub mod config;
#[cfg(feature = "database")]
pub mod database;
pub mod errors;
pub mod identity;
pub mod store;
pub mod telemetry;
pub mod work_orders;

// Re-export key types for easy access
pub use audit::{AuditLog, StatusLogEntry};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{config, TrackerConfig};
#[cfg(feature = "database")]
pub use database::SqliteStore;
pub use errors::{FieldError, TrackerError, ValidationErrors};
pub use identity::{authorize, has_permission, Action, Denial, NewUser, Role, User, UserDirectory};
pub use store::{open_store, InMemoryStore, StoreError, WorkOrderStore};
pub use telemetry::{create_work_order_span, generate_correlation_id, init_telemetry};
pub use work_orders::{
    Page, WorkOrder, WorkOrderDetail, WorkOrderFilter, WorkOrderInput, WorkOrderNumber, WorkOrderService,
    WorkOrderStatus, PAGE_SIZE,
};
