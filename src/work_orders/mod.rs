// Work order entity, numbering, validation, the operator transition engine
// and the service that ties them to storage.

pub mod number;
pub mod query;
pub mod service;
pub mod state_machine;
pub mod types;
pub mod validation;

pub use number::{WorkOrderNumber, MAX_DAILY_SEQUENCE};
pub use query::{Page, WorkOrderFilter, WorkOrderQuery, PAGE_SIZE};
pub use service::{WorkOrderDetail, WorkOrderService};
pub use state_machine::{OperatorTransition, TransitionEngine, TransitionOutcome, TransitionRequest};
pub use types::{WorkOrder, WorkOrderStatus};
pub use validation::{ValidWorkOrder, WorkOrderInput};
