use anyhow::{anyhow, Result};

use super::{Command, Session};
use crate::work_orders::WorkOrderStatus;

/// Operator transition along Pending -> In Progress -> Completed.
pub struct StatusCommand {
    pub id: String,
    pub to: String,
    pub quantity: i64,
    pub notes: Option<String>,
}

impl Command for StatusCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let requested: WorkOrderStatus = self.to.parse().map_err(|e: String| anyhow!(e))?;
        let actor = session.actor().await?;
        let id = session.resolve_work_order(&self.id).await?;

        let order = session
            .service
            .transition_status(id, requested, self.quantity, self.notes.clone(), &actor)
            .await?;

        println!("✅ {} is now {}", order.number, order.status);
        println!("   📦 Quantity: {}", order.quantity);
        if order.status.is_terminal() {
            println!("   🏁 No further transitions from here");
        }
        Ok(())
    }
}
