use anyhow::Result;

use super::{Command, Session};
use crate::work_orders::WorkOrderInput;

pub struct CreateCommand {
    pub product: String,
    pub quantity: i64,
    pub deadline: String,
    pub operator: String,
    pub status: String,
    pub notes: Option<String>,
}

impl Command for CreateCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let actor = session.actor().await?;
        let operator_id = session.operator_id(&self.operator).await?;
        let order = session
            .service
            .create_work_order(
                WorkOrderInput {
                    product_name: self.product.clone(),
                    quantity: self.quantity,
                    deadline: self.deadline.clone(),
                    status: self.status.clone(),
                    operator_id,
                    notes: self.notes.clone(),
                },
                &actor,
            )
            .await?;

        println!("✅ Created {} ({})", order.number, order.id);
        println!("   📦 {} x {} due {}", order.quantity, order.product_name, order.deadline);
        println!("   👷 Assigned to {} - {}", self.operator, order.status);
        Ok(())
    }
}

/// Unset fields keep their stored values.
pub struct UpdateCommand {
    pub id: String,
    pub product: Option<String>,
    pub quantity: Option<i64>,
    pub deadline: Option<String>,
    pub operator: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
}

impl Command for UpdateCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let actor = session.actor().await?;
        let id = session.resolve_work_order(&self.id).await?;
        let current = session.service.get_work_order(id, &actor).await?.order;

        let operator_id = match &self.operator {
            Some(handle) => session.operator_id(handle).await?,
            None => current.operator_id,
        };
        let input = WorkOrderInput {
            product_name: self.product.clone().unwrap_or(current.product_name),
            quantity: self.quantity.unwrap_or(i64::from(current.quantity)),
            deadline: self
                .deadline
                .clone()
                .unwrap_or_else(|| current.deadline.format("%Y-%m-%d").to_string()),
            status: self
                .status
                .clone()
                .unwrap_or_else(|| current.status.to_string()),
            operator_id,
            notes: self.notes.clone(),
        };

        let order = session.service.update_work_order(id, input, &actor).await?;
        println!("✅ Updated {} - {}", order.number, order.status);
        if order.status != current.status {
            println!("   🔁 {} -> {}", current.status, order.status);
        }
        Ok(())
    }
}

pub struct CancelCommand {
    pub id: String,
}

impl Command for CancelCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let actor = session.actor().await?;
        let id = session.resolve_work_order(&self.id).await?;
        let order = session.service.cancel_work_order(id, &actor).await?;
        println!("🛑 Canceled {}", order.number);
        Ok(())
    }
}
