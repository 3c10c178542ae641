use anyhow::{anyhow, Result};

use super::{Command, Session};
use crate::audit::StatusLogEntry;
use crate::work_orders::validation::parse_date;
use crate::work_orders::{WorkOrder, WorkOrderFilter, WorkOrderStatus};

fn print_order(order: &WorkOrder) {
    println!("📋 {} - {}", order.number, order.status);
    println!("   🆔 {}", order.id);
    println!("   📦 {} x {}", order.quantity, order.product_name);
    println!("   📅 Due {}", order.deadline);
    println!("   👷 Operator {}", order.operator_id);
}

fn print_entry(entry: &StatusLogEntry) {
    let change = match entry.previous_status {
        Some(previous) => format!("{previous} -> {}", entry.new_status),
        None => format!("created as {}", entry.new_status),
    };
    println!(
        "   {} {change} by {}",
        entry.created_at.format("%Y-%m-%d %H:%M"),
        entry.changed_by
    );
    if let Some(notes) = &entry.notes {
        println!("      📝 {notes}");
    }
}

pub struct ShowCommand {
    pub id: String,
    pub json: bool,
}

impl Command for ShowCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let actor = session.actor().await?;
        let id = session.resolve_work_order(&self.id).await?;
        let detail = session.service.get_work_order(id, &actor).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&detail)?);
            return Ok(());
        }

        print_order(&detail.order);
        println!();
        println!("🕓 HISTORY:");
        for entry in &detail.history {
            print_entry(entry);
        }
        Ok(())
    }
}

pub struct ListCommand {
    pub search: Option<String>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub page: u32,
    pub json: bool,
}

impl ListCommand {
    fn filter(&self) -> Result<WorkOrderFilter> {
        let date = |raw: &Option<String>| {
            raw.as_deref()
                .map(|s| parse_date(s).ok_or_else(|| anyhow!("'{s}' is not a valid date")))
                .transpose()
        };
        Ok(WorkOrderFilter {
            search: self.search.clone(),
            status: self
                .status
                .as_deref()
                .map(|s| s.parse::<WorkOrderStatus>().map_err(|e| anyhow!(e)))
                .transpose()?,
            deadline_from: date(&self.from)?,
            deadline_to: date(&self.to)?,
        })
    }
}

impl Command for ListCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let filter = self.filter()?;
        let actor = session.actor().await?;
        let page = session.service.list_work_orders(&actor, filter, self.page).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&page)?);
            return Ok(());
        }

        if page.items.is_empty() {
            println!("📭 No work orders match");
            return Ok(());
        }
        println!(
            "📋 WORK ORDERS (page {} of {}, {} total):",
            page.page, page.last_page, page.total
        );
        for order in &page.items {
            println!(
                "   {}  {:<12} {:>6} x {:<30} due {}",
                order.number, order.status.as_str(), order.quantity, order.product_name, order.deadline
            );
        }
        if page.has_more() {
            println!();
            println!("   ➡️  More: --page {}", page.page + 1);
        }
        Ok(())
    }
}
