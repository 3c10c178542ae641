use anyhow::{anyhow, bail, Result};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::SystemClock;
use crate::config::TrackerConfig;
use crate::identity::{User, UserDirectory};
use crate::store::{open_store, WorkOrderStore};
use crate::work_orders::{WorkOrderNumber, WorkOrderService};

pub mod init;
pub mod orders;
pub mod peek;
pub mod show;
pub mod status;
pub mod users;

#[allow(async_fn_in_trait)]
pub trait Command {
    async fn execute(&self, session: &Session) -> Result<()>;
}

/// Services for one CLI invocation plus the credentials given on the command line.
pub struct Session {
    pub service: WorkOrderService,
    pub directory: UserDirectory,
    store: Arc<dyn WorkOrderStore>,
    handle: Option<String>,
    password: Option<String>,
}

impl Session {
    pub async fn open(config: &TrackerConfig, handle: Option<String>, password: Option<String>) -> Result<Self> {
        let store: Arc<dyn WorkOrderStore> = open_store(config).await?;
        Ok(Self::with_store(store, config, handle, password))
    }

    pub fn with_store(
        store: Arc<dyn WorkOrderStore>,
        config: &TrackerConfig,
        handle: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            service: WorkOrderService::new(store.clone(), Arc::new(SystemClock), config.work_orders.clone()),
            directory: UserDirectory::new(store.clone()),
            store,
            handle,
            password,
        }
    }

    /// The authenticated acting user.
    pub async fn actor(&self) -> Result<User> {
        let Some(handle) = self.handle.as_deref() else {
            bail!("this command needs an acting user: pass --as <handle> or set WORK_ORDERS_USER");
        };
        let password = self.password.as_deref().unwrap_or_default();
        Ok(self.directory.authenticate(handle, password).await?)
    }

    pub async fn operator_id(&self, handle: &str) -> Result<Uuid> {
        self.directory
            .find_by_handle(handle)
            .await?
            .map(|user| user.id)
            .ok_or_else(|| anyhow!("no user with handle '{handle}'"))
    }

    /// Accepts a work order UUID or its `WO-YYYYMMDD-NNN` number. Whether the
    /// actor may touch the order is left to the service call that follows.
    pub async fn resolve_work_order(&self, raw: &str) -> Result<Uuid> {
        if let Ok(id) = Uuid::parse_str(raw.trim()) {
            return Ok(id);
        }
        let number: WorkOrderNumber = raw
            .parse()
            .map_err(|e: String| anyhow!("'{raw}' is neither a work order id nor a number: {e}"))?;

        self.store
            .find_work_order_by_number(&number)
            .await?
            .map(|order| order.id)
            .ok_or_else(|| anyhow!("work order {number} not found"))
    }
}

pub async fn show_how_to_get_started() -> Result<()> {
    println!("🏭 Work Orders - production floor tracking");
    println!();
    println!("To get started:");
    println!("  ⚙️  work-orders init                          # Write work-orders.toml");
    println!("  👤 work-orders register --handle ... --role   # Create an account");
    println!("  📋 work-orders --as <handle> list             # See work orders");
    println!();
    println!("Production managers:");
    println!("  ➕ work-orders --as pm create ...");
    println!("  ✏️  work-orders --as pm update <id> ...");
    println!("  🛑 work-orders --as pm cancel <id>");
    println!();
    println!("Operators:");
    println!("  ▶️  work-orders --as op status <id> --to \"In Progress\" --quantity 0");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TrackerError;
    use crate::identity::{Denial, NewUser, Role};
    use crate::store::InMemoryStore;
    use crate::work_orders::{WorkOrderInput, WorkOrderStatus};

    async fn register(session: &Session, handle: &str, role: Role) -> User {
        session
            .directory
            .register(NewUser {
                handle: handle.to_string(),
                name: handle.to_string(),
                role: Some(role),
                password: "password123".to_string(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_number_resolves_for_any_actor_and_service_decides_access() {
        let store: Arc<dyn WorkOrderStore> = Arc::new(InMemoryStore::new());
        let config = TrackerConfig::default();
        let session = Session::with_store(
            store.clone(),
            &config,
            Some("o2".to_string()),
            Some("password123".to_string()),
        );
        let pm = register(&session, "pm", Role::ProductionManager).await;
        let o1 = register(&session, "o1", Role::Operator).await;
        register(&session, "o2", Role::Operator).await;

        let order = session
            .service
            .create_work_order(
                WorkOrderInput {
                    product_name: "Gearbox".to_string(),
                    quantity: 5,
                    deadline: "2030-01-01".to_string(),
                    status: "Pending".to_string(),
                    operator_id: o1.id,
                    notes: None,
                },
                &pm,
            )
            .await
            .unwrap();

        let o2 = session.actor().await.unwrap();
        let by_number = session.resolve_work_order(&order.number.to_string()).await.unwrap();
        let by_id = session.resolve_work_order(&order.id.to_string()).await.unwrap();
        assert_eq!(by_number, order.id);
        assert_eq!(by_id, order.id);

        let err = session
            .service
            .transition_status(by_number, WorkOrderStatus::InProgress, 1, None, &o2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Authorization {
                denial: Denial::NotAssignedOperator,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unknown_number_is_not_found() {
        let session = Session::with_store(Arc::new(InMemoryStore::new()), &TrackerConfig::default(), None, None);
        let err = session.resolve_work_order("WO-20250307-042").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert!(session.resolve_work_order("not-a-number").await.is_err());
    }
}
