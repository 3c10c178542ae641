use anyhow::{anyhow, Result};

use super::{Command, Session};
use crate::identity::{NewUser, Role};

pub struct RegisterCommand {
    pub handle: String,
    pub name: String,
    pub role: Option<String>,
    pub password: String,
}

impl Command for RegisterCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let role = self
            .role
            .as_deref()
            .map(|raw| raw.parse::<Role>().map_err(|e| anyhow!(e)))
            .transpose()?;

        let user = session
            .directory
            .register(NewUser {
                handle: self.handle.clone(),
                name: self.name.clone(),
                role,
                password: self.password.clone(),
            })
            .await?;

        println!("✅ Registered {} ({})", user.handle, user.name);
        match user.role {
            Some(role) => println!("   🎭 Role: {role}"),
            None => println!("   ⚠️  No role: this account cannot do anything yet"),
        }
        Ok(())
    }
}

pub struct OperatorsCommand;

impl Command for OperatorsCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let operators = session.directory.operators().await?;
        if operators.is_empty() {
            println!("👷 No operators registered");
            println!("   💡 work-orders register --handle <handle> --name <name> --role operator");
            return Ok(());
        }
        println!("👷 OPERATORS:");
        for operator in operators {
            println!("   {:<20} {}", operator.handle, operator.name);
        }
        Ok(())
    }
}
