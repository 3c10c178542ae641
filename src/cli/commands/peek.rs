use anyhow::Result;

use super::{Command, Session};

pub struct PeekCommand;

impl Command for PeekCommand {
    async fn execute(&self, session: &Session) -> Result<()> {
        let number = session.service.preview_number().await?;
        println!("👀 Next work order number: {number}");
        println!("   💡 Not reserved; a concurrent creation may take it first");
        Ok(())
    }
}
