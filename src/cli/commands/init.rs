//! Init command: writes a default configuration file.
//!
//! An existing file is never overwritten unless `--force` is given. With
//! `--dry-run` the TOML is printed and nothing touches the filesystem.
use crate::config::TrackerConfig;
use anyhow::{bail, Result};
use std::path::PathBuf;

pub struct InitCommand {
    pub force: bool,
    pub dry_run: bool,
    path: PathBuf,
}

impl InitCommand {
    pub fn new(force: bool, dry_run: bool) -> Self {
        Self {
            force,
            dry_run,
            path: PathBuf::from("work-orders.toml"),
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }

    pub async fn execute(&self) -> Result<()> {
        let config = TrackerConfig::default();

        if self.dry_run {
            println!("🔍 Would write {}:", self.path.display());
            println!();
            print!("{}", toml::to_string_pretty(&config)?);
            return Ok(());
        }

        if self.path.exists() && !self.force {
            bail!(
                "{} already exists; use --force to overwrite it",
                self.path.display()
            );
        }

        config.save_to_file(&self.path)?;
        println!("✅ Wrote {}", self.path.display());
        println!("   💡 Next: work-orders register --handle <handle> --name <name> --role production-manager");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_refuses_to_overwrite_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("work-orders.toml");

        InitCommand::new(false, false).with_path(&path).execute().await.unwrap();
        assert!(path.exists());

        let err = InitCommand::new(false, false).with_path(&path).execute().await.unwrap_err();
        assert!(err.to_string().contains("--force"));

        InitCommand::new(true, false).with_path(&path).execute().await.unwrap();
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("work-orders.toml");
        InitCommand::new(false, true).with_path(&path).execute().await.unwrap();
        assert!(!path.exists());
    }
}
