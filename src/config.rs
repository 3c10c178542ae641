use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for the work order tracker
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrackerConfig {
    /// Database settings (optional; absent means an in-memory store)
    pub database: Option<DatabaseConfig>,
    /// Observability settings
    pub observability: ObservabilityConfig,
    /// Work order behaviour
    pub work_orders: WorkOrdersConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (SQLite file path or connection string)
    pub url: String,
    /// Maximum connections in pool
    pub max_connections: u32,
    /// Enable automatic migrations
    pub auto_migrate: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level, used when RUST_LOG is unset
    pub log_level: String,
    /// JSON log lines instead of the compact human format
    pub json_logs: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkOrdersConfig {
    /// How many numbers to try before giving up on a creation
    pub max_number_attempts: u32,
    /// Note recorded on the log entry of every cancellation
    pub cancel_note: String,
}

impl Default for WorkOrdersConfig {
    fn default() -> Self {
        Self {
            max_number_attempts: 3,
            cancel_note: "Work order canceled by user".to_string(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            database: Some(DatabaseConfig {
                url: "sqlite://.work-orders/work-orders.db".to_string(),
                max_connections: 5,
                auto_migrate: true,
            }),
            observability: ObservabilityConfig {
                log_level: "warn".to_string(),
                json_logs: true,
            },
            work_orders: WorkOrdersConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Default values
    /// 2. Configuration files (work-orders.toml, .work-orders-rc)
    /// 3. Environment variables (prefixed with WORK_ORDERS_, nested keys split on `__`)
    pub fn load() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if Path::new("work-orders.toml").exists() {
            builder = builder.add_source(File::with_name("work-orders"));
        }

        if Path::new(".work-orders-rc").exists() {
            builder = builder.add_source(File::new(".work-orders-rc", config::FileFormat::Toml));
        }

        builder = builder.add_source(
            Environment::with_prefix("WORK_ORDERS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: TrackerConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.work_orders.max_number_attempts == 0 {
            anyhow::bail!("work_orders.max_number_attempts must be at least 1");
        }
        if let Some(db) = &self.database {
            if db.max_connections == 0 {
                anyhow::bail!("database.max_connections must be at least 1");
            }
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let toml_content = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    /// Load .env file if it exists
    pub fn load_env_file() -> Result<()> {
        if Path::new(".env").exists() {
            dotenvy::dotenv()?;
            tracing::info!("Loaded environment variables from .env file");
        }
        Ok(())
    }
}

/// Global configuration instance
static CONFIG: std::sync::LazyLock<Result<TrackerConfig, anyhow::Error>> =
    std::sync::LazyLock::new(|| {
        let _ = TrackerConfig::load_env_file();
        TrackerConfig::load()
    });

/// Get the global configuration
pub fn config() -> Result<&'static TrackerConfig> {
    CONFIG
        .as_ref()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))
}
