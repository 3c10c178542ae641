use anyhow::Result;
use clap::Parser;

use work_order_tracker::cli::commands::init::InitCommand;
use work_order_tracker::cli::commands::orders::{CancelCommand, CreateCommand, UpdateCommand};
use work_order_tracker::cli::commands::peek::PeekCommand;
use work_order_tracker::cli::commands::show::{ListCommand, ShowCommand};
use work_order_tracker::cli::commands::status::StatusCommand;
use work_order_tracker::cli::commands::users::{OperatorsCommand, RegisterCommand};
use work_order_tracker::cli::commands::{show_how_to_get_started, Command, Session};
use work_order_tracker::cli::{Cli, Commands};
use work_order_tracker::config::{config, TrackerConfig};
use work_order_tracker::telemetry::init_telemetry;

fn main() -> Result<()> {
    let cli = Cli::parse();
    tokio::runtime::Runtime::new()?.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        return show_how_to_get_started().await;
    };

    // Init must work before any configuration exists.
    if let Commands::Init { force, dry_run } = command {
        return InitCommand::new(force, dry_run).execute().await;
    }

    TrackerConfig::load_env_file()?;
    let config = config()?;
    init_telemetry(&config.observability.log_level, config.observability.json_logs)?;

    let session = Session::open(config, cli.actor, cli.password).await?;

    match command {
        Commands::Init { .. } => Ok(()),
        Commands::Register {
            handle,
            name,
            role,
            new_password,
        } => {
            RegisterCommand {
                handle,
                name,
                role,
                password: new_password,
            }
            .execute(&session)
            .await
        }
        Commands::Operators => OperatorsCommand.execute(&session).await,
        Commands::Create {
            product,
            quantity,
            deadline,
            operator,
            status,
            notes,
        } => {
            CreateCommand {
                product,
                quantity,
                deadline,
                operator,
                status,
                notes,
            }
            .execute(&session)
            .await
        }
        Commands::Update {
            id,
            product,
            quantity,
            deadline,
            operator,
            status,
            notes,
        } => {
            UpdateCommand {
                id,
                product,
                quantity,
                deadline,
                operator,
                status,
                notes,
            }
            .execute(&session)
            .await
        }
        Commands::Status {
            id,
            to,
            quantity,
            notes,
        } => {
            StatusCommand {
                id,
                to,
                quantity,
                notes,
            }
            .execute(&session)
            .await
        }
        Commands::Cancel { id } => CancelCommand { id }.execute(&session).await,
        Commands::Show { id, json } => ShowCommand { id, json }.execute(&session).await,
        Commands::List {
            search,
            status,
            from,
            to,
            page,
            json,
        } => {
            ListCommand {
                search,
                status,
                from,
                to,
                page,
                json,
            }
            .execute(&session)
            .await
        }
        Commands::Peek => PeekCommand.execute(&session).await,
    }
}
