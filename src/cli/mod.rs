use clap::{Parser, Subcommand};

pub mod commands;

#[derive(Parser)]
#[command(name = "work-orders")]
#[command(about = "Role-gated work order tracking for the production floor")]
#[command(long_about = "Track manufacturing work orders from creation to completion. Production managers \
                       create, edit and cancel orders; operators move their assigned orders through \
                       Pending -> In Progress -> Completed. Every status change is recorded.")]
pub struct Cli {
    /// Handle of the acting user
    #[arg(long = "as", global = true, env = "WORK_ORDERS_USER", help = "Handle of the user performing the command")]
    pub actor: Option<String>,
    /// Password of the acting user
    #[arg(long, global = true, env = "WORK_ORDERS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default work-orders.toml in the current directory
    Init {
        /// Overwrite an existing configuration file
        #[arg(long, help = "Overwrite an existing work-orders.toml")]
        force: bool,
        /// Show what would be written without making changes
        #[arg(long, help = "Print the configuration instead of writing it")]
        dry_run: bool,
    },
    /// Register a user account
    Register {
        #[arg(long, help = "Login handle (no spaces)")]
        handle: String,
        #[arg(long, help = "Display name")]
        name: String,
        /// Role to grant; omit for an account with no permissions
        #[arg(long, help = "Role: production-manager or operator")]
        role: Option<String>,
        #[arg(long, env = "WORK_ORDERS_NEW_PASSWORD", hide_env_values = true, help = "Password for the new account (min 8 characters)")]
        new_password: String,
    },
    /// List users who can be assigned work orders
    Operators,
    /// Create a work order (production managers)
    Create {
        #[arg(long, help = "Product to manufacture")]
        product: String,
        #[arg(long, help = "Quantity to produce (at least 1)")]
        quantity: i64,
        #[arg(long, help = "Deadline as YYYY-MM-DD")]
        deadline: String,
        #[arg(long, help = "Handle of the assigned operator")]
        operator: String,
        #[arg(long, default_value = "Pending", help = "Initial status")]
        status: String,
        #[arg(long, help = "Notes for the initial status entry")]
        notes: Option<String>,
    },
    /// Edit a work order (production managers); any status may be set
    Update {
        /// Work order id or number
        id: String,
        #[arg(long)]
        product: Option<String>,
        #[arg(long)]
        quantity: Option<i64>,
        #[arg(long, help = "Deadline as YYYY-MM-DD")]
        deadline: Option<String>,
        #[arg(long, help = "Handle of the operator to assign")]
        operator: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, help = "Notes recorded when the status changes")]
        notes: Option<String>,
    },
    /// Advance an assigned work order (operators)
    Status {
        /// Work order id or number
        id: String,
        #[arg(long, help = "Target status: In Progress or Completed")]
        to: String,
        #[arg(long, help = "Quantity produced so far (replaces the stored quantity)")]
        quantity: i64,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Cancel a work order (production managers)
    Cancel {
        /// Work order id or number
        id: String,
    },
    /// Show a work order and its status history
    Show {
        /// Work order id or number
        id: String,
        #[arg(long, help = "Print JSON instead of text")]
        json: bool,
    },
    /// List work orders, newest first, ten per page
    List {
        #[arg(long, help = "Match against number or product name")]
        search: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long, help = "Earliest deadline (YYYY-MM-DD, inclusive)")]
        from: Option<String>,
        #[arg(long, help = "Latest deadline (YYYY-MM-DD, inclusive)")]
        to: Option<String>,
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, help = "Print JSON instead of text")]
        json: bool,
    },
    /// Preview the number the next work order created today would receive
    Peek,
}
