pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::config::config;

#[derive(Parser)]
#[command(name = "tenancy")]
#[command(about = "Tenancy CLI - shared database migration, module catalog and tenant administration")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create or update the shared database tables")]
    Migrate,

    #[command(about = "Module catalog management")]
    Modules {
        #[command(subcommand)]
        cmd: commands::modules::ModuleCommands,
    },

    #[command(about = "Tenant provisioning and administration")]
    Tenant {
        #[command(subcommand)]
        cmd: commands::tenant::TenantCommands,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let state = AppState::connect(config())?;

    match cli.command {
        Commands::Migrate => commands::migrate::handle(&state, output_format).await,
        Commands::Modules { cmd } => commands::modules::handle(cmd, &state, output_format).await,
        Commands::Tenant { cmd } => commands::tenant::handle(cmd, &state, output_format).await,
    }
}
