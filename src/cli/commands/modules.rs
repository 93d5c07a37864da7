use clap::Subcommand;
use serde_json::json;

use crate::app::AppState;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::services::module_catalog::initialize_defaults;

#[derive(Subcommand)]
pub enum ModuleCommands {
    #[command(about = "Insert the built-in module definitions that are missing")]
    Init,

    #[command(about = "List module definitions")]
    List,
}

pub async fn handle(cmd: ModuleCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ModuleCommands::Init => {
            let inserted = initialize_defaults(state.catalog.as_ref()).await?;
            output_success(
                output_format,
                &format!("Module catalog initialized ({} inserted)", inserted),
                Some(json!({ "inserted": inserted })),
            )
        }
        ModuleCommands::List => {
            let definitions = state.catalog.definitions().await?;
            if definitions.is_empty() {
                return output_empty_collection(output_format, "modules", "No modules defined");
            }

            match output_format {
                OutputFormat::Json => output_json(&json!({ "modules": definitions.as_slice() }))?,
                OutputFormat::Text => {
                    println!("{:<15} {:<25} {:<6} {}", "KEY", "NAME", "CORE", "ORDER");
                    println!("{}", "-".repeat(55));
                    for module in definitions.iter() {
                        println!(
                            "{:<15} {:<25} {:<6} {}",
                            module.key,
                            module.name,
                            yes_no(module.is_core),
                            module.sort_order
                        );
                    }
                }
            }
            Ok(())
        }
    }
}
