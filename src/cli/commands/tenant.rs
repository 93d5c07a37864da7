use clap::Subcommand;
use serde_json::json;

use crate::app::AppState;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::database::models::Tenant;
use crate::services::provisioner::StepOutcome;
use crate::services::{ProvisionReport, ProvisionRequest};

#[derive(Subcommand)]
pub enum TenantCommands {
    #[command(about = "Provision a tenant, or resume a partially provisioned one")]
    Provision {
        #[arg(help = "Display name")]
        name: String,

        #[arg(help = "Subdomain label, also used for the database alias")]
        subdomain: String,

        #[arg(long, help = "Custom domain served for this tenant")]
        domain: Option<String>,

        #[arg(long = "module", help = "Non-core module to enable (repeatable)")]
        modules: Vec<String>,

        #[arg(long, help = "Administrator username")]
        admin_username: Option<String>,

        #[arg(long, help = "Administrator email")]
        admin_email: Option<String>,

        #[arg(long, help = "Administrator password, defaults to the configured one")]
        admin_password: Option<String>,
    },

    #[command(about = "List all tenants")]
    List,

    #[command(about = "Show tenant information and modules")]
    Show {
        #[arg(help = "Tenant subdomain")]
        subdomain: String,
    },

    #[command(about = "Activate a tenant")]
    Activate {
        #[arg(help = "Tenant subdomain")]
        subdomain: String,
    },

    #[command(about = "Deactivate a tenant and release its connection pool")]
    Deactivate {
        #[arg(help = "Tenant subdomain")]
        subdomain: String,
    },

    #[command(about = "Enable a module for a tenant")]
    EnableModule {
        #[arg(help = "Tenant subdomain")]
        subdomain: String,
        #[arg(help = "Module key")]
        module: String,
    },

    #[command(about = "Disable a module for a tenant")]
    DisableModule {
        #[arg(help = "Tenant subdomain")]
        subdomain: String,
        #[arg(help = "Module key")]
        module: String,
    },

    #[command(about = "Rewrite the tenant's configuration artifact")]
    RegenerateConfig {
        #[arg(help = "Tenant subdomain")]
        subdomain: String,
    },
}

pub async fn handle(cmd: TenantCommands, state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        TenantCommands::Provision {
            name,
            subdomain,
            domain,
            modules,
            admin_username,
            admin_email,
            admin_password,
        } => {
            let request = ProvisionRequest {
                name,
                subdomain,
                custom_domain: domain,
                admin_username,
                admin_email,
                admin_password,
                module_keys: modules,
                created_by: Some("cli".to_string()),
                ..ProvisionRequest::default()
            };
            let report = state.provisioner.provision(request).await?;
            print_report(&report, output_format)?;
            if !report.is_complete() {
                anyhow::bail!(
                    "Provisioning stopped at '{}'; re-run the same command to resume",
                    serde_json::to_value(report.state)?.as_str().unwrap_or("unknown")
                );
            }
            Ok(())
        }
        TenantCommands::List => {
            let tenants = state.tenants.list().await?;
            if tenants.is_empty() {
                return output_empty_collection(output_format, "tenants", "No tenants registered");
            }

            match output_format {
                OutputFormat::Json => output_json(&json!({ "tenants": tenants }))?,
                OutputFormat::Text => {
                    println!("{:<20} {:<25} {:<30} {:<7} {}", "SUBDOMAIN", "NAME", "CUSTOM DOMAIN", "ACTIVE", "CREATED");
                    println!("{}", "-".repeat(100));
                    for tenant in &tenants {
                        println!(
                            "{:<20} {:<25} {:<30} {:<7} {}",
                            tenant.subdomain,
                            tenant.name,
                            tenant.custom_domain.as_deref().unwrap_or("-"),
                            yes_no(tenant.is_active),
                            tenant.created_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
            Ok(())
        }
        TenantCommands::Show { subdomain } => {
            let tenant = state.tenants.get(&subdomain).await?;
            let modules = state.tenants.modules(&subdomain).await?;

            match output_format {
                OutputFormat::Json => output_json(&json!({ "tenant": tenant, "modules": modules }))?,
                OutputFormat::Text => {
                    print_tenant(&tenant);
                    println!();
                    println!("{:<15} {:<25} {:<6} {}", "MODULE", "NAME", "CORE", "ENABLED");
                    for module in &modules {
                        println!(
                            "{:<15} {:<25} {:<6} {}",
                            module.key,
                            module.name,
                            yes_no(module.is_core),
                            yes_no(module.is_enabled)
                        );
                    }
                }
            }
            Ok(())
        }
        TenantCommands::Activate { subdomain } => set_active(state, &subdomain, true, output_format).await,
        TenantCommands::Deactivate { subdomain } => set_active(state, &subdomain, false, output_format).await,
        TenantCommands::EnableModule { subdomain, module } => {
            set_module(state, &subdomain, &module, true, output_format).await
        }
        TenantCommands::DisableModule { subdomain, module } => {
            set_module(state, &subdomain, &module, false, output_format).await
        }
        TenantCommands::RegenerateConfig { subdomain } => {
            let path = state.tenants.regenerate_config(&subdomain).await?;
            output_success(
                output_format,
                &format!("Configuration written to {}", path.display()),
                Some(json!({ "subdomain": subdomain, "path": path })),
            )
        }
    }
}

async fn set_active(state: &AppState, subdomain: &str, is_active: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let tenant = state.tenants.set_active(subdomain, is_active).await?;
    let verb = if is_active { "activated" } else { "deactivated" };
    output_success(
        output_format,
        &format!("Tenant '{}' {}", tenant.subdomain, verb),
        Some(json!({ "subdomain": tenant.subdomain, "is_active": tenant.is_active })),
    )
}

async fn set_module(
    state: &AppState,
    subdomain: &str,
    module_key: &str,
    is_enabled: bool,
    output_format: OutputFormat,
) -> anyhow::Result<()> {
    let row = state.tenants.set_module(subdomain, module_key, is_enabled).await?;
    let verb = if row.is_enabled { "enabled" } else { "disabled" };
    output_success(
        output_format,
        &format!("Module '{}' {} for tenant '{}'", row.module_key, verb, subdomain),
        Some(json!({ "module": row })),
    )
}

fn print_tenant(tenant: &Tenant) {
    println!("Name:          {}", tenant.name);
    println!("Subdomain:     {}", tenant.subdomain);
    println!("Custom domain: {}", tenant.custom_domain.as_deref().unwrap_or("-"));
    println!("Domain type:   {}", tenant.domain_type);
    println!("Database:      {}", tenant.database_alias());
    println!("Active:        {}", yes_no(tenant.is_active));
    println!("TLS issued:    {}", yes_no(tenant.tls_issued));
    println!("Created:       {}", tenant.created_at.format("%Y-%m-%d %H:%M"));
}

fn print_report(report: &ProvisionReport, output_format: OutputFormat) -> anyhow::Result<()> {
    if let OutputFormat::Json = output_format {
        return output_json(report);
    }

    let action = if report.tenant_created { "Created" } else { "Resumed" };
    println!("{} tenant '{}' ({})", action, report.tenant.subdomain, report.database_alias);
    for step in &report.steps {
        match &step.outcome {
            StepOutcome::Succeeded { detail } => println!("  ✓ {:<13} {}", step.step.as_str(), detail),
            StepOutcome::Failed { error } => println!("  ✗ {:<13} {}", step.step.as_str(), error),
            StepOutcome::Skipped { reason } => println!("  - {:<13} {}", step.step.as_str(), reason),
        }
    }
    Ok(())
}
