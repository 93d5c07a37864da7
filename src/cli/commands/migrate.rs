use crate::app::AppState;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::schema;

pub async fn handle(state: &AppState, output_format: OutputFormat) -> anyhow::Result<()> {
    schema::migrate_shared(&state.registry.main_pool()).await?;
    output_success(output_format, "Shared database schema is up to date", None)
}
