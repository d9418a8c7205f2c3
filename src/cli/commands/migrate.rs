use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub async fn handle(config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let (database, _) = super::connect(config).await?;
    database.migrate().await?;
    database.close().await;
    output_success(output_format, "Migrations applied", None)
}
