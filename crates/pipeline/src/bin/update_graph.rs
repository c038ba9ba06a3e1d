use anyhow::Result;
use pipeline::{PipelineConfig, init_tracing, report, upsert_configured};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = PipelineConfig::from_env()?;

    let outcome = upsert_configured(&config).await?;
    report::print_upsert(&outcome);

    Ok(())
}
