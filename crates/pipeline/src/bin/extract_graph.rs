use anyhow::Result;
use pipeline::{PipelineConfig, build_llm_extractor, init_tracing, report, run_extraction};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = PipelineConfig::from_env()?;
    let extractor = build_llm_extractor(&config)?;

    let outcome = run_extraction(&config, &extractor).await?;
    report::print_extraction(&outcome);

    Ok(())
}
