use anyhow::Result;
use pipeline::{
    ExtractionOutcome, PipelineConfig, build_llm_extractor, init_tracing, report, run_extraction,
    upsert_configured,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = PipelineConfig::from_env()?;
    let extractor = build_llm_extractor(&config)?;

    let outcome = run_extraction(&config, &extractor).await?;
    report::print_extraction(&outcome);

    if let ExtractionOutcome::EmptyInput { .. } = outcome {
        return Ok(());
    }

    let outcome = upsert_configured(&config).await?;
    report::print_upsert(&outcome);

    Ok(())
}
