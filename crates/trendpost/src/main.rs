use common::{log_level_from_env, Config, Pipeline, PipelineResult};
use gemini::GeminiGenerator;
use links::FileLinkStore;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use trends::TrendsScraper;
use x_publisher::XPublisher;

fn build_pipeline(config: &Config) -> PipelineResult<Pipeline> {
    let pipeline = Pipeline::new(
        Box::new(TrendsScraper::new(config)?),
        Box::new(FileLinkStore::from_config(config)),
        Box::new(GeminiGenerator::new(config)?),
        Box::new(XPublisher::new(config)?),
    )
    .with_limits(config.limits.clone())
    .dry_run(config.dry_run);

    Ok(pipeline)
}

// Single run, strictly sequential: one thread is all it needs.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load environment variables
    let _ = dotenv::dotenv();

    // An invalid LOG_LEVEL still gets reported through an INFO subscriber.
    let level = log_level_from_env();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(*level.as_ref().unwrap_or(&Level::INFO))
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set up logging: {}", e);
    }
    if let Err(e) = level {
        error!(kind = e.kind(), "{}", e);
        return ExitCode::from(e.exit_code());
    }

    info!("Starting auto-post run");

    let pipeline = match Config::from_env().and_then(|config| build_pipeline(&config)) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(kind = e.kind(), "{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let report = pipeline.run().await;
    info!(
        "Run finished in state {} (exit code {})",
        report.final_state(),
        report.exit_code()
    );

    ExitCode::from(report.exit_code())
}
