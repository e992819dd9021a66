//! Automated AI tool review updater: binary entrypoint.
//!
//! One invocation = one pipeline run: gather candidate tools from the
//! configured sources, generate a review per candidate, splice the new cards
//! into the published page, and push. Scheduling (one run per day) is the
//! caller's job, e.g. a CI cron.

use std::process::ExitCode;
use std::time::Duration;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ai_review_updater::config::{self, PipelineConfig};
use ai_review_updater::pipeline::{Pipeline, RunOutcome};
use ai_review_updater::publish::{FsStore, GitPublisher, NoopPublisher, Publisher};
use ai_review_updater::review::{openai::OpenAiBackend, RetryPolicy, ReviewClient};
use ai_review_updater::sources;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op in CI where secrets come from the runner.
    let _ = dotenvy::dotenv();
    init_tracing();

    match run().await {
        Ok(RunOutcome::Published {
            entries,
            generated,
            fallbacks,
        }) => {
            tracing::info!(entries, generated, fallbacks, "published new reviews");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::AlreadyPublished) => {
            tracing::info!("already published today, no-op");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::NoCandidates) => {
            tracing::info!("no candidates after filtering, no-op");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Unchanged) => {
            tracing::info!("document unchanged, no-op");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = ?e, "run failed");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<RunOutcome> {
    let config = PipelineConfig::from_env()?;
    let descriptors = config::load_sources_default()?;
    let providers = sources::build_providers(&descriptors)?;

    let backend = OpenAiBackend::new(config.api_key.clone(), config.model.clone())?;
    let policy = RetryPolicy {
        max_retries: config.max_retries,
        base_delay: Duration::from_millis(config.base_delay_ms),
        max_delay: Duration::from_millis(config.max_delay_ms),
    };
    let client = ReviewClient::new(backend, policy);

    let publisher: Box<dyn Publisher> = if config.publish_enabled {
        Box::new(GitPublisher {
            repo_dir: config.repo_dir.clone(),
            branch: config.branch.clone(),
            document_path: config.document_path.clone(),
        })
    } else {
        Box::new(NoopPublisher)
    };

    let pipeline = Pipeline::new(config, providers, client, Box::new(FsStore), publisher);
    let today = chrono::Utc::now().date_naive();
    Ok(pipeline.run(today).await?)
}
