mod services;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;
use underwriter::config::{load_config, validate_for_worker, WorkerConfig};
use underwriter::jobs::purge_stale_jobs;
use underwriter::logging::init_logging;
use underwriter::{
    ConfigError, JobPipeline, JobStatus, LivenessReporter, QueueConsumer, UnderwriterError,
    WorkerContext,
};

#[derive(Parser)]
#[command(name = "underwriter-worker")]
#[command(about = "Processes underwriting documents from the extraction queue")]
#[command(version)]
struct Cli {
    /// JSON config file. Environment variables override its values.
    #[arg(long, global = true, env = "UNDERWRITER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Consume the queue until SIGINT or SIGTERM (default).
    Run,
    /// Delete job records in the given statuses.
    PurgeJobs {
        #[arg(long = "status", value_parser = parse_status, default_value = "pending")]
        statuses: Vec<JobStatus>,
    },
}

fn parse_status(s: &str) -> Result<JobStatus, String> {
    JobStatus::parse(s).ok_or_else(|| {
        format!(
            "unknown status '{}' (expected pending, processing, completed or failed)",
            s
        )
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(1);
        }
    };
    init_logging(&config.logging.level, config.logging.format);

    info!("Starting underwriter worker v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.cmd.unwrap_or(Command::Run) {
        Command::Run => run_worker(&config).await,
        Command::PurgeJobs { statuses } => purge_jobs(&config, &statuses).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::from(1)
        }
    }
}

async fn run_worker(config: &WorkerConfig) -> Result<(), UnderwriterError> {
    validate_for_worker(config)?;

    let store = services::open_job_store(config)?;
    let queue = services::build_queue(config)?;
    let blob_store = services::build_blob_store(config)?;
    let completions = services::build_completion_client(config)?;

    let ctx = WorkerContext::new(
        store,
        blob_store,
        completions,
        &config.pipeline_settings(),
    );
    let consumer = QueueConsumer::new(
        queue,
        JobPipeline::new(ctx),
        LivenessReporter::new(&config.worker.liveness_path),
    )
    .with_max_wait(config.worker.max_wait());

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received; finishing current job");
        handler_token.cancel();
    })
    .map_err(|e| ConfigError::Validation {
        message: format!("Failed to install signal handler: {}", e),
    })?;

    let stats = consumer.run(cancel).await;
    info!(
        "Worker stopped after {} messages ({} completed, {} abandoned)",
        stats.received, stats.completed, stats.abandoned
    );
    Ok(())
}

async fn purge_jobs(
    config: &WorkerConfig,
    statuses: &[JobStatus],
) -> Result<(), UnderwriterError> {
    let store = services::open_job_store(config)?;
    let report = purge_stale_jobs(store.as_ref(), statuses, &config.retry.to_policy()).await?;

    info!("Deleted {} job records", report.deleted);
    if report.failed > 0 {
        warn!("{} job records could not be deleted", report.failed);
    }
    Ok(())
}
