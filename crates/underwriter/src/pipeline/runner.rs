use tracing::{error, info, info_span, warn, Instrument};

use crate::jobs::{JobFailure, JobMessage, JobStatus, JobUpdate, PageResult, Progress, StoreError};
use crate::processor::extract_pdf_pages;

use super::context::WorkerContext;
use super::error::PipelineError;

/// How a message was handled when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed { pages: usize },
    /// The job had already finished; nothing was done.
    AlreadyTerminal(JobStatus),
}

/// Drives one job through `pending → processing → completed | failed`.
pub struct JobPipeline {
    ctx: WorkerContext,
}

impl JobPipeline {
    pub fn new(ctx: WorkerContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Processes one job. A job-fatal error is written to the job as
    /// `failed` before it is returned.
    pub async fn process(&self, message: &JobMessage) -> Result<JobOutcome, PipelineError> {
        let span = info_span!("job", job_id = %message.job_id, filename = %message.filename);
        async {
            info!("Processing job");
            match self.run(message).await {
                Ok(outcome) => Ok(outcome),
                Err(e) => {
                    self.mark_failed(&message.job_id, &e).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, message: &JobMessage) -> Result<JobOutcome, PipelineError> {
        let updater = &self.ctx.updater;
        let job_id = message.job_id.as_str();

        // Redelivery of a finished job
        if let Some(job) = updater.current(job_id).await? {
            if job.status.is_terminal() {
                info!("Job already {}; skipping", job.status);
                return Ok(JobOutcome::AlreadyTerminal(job.status));
            }
        }

        updater
            .apply(
                job_id,
                &JobUpdate::status(JobStatus::Processing)
                    .with_progress(Progress::new("Starting document processing", 0, 0)),
            )
            .await?;

        let bytes = self
            .ctx
            .blobs
            .fetch(&message.blob_path)
            .instrument(info_span!("download"))
            .await?;
        let pages = extract_pdf_pages(bytes)
            .instrument(info_span!("extract"))
            .await?;
        let total = pages.len() as u32;
        info!("Extracted {} pages", total);

        updater
            .apply(
                job_id,
                &JobUpdate::progress(Progress::new(
                    format!("Extracted {} pages", total),
                    0,
                    total,
                )),
            )
            .await?;

        let mut results: Vec<PageResult> = Vec::with_capacity(pages.len());
        for page in &pages {
            updater
                .apply(
                    job_id,
                    &JobUpdate::progress(Progress::new(
                        format!("Analyzing page {} of {}", page.page, total),
                        page.page,
                        total,
                    )),
                )
                .await?;
            let result = self
                .ctx
                .pages
                .analyze(page)
                .instrument(info_span!("analyze_page", page = page.page))
                .await;
            results.push(result);
        }

        updater
            .apply(
                job_id,
                &JobUpdate::default()
                    .with_extracted_data(results.clone())
                    .with_progress(Progress::new(
                        "Performing comprehensive analysis",
                        total,
                        total,
                    )),
            )
            .await?;

        let analysis = self
            .ctx
            .aggregator
            .aggregate(&results)
            .instrument(info_span!("aggregate"))
            .await?;

        updater
            .apply(
                job_id,
                &JobUpdate::status(JobStatus::Completed)
                    .with_analysis(analysis)
                    .with_progress(Progress::new("Analysis complete", total, total)),
            )
            .await?;

        info!("Job completed");
        Ok(JobOutcome::Completed {
            pages: results.len(),
        })
    }

    /// Best effort: a failure to record the failure is only logged.
    async fn mark_failed(&self, job_id: &str, cause: &PipelineError) {
        error!("Job failed: {}", cause);
        let update =
            JobUpdate::status(JobStatus::Failed).with_error(JobFailure::now(cause.to_string()));
        match self.ctx.updater.apply(job_id, &update).await {
            Ok(_) => {}
            Err(StoreError::TerminalState { status, .. }) => {
                warn!("Job already {}; failure not recorded", status);
            }
            Err(e) => error!("Failed to record job failure: {}", e),
        }
    }
}
