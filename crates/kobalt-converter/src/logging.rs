//! Structured job logging.
//!
//! Every line carries the job id and the stage the job was in, so a single
//! conversion can be followed through the logs with one filter.

use tracing::{debug, error, info, warn, Span};

use kobalt_models::{JobId, JobStage};

use crate::error::ConvertError;

/// Job logger for structured logging with consistent fields.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    operation: String,
}

impl JobLogger {
    pub fn new(job_id: &JobId, operation: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            operation: operation.to_string(),
        }
    }

    pub fn log_start(&self, url: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            url = %url,
            "Job started"
        );
    }

    /// Log entry into a pipeline stage.
    pub fn log_stage(&self, stage: JobStage, message: &str) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            stage = %stage,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job warning: {}", message
        );
    }

    /// Log a failure with its internal detail; the client only sees
    /// [`ConvertError::client_message`].
    pub fn log_failure(&self, stage: JobStage, err: &ConvertError) {
        if err.is_cancelled() {
            info!(
                job_id = %self.job_id,
                operation = %self.operation,
                stage = %stage,
                "Job cancelled"
            );
            return;
        }

        error!(
            job_id = %self.job_id,
            operation = %self.operation,
            stage = %stage,
            category = err.category().as_str(),
            error = %err,
            "Job error: {}", err.client_message()
        );
    }

    pub fn log_completion(&self, elapsed_ms: u128) {
        info!(
            job_id = %self.job_id,
            operation = %self.operation,
            elapsed_ms = elapsed_ms as u64,
            "Job completed"
        );
    }

    pub fn log_cleanup(&self, message: &str) {
        debug!(
            job_id = %self.job_id,
            operation = %self.operation,
            "Job cleanup: {}", message
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "job",
            job_id = %self.job_id,
            operation = %self.operation
        )
    }
}
