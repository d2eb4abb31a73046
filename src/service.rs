//! Per-message submission handling

use crate::metrics::DispatchMetrics;
use crate::models::dispatcher::Dispatcher;
use crate::types::record::FormSubmission;
use crate::types::response::SubmissionResponse;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

/// Bounds in-flight submissions and lets shutdown wait for them
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    workers: u32,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.clamp(1, u32::MAX as usize) as u32;
        Self {
            semaphore: Arc::new(Semaphore::new(workers as usize)),
            workers,
        }
    }

    /// Wait for a free worker slot; the slot is released when the permit drops
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        self.semaphore.clone().acquire_owned().await
    }

    /// Wait until every in-flight submission has finished, then refuse new ones
    pub async fn drain(&self) -> Result<(), AcquireError> {
        let available = self.semaphore.available_permits();
        debug!(in_flight = self.workers as usize - available, "Draining workers");

        let _all = self.semaphore.acquire_many(self.workers).await?;
        self.semaphore.close();
        Ok(())
    }
}

/// Turns a raw submission payload into the response sent back to the form
pub struct SubmissionHandler {
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<DispatchMetrics>,
}

impl SubmissionHandler {
    pub fn new(dispatcher: Arc<Dispatcher>, metrics: Arc<DispatchMetrics>) -> Self {
        Self {
            dispatcher,
            metrics,
        }
    }

    /// Decode, validate and dispatch one submission
    pub async fn handle(&self, payload: &[u8]) -> SubmissionResponse {
        let start_time = Instant::now();

        let form = match serde_json::from_slice::<FormSubmission>(payload) {
            Ok(form) => form,
            Err(e) => {
                warn!(error = %e, "Failed to deserialize submission");
                self.metrics.record_malformed();
                return SubmissionResponse::Malformed {
                    error: e.to_string(),
                };
            }
        };

        match self.dispatcher.submit_concurrent(form).await {
            Ok(report) => {
                let processing_time = start_time.elapsed();
                self.metrics.record_submission(processing_time);

                for line in report.render_lines() {
                    info!(submission_id = %report.submission_id, "{}", line);
                }
                info!(
                    submission_id = %report.submission_id,
                    predicted = report.results().len(),
                    failed = report.failures().len(),
                    processing_time_us = processing_time.as_micros(),
                    "Submission processed"
                );

                SubmissionResponse::Ok { report }
            }
            Err(e) => {
                info!(error = %e, "Submission rejected");
                SubmissionResponse::Rejected {
                    error: e.to_string(),
                }
            }
        }
    }
}
