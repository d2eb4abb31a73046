//! NATS message producer for prediction reports and submission replies

use crate::types::prediction::PredictionReport;
use crate::types::response::SubmissionResponse;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Publishes reports and answers request/reply submissions
#[derive(Clone)]
pub struct ReportProducer {
    client: Client,
    subject: String,
}

impl ReportProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a report to the report subject
    pub async fn publish(&self, report: &PredictionReport) -> Result<()> {
        let payload = serde_json::to_vec(report)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            submission_id = %report.submission_id,
            outcomes = report.outcomes.len(),
            "Published prediction report"
        );

        Ok(())
    }

    /// Send the response to the requester's reply inbox
    pub async fn reply(&self, reply_to: Subject, response: &SubmissionResponse) -> Result<()> {
        let payload = serde_json::to_vec(response)?;
        self.client.publish(reply_to, payload.into()).await?;
        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
