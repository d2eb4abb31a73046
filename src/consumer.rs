//! Form submission intake over NATS

use crate::config::NatsConfig;
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Subscribes the service to the submission subject.
///
/// With a queue group set, replicas of the service share the submissions
/// instead of each answering every form.
pub struct SubmissionConsumer {
    client: Client,
    subject: String,
    queue_group: Option<String>,
}

impl SubmissionConsumer {
    pub fn new(client: Client, nats: &NatsConfig) -> Self {
        Self {
            client,
            subject: nats.submission_subject.clone(),
            queue_group: nats.queue_group.clone(),
        }
    }

    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = match &self.queue_group {
            Some(group) => self
                .client
                .queue_subscribe(self.subject.clone(), group.clone())
                .await
                .with_context(|| format!("Failed to join queue group {}", group))?,
            None => self
                .client
                .subscribe(self.subject.clone())
                .await
                .context("Failed to subscribe to submissions")?,
        };

        info!(
            subject = %self.subject,
            queue_group = ?self.queue_group,
            "Listening for form submissions"
        );
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
