//! Test Submission Producer
//!
//! Generates plausible child measurements and submits them to the
//! prediction service over NATS request/reply.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Submission structure matching the service's expected format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FormSubmission {
    age: f64,
    sex: String,
    height: f64,
    weight: f64,
}

/// Generator for test submissions
struct SubmissionGenerator {
    rng: rand::rngs::ThreadRng,
}

impl SubmissionGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Child roughly on the median growth curve
    fn generate_typical(&mut self) -> FormSubmission {
        let age: f64 = self.rng.gen_range(0.0..5.0);
        // Rough median length/height and weight for age
        let height = 50.0 + 25.0 * age.min(1.0) + 8.5 * (age - 1.0).max(0.0);
        let weight = 3.3 + 6.2 * age.min(1.0) + 2.2 * (age - 1.0).max(0.0);

        FormSubmission {
            age: round1(age),
            sex: self.random_sex(),
            height: round1(height * self.rng.gen_range(0.96..1.04)),
            weight: round1(weight * self.rng.gen_range(0.9..1.1)),
        }
    }

    /// Child well below the growth curve
    fn generate_undernourished(&mut self) -> FormSubmission {
        let mut submission = self.generate_typical();
        submission.height = round1(submission.height * self.rng.gen_range(0.82..0.92));
        submission.weight = round1(submission.weight * self.rng.gen_range(0.65..0.8));
        submission
    }

    /// Out-of-range input the service should reject
    fn generate_invalid(&mut self) -> FormSubmission {
        let mut submission = self.generate_typical();
        if self.rng.gen_bool(0.5) {
            submission.age = round1(self.rng.gen_range(5.5..10.0));
        } else {
            submission.weight = -submission.weight;
        }
        submission
    }

    fn random_sex(&mut self) -> String {
        let sex = if self.rng.gen_bool(0.5) { "boy" } else { "girl" };
        sex.to_string()
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("submit_records=info".parse()?),
        )
        .init();

    info!("Starting Test Submission Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or("nutrition.submissions");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let undernourished_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.3);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(200);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        undernourished_rate = undernourished_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, undernourished_rate, delay_ms).await;
        }
    };

    let mut generator = SubmissionGenerator::new();

    for i in 0..count {
        let submission = next_submission(&mut generator, undernourished_rate);
        let payload = serde_json::to_vec(&submission)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => {
                let response: serde_json::Value = serde_json::from_slice(&reply.payload)?;
                info!(
                    n = i + 1,
                    age = submission.age,
                    sex = %submission.sex,
                    height = submission.height,
                    weight = submission.weight,
                    "Reply: {}",
                    response
                );
            }
            Err(e) => warn!(error = %e, "Submission request failed"),
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Submitted {} records", count);

    Ok(())
}

fn next_submission(generator: &mut SubmissionGenerator, undernourished_rate: f64) -> FormSubmission {
    let roll: f64 = rand::thread_rng().gen();
    if roll < 0.05 {
        generator.generate_invalid()
    } else if roll < 0.05 + undernourished_rate {
        generator.generate_undernourished()
    } else {
        generator.generate_typical()
    }
}

async fn run_dry_mode(count: u64, undernourished_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = SubmissionGenerator::new();

    for i in 0..count {
        let submission = next_submission(&mut generator, undernourished_rate);
        info!("Sample submission {}: {}", i + 1, serde_json::to_string(&submission)?);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
