//! Child Nutrition Prediction Service - Main Entry Point
//!
//! Consumes form submissions from NATS, predicts stunting, wasting and
//! weight status, and replies with the prediction report.

use anyhow::{Context, Result};
use child_nutrition_predictor::{
    config::{AppConfig, LoggingConfig},
    consumer::SubmissionConsumer,
    metrics::{DispatchMetrics, MetricsReporter},
    models::{Dispatcher, ModelLoader},
    producer::ReportProducer,
    service::{SubmissionHandler, WorkerPool},
    types::SubmissionResponse,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging);

    info!("Starting Child Nutrition Prediction Service");
    info!(
        min_age = config.validation.min_age,
        max_age = config.validation.max_age,
        max_height_cm = ?config.validation.max_height_cm,
        max_weight_kg = ?config.validation.max_weight_kg,
        "Validation rules loaded"
    );

    let metrics = Arc::new(DispatchMetrics::new());

    // Classifiers are loaded once and shared read-only for the process lifetime
    let loader = ModelLoader::with_threads(config.models.onnx_threads)?;
    let classifiers = loader.load_all(&config.models);
    for err in classifiers.unavailable() {
        warn!(indicator = %err.indicator(), error = %err, "Indicator unavailable");
    }
    if classifiers.available_count() == 0 {
        anyhow::bail!("No classifiers loaded from {}", config.models.models_dir);
    }

    let dispatcher = Arc::new(
        Dispatcher::new(Arc::new(classifiers), config.validation.clone())
            .with_metrics(metrics.clone()),
    );
    let handler = Arc::new(SubmissionHandler::new(dispatcher, metrics.clone()));

    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = SubmissionConsumer::new(client.clone(), &config.nats);
    let producer = Arc::new(ReportProducer::new(client.clone(), &config.nats.report_subject));

    info!(
        workers = config.pipeline.workers,
        submissions = %consumer.subject(),
        reports = %producer.subject(),
        "Starting submission loop"
    );

    let workers = WorkerPool::new(config.pipeline.workers);

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let message = tokio::select! {
            message = subscription.next() => match message {
                Some(message) => message,
                None => break,
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received");
                break;
            }
        };

        // Acquire permit (limits in-flight submissions)
        let permit = workers.acquire().await?;

        let handler = handler.clone();
        let producer = producer.clone();

        tokio::spawn(async move {
            let response = handler.handle(&message.payload).await;

            if let SubmissionResponse::Ok { report } = &response {
                if let Err(e) = producer.publish(report).await {
                    error!(
                        submission_id = %report.submission_id,
                        error = %e,
                        "Failed to publish prediction report"
                    );
                }
            }

            if let Some(reply_to) = message.reply.clone() {
                if let Err(e) = producer.reply(reply_to, &response).await {
                    error!(error = %e, "Failed to send submission reply");
                }
            }

            drop(permit);
        });
    }

    info!("Prediction service shutting down...");
    drop(subscription);
    workers.drain().await?;
    client
        .flush()
        .await
        .context("Failed to flush pending replies")?;
    metrics.print_summary();

    Ok(())
}
