//! Inference request building and dispatch across the three classifiers

use crate::encoder::RecordEncoder;
use crate::error::{InferenceError, ValidationError};
use crate::metrics::DispatchMetrics;
use crate::models::inference::{Classifier, Inference};
use crate::models::registry::ClassifierSet;
use crate::types::prediction::{Indicator, IndicatorOutcome, PredictionReport, PredictionResult};
use crate::types::record::{ChildRecord, FormSubmission, ValidationRules};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Validates form input and routes the encoded record to every classifier.
///
/// Each indicator is dispatched independently: a missing classifier or a
/// failed inference becomes a `Failed` outcome for that indicator only.
pub struct Dispatcher {
    classifiers: Arc<ClassifierSet>,
    encoder: RecordEncoder,
    rules: ValidationRules,
    metrics: Option<Arc<DispatchMetrics>>,
}

impl Dispatcher {
    pub fn new(classifiers: Arc<ClassifierSet>, rules: ValidationRules) -> Self {
        Self {
            classifiers,
            encoder: RecordEncoder::new(),
            rules,
            metrics: None,
        }
    }

    /// Record per-indicator outcomes and rejections
    pub fn with_metrics(mut self, metrics: Arc<DispatchMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn classifiers(&self) -> &ClassifierSet {
        &self.classifiers
    }

    pub fn rules(&self) -> &ValidationRules {
        &self.rules
    }

    /// Validate raw form input into a record
    pub fn build_record(&self, form: FormSubmission) -> Result<ChildRecord, ValidationError> {
        form.into_record(&self.rules).map_err(|e| {
            if let Some(metrics) = &self.metrics {
                metrics.record_rejection();
            }
            e
        })
    }

    /// Validate then predict sequentially
    pub fn submit(&self, form: FormSubmission) -> Result<PredictionReport, ValidationError> {
        let record = self.build_record(form)?;
        Ok(self.predict(&record))
    }

    /// Validate then predict with the indicators running concurrently
    pub async fn submit_concurrent(
        &self,
        form: FormSubmission,
    ) -> Result<PredictionReport, ValidationError> {
        let record = self.build_record(form)?;
        Ok(self.predict_concurrent(&record).await)
    }

    /// Run the three classifiers one after another on the calling thread
    pub fn predict(&self, record: &ChildRecord) -> PredictionReport {
        let features = self.encoder.encode(record);

        let outcomes = Indicator::ALL
            .into_iter()
            .map(|indicator| match self.classifiers.get(indicator) {
                Ok(classifier) => run_classifier(
                    indicator,
                    classifier.as_ref(),
                    &features,
                    self.metrics.as_deref(),
                ),
                Err(e) => self.unavailable(&e),
            })
            .collect();

        PredictionReport::new(outcomes)
    }

    /// Run each classifier on its own blocking task.
    ///
    /// Outcomes keep `Indicator::ALL` order regardless of completion order.
    pub async fn predict_concurrent(&self, record: &ChildRecord) -> PredictionReport {
        let features: Arc<[f32]> = Arc::from(&self.encoder.encode(record)[..]);

        let tasks = Indicator::ALL.into_iter().map(|indicator| {
            let slot = self.classifiers.get(indicator);
            let features = Arc::clone(&features);
            let metrics = self.metrics.clone();

            async move {
                let classifier = match slot {
                    Ok(classifier) => classifier,
                    Err(e) => return self.unavailable(&e),
                };

                let task = tokio::task::spawn_blocking(move || {
                    run_classifier(indicator, classifier.as_ref(), &features, metrics.as_deref())
                });

                match task.await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        let error = InferenceError::Runtime {
                            indicator,
                            message: format!("inference task did not complete: {}", e),
                        };
                        self.failure(&error)
                    }
                }
            }
        });

        PredictionReport::new(join_all(tasks).await)
    }

    fn unavailable(&self, error: &InferenceError) -> IndicatorOutcome {
        debug!(indicator = %error.indicator(), error = %error, "Skipping unavailable classifier");
        self.failure(error)
    }

    fn failure(&self, error: &InferenceError) -> IndicatorOutcome {
        if let Some(metrics) = &self.metrics {
            metrics.record_failure(error.indicator());
        }
        IndicatorOutcome::failed(error)
    }
}

/// Run one classifier and turn its answer into an outcome
fn run_classifier(
    indicator: Indicator,
    classifier: &dyn Classifier,
    features: &[f32],
    metrics: Option<&DispatchMetrics>,
) -> IndicatorOutcome {
    let start = Instant::now();
    let result = classifier
        .infer(features)
        .and_then(|inference| into_result(indicator, inference));
    let elapsed = start.elapsed();

    match result {
        Ok(result) => {
            debug!(
                indicator = %indicator,
                label = %result.label,
                confidence = result.confidence,
                inference_time_us = elapsed.as_micros(),
                "Prediction complete"
            );
            if let Some(metrics) = metrics {
                metrics.record_prediction(&result, elapsed);
            }
            IndicatorOutcome::Predicted(result)
        }
        Err(e) => {
            warn!(indicator = %indicator, error = %e, "Inference failed");
            if let Some(metrics) = metrics {
                metrics.record_failure(indicator);
            }
            IndicatorOutcome::failed(&e)
        }
    }
}

fn into_result(indicator: Indicator, inference: Inference) -> Result<PredictionResult, InferenceError> {
    if !(0.0..=1.0).contains(&inference.confidence) {
        return Err(InferenceError::MalformedOutput {
            indicator,
            message: format!("confidence {} outside [0, 1]", inference.confidence),
        });
    }

    Ok(PredictionResult {
        indicator,
        label: inference.label,
        confidence: inference.confidence,
    })
}
