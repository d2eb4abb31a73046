//! Prediction results and the per-submission report

use crate::error::InferenceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Malnutrition indicator predicted by one classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Height-for-age
    Stunting,
    /// Weight-for-height
    Wasting,
    /// Weight-for-age
    WeightStatus,
}

impl Indicator {
    /// All indicators in report order
    pub const ALL: [Indicator; 3] = [
        Indicator::Stunting,
        Indicator::Wasting,
        Indicator::WeightStatus,
    ];

    /// Position of the indicator within a report
    pub fn index(self) -> usize {
        match self {
            Indicator::Stunting => 0,
            Indicator::Wasting => 1,
            Indicator::WeightStatus => 2,
        }
    }

    /// Configuration key for the indicator
    pub fn key(self) -> &'static str {
        match self {
            Indicator::Stunting => "stunting",
            Indicator::Wasting => "wasting",
            Indicator::WeightStatus => "weight_status",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Indicator::Stunting => "stunting",
            Indicator::Wasting => "wasting",
            Indicator::WeightStatus => "weight status",
        };
        f.write_str(name)
    }
}

/// Labelled prediction for a single indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub indicator: Indicator,
    /// Predicted category
    pub label: String,
    /// Probability of the predicted category (0.0 - 1.0)
    pub confidence: f64,
}

impl PredictionResult {
    /// Confidence as shown to the user
    pub fn confidence_percent(&self) -> f64 {
        self.confidence * 100.0
    }
}

/// Outcome of dispatching one indicator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IndicatorOutcome {
    Predicted(PredictionResult),
    Failed { indicator: Indicator, error: String },
}

impl IndicatorOutcome {
    pub fn failed(error: &InferenceError) -> Self {
        IndicatorOutcome::Failed {
            indicator: error.indicator(),
            error: error.to_string(),
        }
    }

    pub fn indicator(&self) -> Indicator {
        match self {
            IndicatorOutcome::Predicted(result) => result.indicator,
            IndicatorOutcome::Failed { indicator, .. } => *indicator,
        }
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            IndicatorOutcome::Predicted(result) => Some(result),
            IndicatorOutcome::Failed { .. } => None,
        }
    }
}

/// Everything produced for one form submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionReport {
    /// Unique submission identifier
    pub submission_id: String,

    /// Report generation timestamp
    pub timestamp: DateTime<Utc>,

    /// One outcome per indicator, in `Indicator::ALL` order
    pub outcomes: Vec<IndicatorOutcome>,
}

impl PredictionReport {
    pub fn new(outcomes: Vec<IndicatorOutcome>) -> Self {
        Self {
            submission_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            outcomes,
        }
    }

    /// Successful predictions in report order
    pub fn results(&self) -> Vec<&PredictionResult> {
        self.outcomes
            .iter()
            .filter_map(IndicatorOutcome::prediction)
            .collect()
    }

    /// Indicators that produced no prediction, with the reason
    pub fn failures(&self) -> Vec<(Indicator, &str)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                IndicatorOutcome::Failed { indicator, error } => Some((*indicator, error.as_str())),
                IndicatorOutcome::Predicted(_) => None,
            })
            .collect()
    }

    pub fn get(&self, indicator: Indicator) -> Option<&IndicatorOutcome> {
        self.outcomes.iter().find(|o| o.indicator() == indicator)
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.len() == Indicator::ALL.len()
            && self.outcomes.iter().all(|o| o.prediction().is_some())
    }

    /// Human-readable lines for the presentation layer
    pub fn render_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.outcomes.len() * 2);
        for outcome in &self.outcomes {
            match outcome {
                IndicatorOutcome::Predicted(result) => {
                    lines.push(format!("{} prediction: {}", result.indicator, result.label));
                    lines.push(format!(
                        "prediction confidence: {:.2}",
                        result.confidence_percent()
                    ));
                }
                IndicatorOutcome::Failed { indicator, error } => {
                    lines.push(format!("{} prediction unavailable: {}", indicator, error));
                }
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn predicted(indicator: Indicator, label: &str, confidence: f64) -> IndicatorOutcome {
        IndicatorOutcome::Predicted(PredictionResult {
            indicator,
            label: label.to_string(),
            confidence,
        })
    }

    #[test]
    fn test_indicator_order() {
        for (i, indicator) in Indicator::ALL.iter().enumerate() {
            assert_eq!(indicator.index(), i);
        }
        assert_eq!(Indicator::WeightStatus.key(), "weight_status");
        assert_eq!(Indicator::WeightStatus.to_string(), "weight status");
    }

    #[test]
    fn test_render_lines() {
        let report = PredictionReport::new(vec![
            predicted(Indicator::Stunting, "normal", 0.875),
            predicted(Indicator::Wasting, "wasted", 0.6),
            predicted(Indicator::WeightStatus, "underweight", 1.0),
        ]);

        assert!(report.is_complete());
        assert_eq!(
            report.render_lines(),
            vec![
                "stunting prediction: normal",
                "prediction confidence: 87.50",
                "wasting prediction: wasted",
                "prediction confidence: 60.00",
                "weight status prediction: underweight",
                "prediction confidence: 100.00",
            ]
        );
    }

    #[test]
    fn test_failed_outcome() {
        let error = InferenceError::Unavailable {
            indicator: Indicator::Wasting,
            reason: "model file missing".to_string(),
        };
        let report = PredictionReport::new(vec![
            predicted(Indicator::Stunting, "normal", 0.9),
            IndicatorOutcome::failed(&error),
            predicted(Indicator::WeightStatus, "normal", 0.7),
        ]);

        assert!(!report.is_complete());
        assert_eq!(report.results().len(), 2);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].0, Indicator::Wasting);
        assert!(report.render_lines()[2].starts_with("wasting prediction unavailable:"));
    }

    #[test]
    fn test_report_serialization() {
        let report = PredictionReport::new(vec![predicted(Indicator::Stunting, "stunted", 0.66)]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcomes"][0]["status"], "predicted");
        assert_eq!(json["outcomes"][0]["indicator"], "stunting");

        let deserialized: PredictionReport = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized.submission_id, report.submission_id);
        assert_eq!(deserialized.outcomes, report.outcomes);
    }
}
