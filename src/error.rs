//! Error taxonomy for validation, classifier loading and inference

use crate::types::prediction::Indicator;
use std::path::PathBuf;
use thiserror::Error;

/// Form input that cannot be turned into a record. Recoverable by re-prompting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("age must be between {min} and {max} years, got {value}")]
    AgeOutOfRange { value: f64, min: f64, max: f64 },

    #[error("{field} must be a finite, non-negative number, got {value}")]
    InvalidMeasurement { field: &'static str, value: f64 },

    #[error("{field} must not exceed {max}, got {value}")]
    MeasurementTooLarge {
        field: &'static str,
        value: f64,
        max: f64,
    },

    #[error("unrecognized sex '{0}', expected 'boy' or 'girl'")]
    UnknownSex(String),
}

/// Classifier artifact that could not be loaded at startup
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    #[error("{indicator} model not found at {}", path.display())]
    NotFound { indicator: Indicator, path: PathBuf },

    #[error("failed to load {indicator} model from {}: {message}", path.display())]
    Session {
        indicator: Indicator,
        path: PathBuf,
        message: String,
    },

    #[error("{indicator} model has no class labels configured")]
    NoLabels { indicator: Indicator },
}

impl LoadError {
    pub fn indicator(&self) -> Indicator {
        match self {
            LoadError::NotFound { indicator, .. }
            | LoadError::Session { indicator, .. }
            | LoadError::NoLabels { indicator } => *indicator,
        }
    }
}

/// Failure to obtain a prediction for one indicator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("{indicator} classifier unavailable: {reason}")]
    Unavailable { indicator: Indicator, reason: String },

    #[error("{indicator} inference failed: {message}")]
    Runtime { indicator: Indicator, message: String },

    #[error("{indicator} classifier returned unusable output: {message}")]
    MalformedOutput { indicator: Indicator, message: String },
}

impl InferenceError {
    pub fn indicator(&self) -> Indicator {
        match self {
            InferenceError::Unavailable { indicator, .. }
            | InferenceError::Runtime { indicator, .. }
            | InferenceError::MalformedOutput { indicator, .. } => *indicator,
        }
    }
}

impl From<&LoadError> for InferenceError {
    fn from(err: &LoadError) -> Self {
        InferenceError::Unavailable {
            indicator: err.indicator(),
            reason: err.to_string(),
        }
    }
}
