//! Child Nutrition Prediction Library
//!
//! Validates child measurements, encodes them, and dispatches them to
//! pre-trained stunting, wasting and weight-status classifiers.

pub mod config;
pub mod consumer;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use consumer::SubmissionConsumer;
pub use encoder::RecordEncoder;
pub use error::{InferenceError, LoadError, ValidationError};
pub use models::{ClassifierSet, Dispatcher};
pub use producer::ReportProducer;
pub use service::SubmissionHandler;
pub use types::{ChildRecord, FormSubmission, Indicator, PredictionReport, PredictionResult};
