//! Type definitions for the prediction service

pub mod prediction;
pub mod record;
pub mod response;

pub use prediction::{Indicator, IndicatorOutcome, PredictionReport, PredictionResult};
pub use record::{ChildRecord, FormSubmission, Sex, ValidationRules};
pub use response::SubmissionResponse;
