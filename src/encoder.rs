//! Record encoding for classifier inference.
//!
//! Turns a validated child record into the feature vector the exported
//! classifiers were trained on.

use crate::types::record::ChildRecord;

/// Number of features in an encoded record
pub const FEATURE_COUNT: usize = 4;

/// Encodes child records into classifier input features.
///
/// Features are emitted in the column order used during training:
/// age, sex code, height, weight. The sex code comes from [`Sex::code`],
/// so every classifier sees the same mapping.
///
/// [`Sex::code`]: crate::types::record::Sex::code
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordEncoder;

impl RecordEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Encode a record into a feature vector
    pub fn encode(&self, record: &ChildRecord) -> [f32; FEATURE_COUNT] {
        [
            record.age() as f32,
            f32::from(record.sex().code()),
            record.height_cm() as f32,
            record.weight_kg() as f32,
        ]
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }

    /// Training column names, in encoding order
    pub fn feature_names(&self) -> [&'static str; FEATURE_COUNT] {
        ["Age", "Sex", "Height", "Weight"]
    }
}
