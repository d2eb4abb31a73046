//! Per-indicator classifier availability

use crate::error::{InferenceError, LoadError};
use crate::models::inference::Classifier;
use crate::types::prediction::Indicator;
use std::sync::Arc;

/// A loaded classifier, or the reason it could not be loaded
pub type ClassifierSlot = Result<Arc<dyn Classifier>, LoadError>;

/// The three classifiers, loaded once at startup and shared read-only
pub struct ClassifierSet {
    /// Indexed by `Indicator::index`
    slots: [ClassifierSlot; 3],
}

impl ClassifierSet {
    pub fn new(
        stunting: ClassifierSlot,
        wasting: ClassifierSlot,
        weight_status: ClassifierSlot,
    ) -> Self {
        Self {
            slots: [stunting, wasting, weight_status],
        }
    }

    /// Build a set by producing the slot for each indicator in report order
    pub fn from_fn(f: impl FnMut(Indicator) -> ClassifierSlot) -> Self {
        Self {
            slots: Indicator::ALL.map(f),
        }
    }

    /// Classifier for an indicator, or an `Unavailable` error naming it
    pub fn get(&self, indicator: Indicator) -> Result<Arc<dyn Classifier>, InferenceError> {
        match &self.slots[indicator.index()] {
            Ok(classifier) => Ok(Arc::clone(classifier)),
            Err(e) => Err(InferenceError::from(e)),
        }
    }

    pub fn is_available(&self, indicator: Indicator) -> bool {
        self.slots[indicator.index()].is_ok()
    }

    pub fn available(&self) -> Vec<Indicator> {
        Indicator::ALL
            .into_iter()
            .filter(|i| self.is_available(*i))
            .collect()
    }

    pub fn available_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_ok()).count()
    }

    /// Load errors for the unavailable indicators, in report order
    pub fn unavailable(&self) -> Vec<&LoadError> {
        self.slots.iter().filter_map(|slot| slot.as_ref().err()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::inference::Inference;
    use std::path::PathBuf;

    struct Constant;

    impl Classifier for Constant {
        fn infer(&self, _features: &[f32]) -> Result<Inference, InferenceError> {
            Ok(Inference {
                label: "normal".to_string(),
                confidence: 1.0,
            })
        }
    }

    #[test]
    fn test_partial_availability() {
        let set = ClassifierSet::new(
            Ok(Arc::new(Constant)),
            Err(LoadError::NotFound {
                indicator: Indicator::Wasting,
                path: PathBuf::from("models/wasting.onnx"),
            }),
            Ok(Arc::new(Constant)),
        );

        assert_eq!(set.available_count(), 2);
        assert_eq!(
            set.available(),
            vec![Indicator::Stunting, Indicator::WeightStatus]
        );
        assert!(set.get(Indicator::Stunting).is_ok());

        let err = set.get(Indicator::Wasting).err().unwrap();
        assert!(matches!(err, InferenceError::Unavailable { indicator: Indicator::Wasting, .. }));
        assert_eq!(set.unavailable().len(), 1);
    }
}
