//! Classifier abstraction and the ONNX-backed implementation

use crate::error::InferenceError;
use crate::models::loader::LoadedModel;
use crate::types::prediction::Indicator;
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType, Tensor};
use std::sync::Mutex;
use tracing::debug;

/// Label and confidence returned by one classifier
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    pub label: String,
    /// Probability of `label` (0.0 - 1.0)
    pub confidence: f64,
}

/// A pre-trained classifier shared read-only across submissions
pub trait Classifier: Send + Sync {
    /// Classify one encoded record
    fn infer(&self, features: &[f32]) -> Result<Inference, InferenceError>;
}

/// Classifier backed by an ONNX Runtime session
pub struct OnnxClassifier {
    indicator: Indicator,
    /// Session run needs exclusive access
    model: Mutex<LoadedModel>,
    /// Class labels indexed by class id
    labels: Vec<String>,
}

impl OnnxClassifier {
    pub fn new(model: LoadedModel, labels: Vec<String>) -> Self {
        Self {
            indicator: model.indicator,
            model: Mutex::new(model),
            labels,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    fn runtime_error(&self, message: impl Into<String>) -> InferenceError {
        InferenceError::Runtime {
            indicator: self.indicator,
            message: message.into(),
        }
    }

    /// Run the session and return per-class probabilities
    fn class_probabilities(&self, features: &[f32]) -> Result<Vec<f64>, InferenceError> {
        // Shape [1, num_features]
        let shape = vec![1_i64, features.len() as i64];
        let input_tensor = Tensor::from_array((shape, features.to_vec()))
            .map_err(|e| self.runtime_error(format!("failed to create input tensor: {}", e)))?;

        let mut guard = self
            .model
            .lock()
            .map_err(|_| self.runtime_error("session lock poisoned"))?;
        let model = &mut *guard;

        let outputs = model
            .session
            .run(ort::inputs![model.input_name.as_str() => input_tensor])
            .map_err(|e| self.runtime_error(e.to_string()))?;

        extract_probabilities(&outputs, &model.output_name, self.indicator).ok_or_else(|| {
            InferenceError::MalformedOutput {
                indicator: self.indicator,
                message: format!("no class probabilities in output '{}'", model.output_name),
            }
        })
    }
}

impl Classifier for OnnxClassifier {
    fn infer(&self, features: &[f32]) -> Result<Inference, InferenceError> {
        let probabilities = self.class_probabilities(features)?;
        decode_probabilities(self.indicator, &probabilities, &self.labels)
    }
}

/// Pick the most probable class and map it to its label.
///
/// Class ids without a configured label are reported by number.
pub fn decode_probabilities(
    indicator: Indicator,
    probabilities: &[f64],
    labels: &[String],
) -> Result<Inference, InferenceError> {
    let malformed = |message: String| InferenceError::MalformedOutput { indicator, message };

    if probabilities.is_empty() {
        return Err(malformed("empty probability vector".to_string()));
    }

    if let Some(bad) = probabilities
        .iter()
        .find(|p| !p.is_finite() || **p < 0.0 || **p > 1.0)
    {
        return Err(malformed(format!("probability {} outside [0, 1]", bad)));
    }

    let (class_id, confidence) = probabilities
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::MIN), |best, (i, p)| if p > best.1 { (i, p) } else { best });

    let label = labels
        .get(class_id)
        .cloned()
        .unwrap_or_else(|| class_id.to_string());

    Ok(Inference { label, confidence })
}

/// Extract class probabilities from session outputs.
///
/// Handles plain tensor outputs and the seq(map(int64, float)) layout
/// produced by tree-ensemble exporters.
fn extract_probabilities(
    outputs: &ort::session::SessionOutputs,
    output_name: &str,
    indicator: Indicator,
) -> Option<Vec<f64>> {
    if let Some(output) = outputs.get(output_name) {
        if let Some(probs) = probabilities_from_value(output, indicator) {
            return Some(probs);
        }
    }

    for (name, output) in outputs.iter() {
        // The label output carries class ids, not probabilities
        if name.contains("label") {
            continue;
        }
        if let Some(probs) = probabilities_from_value(&output, indicator) {
            debug!(indicator = %indicator, output = %name, "Extracted probabilities (fallback)");
            return Some(probs);
        }
    }

    None
}

fn probabilities_from_value(output: &ort::value::DynValue, indicator: Indicator) -> Option<Vec<f64>> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        let probs = probabilities_from_tensor(&dims, data);
        debug!(indicator = %indicator, probs = ?probs, "Extracted from tensor");
        return Some(probs);
    }

    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        match probabilities_from_sequence_map(output) {
            Ok(probs) => {
                debug!(indicator = %indicator, probs = ?probs, "Extracted from seq(map)");
                return Some(probs);
            }
            Err(e) => {
                debug!(indicator = %indicator, error = %e, "Sequence output not usable");
            }
        }
    }

    None
}

/// Probabilities for the single batch row of a `[1, n]` or `[n]` tensor
fn probabilities_from_tensor(dims: &[i64], data: &[f32]) -> Vec<f64> {
    let row_len = match dims {
        [_, classes] if *classes > 0 => *classes as usize,
        _ => data.len(),
    };
    data.iter().take(row_len).map(|&v| v as f64).collect()
}

fn probabilities_from_sequence_map(output: &ort::value::DynValue) -> anyhow::Result<Vec<f64>> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| anyhow::anyhow!("Failed to downcast to sequence: {}", e))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;

    // batch size is always 1
    let map_value = maps
        .first()
        .ok_or_else(|| anyhow::anyhow!("Empty sequence"))?;

    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
    probabilities_from_pairs(&kv_pairs)
}

/// Largest class id accepted from a seq(map) output
const MAX_CLASS_ID: i64 = 1024;

/// Dense probability vector from (class id, probability) pairs
fn probabilities_from_pairs(pairs: &[(i64, f32)]) -> anyhow::Result<Vec<f64>> {
    if let Some((class_id, _)) = pairs
        .iter()
        .find(|(class_id, _)| !(0..=MAX_CLASS_ID).contains(class_id))
    {
        anyhow::bail!("class id {} outside [0, {}]", class_id, MAX_CLASS_ID);
    }

    let size = pairs
        .iter()
        .map(|(class_id, _)| *class_id as usize + 1)
        .max()
        .unwrap_or(0);

    let mut probs = vec![0.0; size];
    for (class_id, prob) in pairs {
        probs[*class_id as usize] = *prob as f64;
    }
    Ok(probs)
}
