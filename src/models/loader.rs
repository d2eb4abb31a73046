//! ONNX classifier loader

use crate::config::ModelsConfig;
use crate::error::LoadError;
use crate::models::inference::{Classifier, OnnxClassifier};
use crate::models::registry::ClassifierSet;
use crate::types::prediction::Indicator;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Loaded ONNX model with metadata
pub struct LoadedModel {
    /// Indicator the model predicts
    pub indicator: Indicator,
    /// ONNX Runtime session
    pub session: Session,
    /// Input name for the model
    pub input_name: String,
    /// Output name for class probabilities
    pub output_name: String,
}

/// Loader for ONNX classifiers
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
}

impl ModelLoader {
    /// Create a new model loader with default settings (1 thread)
    pub fn new() -> Result<Self> {
        Self::with_threads(1)
    }

    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> Result<Self> {
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self { onnx_threads })
    }

    /// Load a single ONNX model from file
    pub fn load_model<P: AsRef<Path>>(
        &self,
        path: P,
        indicator: Indicator,
    ) -> Result<LoadedModel, LoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(LoadError::NotFound {
                indicator,
                path: path.to_path_buf(),
            });
        }

        info!(
            indicator = %indicator,
            path = %path.display(),
            threads = self.onnx_threads,
            "Loading ONNX model"
        );

        let session = self
            .build_session(path)
            .map_err(|e| LoadError::Session {
                indicator,
                path: path.to_path_buf(),
                message: format!("{:#}", e),
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob") || o.name.contains("output"))
            .map(|o| o.name.clone())
            .unwrap_or_else(|| {
                session
                    .outputs
                    .last()
                    .map(|o| o.name.clone())
                    .unwrap_or_else(|| "probabilities".to_string())
            });

        info!(
            indicator = %indicator,
            input = %input_name,
            output = %output_name,
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            indicator,
            session,
            input_name,
            output_name,
        })
    }

    fn build_session(&self, path: &Path) -> Result<Session> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;
        Ok(session)
    }

    /// Load the classifier for one indicator
    pub fn load_classifier(
        &self,
        config: &ModelsConfig,
        indicator: Indicator,
    ) -> Result<Arc<dyn Classifier>, LoadError> {
        let labels = config.classifier(indicator).labels.clone();
        if labels.is_empty() {
            return Err(LoadError::NoLabels { indicator });
        }

        let model = self.load_model(config.model_path(indicator), indicator)?;
        Ok(Arc::new(OnnxClassifier::new(model, labels)))
    }

    /// Load all three classifiers.
    ///
    /// A failure only marks that indicator unavailable; the caller decides
    /// whether the remaining set is usable.
    pub fn load_all(&self, config: &ModelsConfig) -> ClassifierSet {
        let set = ClassifierSet::from_fn(|indicator| {
            self.load_classifier(config, indicator).map_err(|e| {
                warn!(indicator = %indicator, error = %e, "Classifier unavailable");
                e
            })
        });

        info!(
            available = ?set.available(),
            "Loaded {} of {} classifiers from {}",
            set.available_count(),
            Indicator::ALL.len(),
            config.models_dir
        );

        set
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self { onnx_threads: 1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn models_config(dir: &Path) -> ModelsConfig {
        let mut config = AppConfig::default().models;
        config.models_dir = dir.to_string_lossy().into_owned();
        config
    }

    #[test]
    fn test_missing_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let loader = ModelLoader::default();

        let err = loader
            .load_model(dir.path().join("wasting.onnx"), Indicator::Wasting)
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::NotFound { indicator: Indicator::Wasting, .. }));
    }

    #[test]
    fn test_missing_labels() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = models_config(dir.path());
        config.stunting.labels.clear();

        let err = ModelLoader::default()
            .load_classifier(&config, Indicator::Stunting)
            .err()
            .unwrap();
        assert!(matches!(err, LoadError::NoLabels { indicator: Indicator::Stunting }));
    }

    #[test]
    fn test_load_all_reports_every_unavailable_indicator() {
        let dir = tempfile::tempdir().unwrap();
        let set = ModelLoader::default().load_all(&models_config(dir.path()));

        assert_eq!(set.available_count(), 0);
        let missing: Vec<Indicator> = set.unavailable().iter().map(|e| e.indicator()).collect();
        assert_eq!(missing, Indicator::ALL.to_vec());
    }

    #[test]
    fn test_corrupt_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wasting.onnx");
        std::fs::write(&path, b"this is not an onnx graph").unwrap();

        let loader = ModelLoader::default();
        let err = loader.load_model(&path, Indicator::Wasting).err().unwrap();
        assert!(matches!(err, LoadError::Session { indicator: Indicator::Wasting, .. }));

        let set = loader.load_all(&models_config(dir.path()));
        assert_eq!(set.available_count(), 0);

        let errors = set.unavailable();
        assert_eq!(errors.len(), 3);
        assert!(matches!(errors[0], LoadError::NotFound { indicator: Indicator::Stunting, .. }));
        assert!(matches!(errors[1], LoadError::Session { indicator: Indicator::Wasting, .. }));
        assert!(matches!(
            errors[2],
            LoadError::NotFound { indicator: Indicator::WeightStatus, .. }
        ));
    }
}
