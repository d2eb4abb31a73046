//! Configuration management for the prediction service

use crate::types::prediction::Indicator;
use crate::types::record::ValidationRules;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the configuration file path
pub const CONFIG_PATH_ENV: &str = "NUTRITION_CONFIG";

const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub models: ModelsConfig,
    #[serde(default)]
    pub validation: ValidationRules,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject carrying form submissions
    pub submission_subject: String,
    /// Subject prediction reports are published to
    pub report_subject: String,
    /// Queue group shared by service replicas
    #[serde(default)]
    pub queue_group: Option<String>,
}

/// Classifier artifacts configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    /// Directory containing ONNX model files
    pub models_dir: String,
    /// Number of threads for ONNX inference per model (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
    pub stunting: ClassifierConfig,
    pub wasting: ClassifierConfig,
    pub weight_status: ClassifierConfig,
}

/// One classifier artifact and its class labels
#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    /// File name relative to `models_dir`
    pub file: String,
    /// Class labels indexed by the model's class id
    pub labels: Vec<String>,
}

fn default_onnx_threads() -> usize {
    1
}

fn default_metrics_interval() -> u64 {
    30
}

impl ModelsConfig {
    pub fn classifier(&self, indicator: Indicator) -> &ClassifierConfig {
        match indicator {
            Indicator::Stunting => &self.stunting,
            Indicator::Wasting => &self.wasting,
            Indicator::WeightStatus => &self.weight_status,
        }
    }

    pub fn model_path(&self, indicator: Indicator) -> PathBuf {
        Path::new(&self.models_dir).join(&self.classifier(indicator).file)
    }
}

impl ClassifierConfig {
    fn new(file: &str, labels: &[&str]) -> Self {
        Self {
            file: file.to_string(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum submissions processed concurrently
    pub workers: usize,
    /// Seconds between metrics summaries
    #[serde(default = "default_metrics_interval")]
    pub metrics_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from `NUTRITION_CONFIG` or the default file
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path.
    ///
    /// Values can be overridden with `NUTRITION__SECTION__KEY` variables.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("NUTRITION")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config
            .validation
            .check()
            .map_err(|e| anyhow::anyhow!("Invalid validation rules: {}", e))?;

        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                submission_subject: "nutrition.submissions".to_string(),
                report_subject: "nutrition.reports".to_string(),
                queue_group: Some("nutrition-predictors".to_string()),
            },
            models: ModelsConfig {
                models_dir: "models".to_string(),
                onnx_threads: 1,
                stunting: ClassifierConfig::new(
                    "stunting.onnx",
                    &["normal", "severely stunted", "stunted", "tall"],
                ),
                wasting: ClassifierConfig::new(
                    "wasting.onnx",
                    &["normal", "severely wasted", "wasted"],
                ),
                weight_status: ClassifierConfig::new(
                    "weight_status.onnx",
                    &["normal", "obese", "overweight", "underweight"],
                ),
            },
            validation: ValidationRules::default(),
            pipeline: PipelineConfig {
                workers: 4,
                metrics_interval_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.validation.max_age, 5.0);
        assert_eq!(config.models.weight_status.labels.len(), 4);
        assert_eq!(
            config.models.model_path(Indicator::Wasting),
            PathBuf::from("models/wasting.onnx")
        );
    }

    fn write_config(validation: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[nats]
url = "nats://broker:4222"
submission_subject = "forms"
report_subject = "reports"

[models]
models_dir = "/srv/models"

[models.stunting]
file = "s.onnx"
labels = ["normal", "stunted"]

[models.wasting]
file = "w.onnx"
labels = ["normal", "wasted"]

[models.weight_status]
file = "ws.onnx"
labels = ["normal", "underweight"]

[validation]
{}

[pipeline]
workers = 2

[logging]
level = "debug"
format = "json"
"#,
            validation
        )
        .unwrap();
        file
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config("max_weight_kg = 40.0");

        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.nats.submission_subject, "forms");
        assert_eq!(config.nats.queue_group, None);
        assert_eq!(config.models.onnx_threads, 1);
        assert_eq!(config.models.classifier(Indicator::Stunting).file, "s.onnx");
        assert_eq!(config.validation.max_age, 5.0);
        assert_eq!(config.validation.max_weight_kg, Some(40.0));
        assert_eq!(config.pipeline.metrics_interval_secs, 30);
    }

    #[test]
    fn test_widened_age_range_rejected() {
        for validation in ["max_age = 18.0", "min_age = -3.0", "min_age = 4.0\nmax_age = 1.0"] {
            let file = write_config(validation);
            let err = AppConfig::load_from_path(file.path()).unwrap_err();
            assert!(
                err.to_string().contains("Invalid validation rules"),
                "{}: {}",
                validation,
                err
            );
        }
    }

    #[test]
    fn test_narrowed_age_range_accepted() {
        let file = write_config("min_age = 0.5\nmax_age = 2.0");
        let config = AppConfig::load_from_path(file.path()).unwrap();
        assert_eq!(config.validation.min_age, 0.5);
        assert_eq!(config.validation.max_age, 2.0);
    }

    #[test]
    fn test_shipped_config_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        let config = AppConfig::load_from_path(path).unwrap();
        let defaults = AppConfig::default();
        assert_eq!(config.models.stunting.labels, defaults.models.stunting.labels);
        assert_eq!(config.nats.queue_group, defaults.nats.queue_group);
        assert!(config.validation.check().is_ok());
    }
}
