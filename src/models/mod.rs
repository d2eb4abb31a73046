//! Classifier loading, inference and dispatch

pub mod dispatcher;
pub mod inference;
pub mod loader;
pub mod registry;

pub use dispatcher::Dispatcher;
pub use inference::{Classifier, Inference, OnnxClassifier};
pub use loader::ModelLoader;
pub use registry::ClassifierSet;
