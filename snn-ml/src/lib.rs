//! # snn-ml: hyperparameter tuning for sequence classifiers
//!
//! Exhaustive grid search with cross-validation over user-supplied model
//! build functions, with a plain-text report and the training history of the
//! best configuration.
//!
//! ## Layers
//!
//! 1. **Grid**: parameter grids and candidate expansion ([`grid`])
//! 2. **Validation**: k-fold and stratified splitters ([`cv`])
//! 3. **Estimation**: the classifier adapter around build functions ([`estimator`])
//! 4. **Search**: parallel cross-validated scoring and refit ([`search`])
//! 5. **Tuning**: the [`ModelTuner`] front end and its report ([`tuner`], [`report`])

// Foundation
pub mod config;
pub mod error;
pub mod logging;

// Data and results
pub mod data;
pub mod history;
pub mod metrics;

// Search engine
pub mod cv;
pub mod estimator;
pub mod grid;
pub mod search;

// Front end
pub mod models;
pub mod report;
pub mod tuner;

// Re-exports
pub use config::{CvStrategy, SearchConfig, TunerConfig, load_config, load_grid};
pub use data::LabeledData;
pub use error::MlError;
pub use estimator::{ClassifierAdapter, FitOptions, FittedClassifier, Trainable};
pub use grid::{ParamGrid, ParamSet, ParamValue};
pub use history::History;
pub use metrics::ClassificationReport;
pub use models::{Architecture, BaseModel, ModelDescriptor};
pub use search::{CvResults, GridSearch, SearchResult};
pub use tuner::ModelTuner;
