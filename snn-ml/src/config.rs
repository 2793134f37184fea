//! Configuration for tuning runs.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment. Configuration is loaded from
//! `~/.config/snn/tuner.toml` and/or `.snn/tuner.toml` in the workspace.

use crate::cv::{CrossValidator, KFold, StratifiedKFold};
use crate::error::MlError;
use crate::grid::ParamGrid;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How training rows are split into folds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CvStrategy {
    #[default]
    Stratified,
    KFold,
}

/// Cross-validation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvConfig {
    /// Number of folds.
    #[serde(default = "default_folds")]
    pub folds: usize,
    #[serde(default)]
    pub strategy: CvStrategy,
    /// Shuffle before assigning folds.
    #[serde(default)]
    pub shuffle: bool,
    /// Seed for the shuffle; fresh entropy when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for CvConfig {
    fn default() -> Self {
        Self {
            folds: default_folds(),
            strategy: CvStrategy::default(),
            shuffle: false,
            seed: None,
        }
    }
}

impl CvConfig {
    pub fn splitter(&self) -> Box<dyn CrossValidator> {
        match self.strategy {
            CvStrategy::Stratified => {
                let cv = StratifiedKFold::new(self.folds);
                Box::new(if self.shuffle { cv.shuffled(self.seed) } else { cv })
            }
            CvStrategy::KFold => {
                let cv = KFold::new(self.folds);
                Box::new(if self.shuffle { cv.shuffled(self.seed) } else { cv })
            }
        }
    }
}

/// Settings for a single grid search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub cv: CvConfig,
    /// Worker threads for candidate fits; all cores when unset.
    #[serde(default)]
    pub n_jobs: Option<usize>,
    #[serde(default = "default_true")]
    pub verbose: bool,
    /// Refit the best candidate on the full training set.
    #[serde(default = "default_true")]
    pub refit: bool,
    #[serde(default)]
    pub return_train_score: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cv: CvConfig::default(),
            n_jobs: None,
            verbose: true,
            refit: true,
            return_train_score: false,
        }
    }
}

/// Settings for [`crate::tuner::ModelTuner`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunerConfig {
    /// Cross-validation fold count.
    #[serde(default = "default_folds")]
    pub cross_validation: usize,
    /// Log search progress and per-epoch training output.
    #[serde(default = "default_true")]
    pub log: bool,
    #[serde(default)]
    pub n_jobs: Option<usize>,
    #[serde(default)]
    pub cv_strategy: CvStrategy,
    #[serde(default)]
    pub shuffle: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Decimals in the classification report.
    #[serde(default = "default_report_digits")]
    pub report_digits: usize,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            cross_validation: default_folds(),
            log: true,
            n_jobs: None,
            cv_strategy: CvStrategy::default(),
            shuffle: false,
            seed: None,
            report_digits: default_report_digits(),
        }
    }
}

impl TunerConfig {
    /// The search settings a tuning run uses: always refit, no train scores.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            cv: CvConfig {
                folds: self.cross_validation,
                strategy: self.cv_strategy,
                shuffle: self.shuffle,
                seed: self.seed,
            },
            n_jobs: self.n_jobs,
            verbose: self.log,
            refit: true,
            return_train_score: false,
        }
    }
}

fn default_folds() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_report_digits() -> usize {
    2
}

/// Load tuner configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `SNN_`, e.g. `SNN_CROSS_VALIDATION=5`)
/// 2. Workspace-local config (`.snn/tuner.toml`)
/// 3. User config (`~/.config/snn/tuner.toml`)
/// 4. Built-in defaults
pub fn load_config(workspace: Option<&Path>) -> Result<TunerConfig, MlError> {
    let mut figment = Figment::from(Serialized::defaults(TunerConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("dev", "snn", "snn") {
        let user_config = config_dir.config_dir().join("tuner.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".snn").join("tuner.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    figment = figment.merge(Env::prefixed("SNN_").split("__"));

    Ok(figment.extract()?)
}

/// Read a parameter grid from the `grid` key of a TOML file.
///
/// The key holds either a table (`[grid]`) or an array of tables (`[[grid]]`).
pub fn load_grid(path: &Path) -> Result<ParamGrid, MlError> {
    if !path.exists() {
        return Err(MlError::invalid_input(format!(
            "grid file {} does not exist",
            path.display()
        )));
    }
    Ok(Figment::from(Toml::file(path)).extract_inner("grid")?)
}
