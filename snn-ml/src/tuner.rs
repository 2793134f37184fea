//! Hyperparameter tuning front end.
//!
//! [`ModelTuner`] wires a build function into a cross-validated
//! [`GridSearch`], prints the search summary and hands back the training
//! history of the refit best model.

use crate::config::TunerConfig;
use crate::data::LabeledData;
use crate::error::MlError;
use crate::estimator::{ClassifierAdapter, Trainable};
use crate::grid::{ParamGrid, ParamSet};
use crate::history::History;
use crate::metrics::ClassificationReport;
use crate::report::write_search_report;
use crate::search::GridSearch;
use ndarray::{ArrayView1, ArrayView2};
use std::io::Write;
use tracing::{Level, debug, info};

/// Grid-searches a model family and reports the best configuration.
#[derive(Debug, Clone, Default)]
pub struct ModelTuner {
    config: TunerConfig,
}

impl ModelTuner {
    pub fn new(config: TunerConfig) -> Self {
        Self { config }
    }

    /// Number of cross-validation folds.
    pub fn cross_validation(mut self, folds: usize) -> Self {
        self.config.cross_validation = folds;
        self
    }

    /// Log search progress and per-epoch training output.
    pub fn log(mut self, log: bool) -> Self {
        self.config.log = log;
        self
    }

    /// Worker threads for candidate fits; `None` uses every core.
    pub fn n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.config.n_jobs = n_jobs;
        self
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    /// Search `parameters` on `train`, print the report to stdout and return
    /// the best model's training history.
    ///
    /// When both `x_test` and `y_test` are given they serve as validation data
    /// for every fit and the report ends with a classification report on them.
    ///
    /// Labels are class values, one per row. One-hot targets of shape
    /// `[n_samples, n_classes]` convert with [`crate::data::labels_from_one_hot`].
    pub fn tune_hyperparameters<F, M>(
        &self,
        build_fn: F,
        parameters: &ParamGrid,
        train: LabeledData<'_>,
        x_test: Option<ArrayView2<'_, f64>>,
        y_test: Option<ArrayView1<'_, usize>>,
    ) -> Result<History, MlError>
    where
        F: Fn(&ParamSet) -> Result<M, MlError> + Sync,
        M: Trainable,
    {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        self.tune_with_writer(build_fn, parameters, train, x_test, y_test, &mut out)
    }

    /// [`Self::tune_hyperparameters`] writing the report to `out`.
    pub fn tune_with_writer<F, M, W>(
        &self,
        build_fn: F,
        parameters: &ParamGrid,
        train: LabeledData<'_>,
        x_test: Option<ArrayView2<'_, f64>>,
        y_test: Option<ArrayView1<'_, usize>>,
        out: &mut W,
    ) -> Result<History, MlError>
    where
        F: Fn(&ParamSet) -> Result<M, MlError> + Sync,
        M: Trainable,
        W: Write,
    {
        let holdout = match (x_test, y_test) {
            (Some(x), Some(y)) => Some(LabeledData::new(x, y)?),
            _ => None,
        };

        let adapter = ClassifierAdapter::new(build_fn).verbose(self.config.log);
        let search = GridSearch::new(adapter, parameters.clone(), self.config.search_config());

        info!(
            candidates = parameters.len(),
            folds = self.config.cross_validation,
            holdout = holdout.is_some(),
            "Tuning hyperparameters"
        );
        let result = search.fit(train, holdout)?;
        if tracing::enabled!(Level::DEBUG) {
            debug!(cv_results = %result.cv_results.to_json()?, "Cross-validation results");
        }

        let report = match holdout {
            Some(data) => {
                let y_pred = result.predict(data.x)?;
                let report = ClassificationReport::new(data.y, y_pred.view())?;
                Some(report.with_digits(self.config.report_digits))
            }
            None => None,
        };
        write_search_report(out, &result.cv_results, &result.best_params, report.as_ref())?;

        result.into_best_history()
    }
}
