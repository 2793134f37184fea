//! Exhaustive, cross-validated grid search.

use crate::config::SearchConfig;
use crate::cv::Split;
use crate::data::LabeledData;
use crate::error::MlError;
use crate::estimator::{ClassifierAdapter, FittedClassifier, Trainable, class_labels};
use crate::grid::{ParamGrid, ParamSet};
use crate::history::History;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Per-candidate cross-validation results, indexed by candidate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CvResults {
    pub params: Vec<ParamSet>,
    /// `split_test_scores[candidate][fold]`.
    pub split_test_scores: Vec<Vec<f64>>,
    pub mean_test_score: Vec<f64>,
    pub std_test_score: Vec<f64>,
    /// 1 is best; tied means share the lowest rank.
    pub rank_test_score: Vec<usize>,
    pub mean_train_score: Option<Vec<f64>>,
    pub std_train_score: Option<Vec<f64>>,
    pub mean_fit_time: Vec<f64>,
    pub std_fit_time: Vec<f64>,
    pub mean_score_time: Vec<f64>,
    pub std_score_time: Vec<f64>,
}

impl CvResults {
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// First candidate holding rank 1.
    pub fn best_index(&self) -> Option<usize> {
        self.rank_test_score.iter().position(|&rank| rank == 1)
    }

    /// The full results table as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, MlError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Outcome of a grid search.
#[derive(Debug, Clone)]
pub struct SearchResult<M> {
    pub cv_results: CvResults,
    pub best_index: usize,
    pub best_params: ParamSet,
    pub best_score: f64,
    pub n_splits: usize,
    /// Seconds spent refitting the best candidate on the full training set.
    pub refit_time: Option<f64>,
    pub best_estimator: Option<FittedClassifier<M>>,
}

impl<M: Trainable> SearchResult<M> {
    pub fn best_estimator(&self) -> Result<&FittedClassifier<M>, MlError> {
        self.best_estimator
            .as_ref()
            .ok_or_else(|| MlError::not_fitted("the search ran without refitting the best candidate"))
    }

    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<usize>, MlError> {
        self.best_estimator()?.predict(x)
    }

    pub fn score(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, usize>) -> Result<f64, MlError> {
        self.best_estimator()?.score(x, y)
    }

    /// Training history of the refit best estimator.
    pub fn into_best_history(self) -> Result<History, MlError> {
        self.best_estimator
            .map(FittedClassifier::into_history)
            .ok_or_else(|| MlError::not_fitted("the search ran without refitting the best candidate"))
    }
}

/// Scores and timings of one (candidate, fold) fit.
#[derive(Debug, Clone, Copy)]
struct FitOutcome {
    test_score: f64,
    train_score: Option<f64>,
    fit_time: f64,
    score_time: f64,
}

struct FitTask<'a> {
    candidate: usize,
    fold: usize,
    params: &'a ParamSet,
    split: &'a Split,
}

/// Evaluates every grid candidate with cross-validation and refits the best.
pub struct GridSearch<F> {
    adapter: ClassifierAdapter<F>,
    grid: ParamGrid,
    config: SearchConfig,
}

impl<F, M> GridSearch<F>
where
    F: Fn(&ParamSet) -> Result<M, MlError> + Sync,
    M: Trainable,
{
    pub fn new(adapter: ClassifierAdapter<F>, grid: ParamGrid, config: SearchConfig) -> Self {
        Self {
            adapter,
            grid,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Run the search on `train`, passing `validation` through to every fit.
    ///
    /// The first failing fit aborts the search and its error is returned as is.
    pub fn fit(
        &self,
        train: LabeledData<'_>,
        validation: Option<LabeledData<'_>>,
    ) -> Result<SearchResult<M>, MlError> {
        let candidates = self.grid.candidates()?;
        if candidates.is_empty() {
            return Err(MlError::EmptyGrid(
                "no candidates to evaluate, the grid has no sub-grids".to_string(),
            ));
        }

        let splits = self.config.cv.splitter().split(train.y)?;
        // Every fit encodes labels against the full training set's classes.
        let classes = class_labels(train.y);
        let n_splits = splits.len();
        let total = candidates.len() * n_splits;
        let verbose = self.config.verbose;

        if verbose {
            info!(
                "Fitting {} folds for each of {} candidates, totalling {} fits",
                n_splits,
                candidates.len(),
                total
            );
        } else {
            debug!(n_splits, candidates = candidates.len(), total, "Starting grid search");
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.n_jobs.unwrap_or(0))
            .thread_name(|i| format!("snn-search-{i}"))
            .build()?;

        let outcomes = {
            let tasks: Vec<FitTask<'_>> = candidates
                .iter()
                .enumerate()
                .flat_map(|(candidate, params)| {
                    splits.iter().enumerate().map(move |(fold, split)| FitTask {
                        candidate,
                        fold,
                        params,
                        split,
                    })
                })
                .collect();

            pool.install(|| {
                tasks
                    .par_iter()
                    .map(|task| self.fit_and_score(task, n_splits, &classes, train, validation))
                    .collect::<Result<Vec<_>, MlError>>()
            })?
        };

        let cv_results = aggregate(candidates, &outcomes, n_splits, self.config.return_train_score);
        let best_index = cv_results
            .best_index()
            .ok_or_else(|| MlError::EmptyGrid("no candidate was ranked".to_string()))?;
        let best_params = cv_results.params[best_index].clone();
        let best_score = cv_results.mean_test_score[best_index];

        info!(best_index, best_score, params = %best_params, "Grid search finished");

        let (best_estimator, refit_time) = if self.config.refit {
            let started = Instant::now();
            let fitted = self.adapter.fit_with_classes(
                &best_params,
                train.x,
                train.y,
                validation,
                &classes,
            )?;
            let elapsed = started.elapsed().as_secs_f64();
            debug!(refit_secs = elapsed, "Refit best candidate on the full training set");
            (Some(fitted), Some(elapsed))
        } else {
            (None, None)
        };

        Ok(SearchResult {
            cv_results,
            best_index,
            best_params,
            best_score,
            n_splits,
            refit_time,
            best_estimator,
        })
    }

    fn fit_and_score(
        &self,
        task: &FitTask<'_>,
        n_splits: usize,
        classes: &[usize],
        train: LabeledData<'_>,
        validation: Option<LabeledData<'_>>,
    ) -> Result<FitOutcome, MlError> {
        let (x_train, y_train) = train.select(&task.split.train);
        let (x_test, y_test) = train.select(&task.split.test);

        let started = Instant::now();
        let fitted = self.adapter.fit_with_classes(
            task.params,
            x_train.view(),
            y_train.view(),
            validation,
            classes,
        )?;
        let fit_time = started.elapsed().as_secs_f64();

        let started = Instant::now();
        let test_score = fitted.score(x_test.view(), y_test.view())?;
        let train_score = if self.config.return_train_score {
            Some(fitted.score(x_train.view(), y_train.view())?)
        } else {
            None
        };
        let score_time = started.elapsed().as_secs_f64();

        let fold = task.fold + 1;
        let elapsed_ms = ((fit_time + score_time) * 1000.0) as u64;
        if self.config.verbose {
            info!(
                candidate = task.candidate,
                fold,
                n_splits,
                score = test_score,
                elapsed_ms,
                "[CV {fold}/{n_splits}] END {}",
                task.params
            );
        } else {
            debug!(
                candidate = task.candidate,
                fold,
                score = test_score,
                elapsed_ms,
                "Fold finished"
            );
        }

        Ok(FitOutcome {
            test_score,
            train_score,
            fit_time,
            score_time,
        })
    }
}

/// Population mean and standard deviation.
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Rank descending, ties sharing the lowest rank.
fn rank_min_descending(values: &[f64]) -> Vec<usize> {
    values
        .iter()
        .map(|v| 1 + values.iter().filter(|other| *other > v).count())
        .collect()
}

fn aggregate(
    params: Vec<ParamSet>,
    outcomes: &[FitOutcome],
    n_splits: usize,
    with_train_score: bool,
) -> CvResults {
    let mut results = CvResults::default();
    let mut mean_train = Vec::new();
    let mut std_train = Vec::new();

    for chunk in outcomes.chunks(n_splits) {
        let test: Vec<f64> = chunk.iter().map(|o| o.test_score).collect();
        let (mean, std) = mean_std(&test);
        results.mean_test_score.push(mean);
        results.std_test_score.push(std);
        results.split_test_scores.push(test);

        let fit: Vec<f64> = chunk.iter().map(|o| o.fit_time).collect();
        let (mean, std) = mean_std(&fit);
        results.mean_fit_time.push(mean);
        results.std_fit_time.push(std);

        let score: Vec<f64> = chunk.iter().map(|o| o.score_time).collect();
        let (mean, std) = mean_std(&score);
        results.mean_score_time.push(mean);
        results.std_score_time.push(std);

        if with_train_score {
            let train: Vec<f64> = chunk.iter().filter_map(|o| o.train_score).collect();
            let (mean, std) = mean_std(&train);
            mean_train.push(mean);
            std_train.push(std);
        }
    }

    results.rank_test_score = rank_min_descending(&results.mean_test_score);
    if with_train_score {
        results.mean_train_score = Some(mean_train);
        results.std_train_score = Some(std_train);
    }
    results.params = params;
    results
}
