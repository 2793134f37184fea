//! End-to-end tuning runs against a deterministic threshold classifier.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, array};
use pretty_assertions::assert_eq;

use snn_ml::config::load_grid;
use snn_ml::data::labels_from_one_hot;
use snn_ml::history::{ACCURACY, LOSS, VAL_ACCURACY, VAL_LOSS};
use snn_ml::{
    ClassifierAdapter, CvStrategy, FitOptions, GridSearch, History, LabeledData, MlError,
    ModelTuner, ParamGrid, ParamSet, Trainable, TunerConfig,
};

/// Predicts class 1 when feature 0 reaches `threshold`. Nothing is learned.
struct Threshold {
    threshold: f64,
}

impl Threshold {
    fn accuracy(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, usize>) -> f64 {
        let correct = x
            .column(0)
            .iter()
            .zip(y.iter())
            .filter(|(v, c)| usize::from(**v >= self.threshold) == **c)
            .count();
        correct as f64 / y.len() as f64
    }
}

impl Trainable for Threshold {
    fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, usize>,
        options: &FitOptions<'_>,
    ) -> Result<History, MlError> {
        let mut history = History::default();
        for _ in 0..options.epochs {
            let acc = self.accuracy(x, y);
            match options.validation {
                Some(val) => {
                    let val_acc = self.accuracy(val.x, val.y);
                    history.record_epoch([
                        (LOSS, 1.0 - acc),
                        (ACCURACY, acc),
                        (VAL_LOSS, 1.0 - val_acc),
                        (VAL_ACCURACY, val_acc),
                    ]);
                }
                None => history.record_epoch([(LOSS, 1.0 - acc), (ACCURACY, acc)]),
            }
        }
        Ok(history)
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, MlError> {
        let p = x.column(0).mapv(|v| if v >= self.threshold { 1.0 } else { 0.0 });
        let q = p.mapv(|v| 1.0 - v);
        Ok(ndarray::stack![Axis(1), q, p])
    }
}

fn build(params: &ParamSet) -> Result<Threshold, MlError> {
    Ok(Threshold {
        threshold: params.get_float("threshold")?,
    })
}

/// Twelve samples `0..12`; label 1 from 6 on.
fn dataset() -> (Array2<f64>, Array1<usize>) {
    let x = Array2::from_shape_fn((12, 1), |(i, _)| i as f64);
    let y = Array1::from_shape_fn(12, |i| usize::from(i >= 6));
    (x, y)
}

fn quiet_tuner() -> ModelTuner {
    ModelTuner::default().log(false)
}

fn run(tuner: &ModelTuner, grid: &ParamGrid) -> (Result<History, MlError>, String) {
    let (x, y) = dataset();
    let train = LabeledData::new(x.view(), y.view()).unwrap();
    let mut out = Vec::new();
    let result = tuner.tune_with_writer(build, grid, train, None, None, &mut out);
    (result, String::from_utf8(out).unwrap())
}

#[test]
fn test_report_matches_template() {
    let grid = ParamGrid::new().with("threshold", [3.0, 6.0, 9.0]);
    let (result, text) = run(&quiet_tuner(), &grid);
    result.unwrap();

    let expected = concat!(
        "\n",
        "------------------------------------------------------\n",
        "Best parameters set found on development set:\n",
        " {threshold: 6.0}\n",
        "\n",
        "Grid scores on development set:\n",
        " 0.750000 (+/-0.408248) for {threshold: 3.0}\n",
        " 1.000000 (+/-0.000000) for {threshold: 6.0}\n",
        " 0.750000 (+/-0.408248) for {threshold: 9.0}\n",
        "\n",
        "Detailed classification report:\n",
        "- The model is trained on the full development set.\n",
        "- The scores are computed on the full evaluation set.\n",
        "\n",
        "------------------------------------------------------\n",
        "\n",
    );
    assert_eq!(text, expected);
}

#[test]
fn test_returns_history_of_best_estimator() {
    let grid = ParamGrid::new()
        .with("threshold", [3.0, 6.0, 9.0])
        .with("epochs", [2]);
    let (result, _) = run(&quiet_tuner(), &grid);
    let history = result.unwrap();

    let (x, y) = dataset();
    let best = ParamSet::new().with("epochs", 2).with("threshold", 6.0);
    let refit = ClassifierAdapter::new(build)
        .fit(&best, x.view(), y.view(), None)
        .unwrap();

    assert_eq!(&history, refit.history());
    assert_eq!(history.params, best);
    assert_eq!(history.get(ACCURACY), Some(&[1.0, 1.0][..]));
    assert_eq!(history.best_loss, Some(0.0));
}

#[test]
fn test_search_result_exposes_cv_results() {
    let (x, y) = dataset();
    let train = LabeledData::new(x.view(), y.view()).unwrap();
    let grid = ParamGrid::new().with("threshold", [3.0, 6.0, 9.0]);
    let config = TunerConfig {
        log: false,
        ..TunerConfig::default()
    };

    let search = GridSearch::new(ClassifierAdapter::new(build), grid, config.search_config());
    let result = search.fit(train, None).unwrap();

    assert_eq!(result.n_splits, 3);
    assert_eq!(result.best_index, 1);
    assert_eq!(result.best_score, 1.0);
    assert_eq!(result.cv_results.rank_test_score, vec![2, 1, 2]);
    assert_eq!(result.cv_results.split_test_scores[0], vec![1.0, 0.75, 0.5]);
    assert_eq!(result.cv_results.split_test_scores[2], vec![0.5, 0.75, 1.0]);
    assert!(result.refit_time.is_some());
    assert_eq!(result.predict(x.view()).unwrap(), y);
}

#[test]
fn test_holdout_report_and_validation_metrics() {
    let (x, y) = dataset();
    let x_test = array![[2.0], [7.0], [5.0], [10.0]];
    let y_test = array![0usize, 1, 0, 1];
    let train = LabeledData::new(x.view(), y.view()).unwrap();
    let grid = ParamGrid::new().with("threshold", [3.0, 6.0]);

    let mut out = Vec::new();
    let history = quiet_tuner()
        .tune_with_writer(
            build,
            &grid,
            train,
            Some(x_test.view()),
            Some(y_test.view()),
            &mut out,
        )
        .unwrap();
    let text = String::from_utf8(out).unwrap();

    assert_eq!(history.get(VAL_ACCURACY), Some(&[1.0][..]));
    assert_eq!(history.best_epoch, Some(0));
    assert!(text.contains("              precision    recall  f1-score   support\n"));
    assert!(text.contains("    accuracy                           1.00         4\n"));
    assert!(text.ends_with("         4\n\n------------------------------------------------------\n\n"));
}

#[test]
fn test_build_errors_propagate() {
    let failing = |params: &ParamSet| -> Result<Threshold, MlError> {
        let threshold = params.get_float("threshold")?;
        if threshold > 8.0 {
            return Err(MlError::model("threshold out of range"));
        }
        Ok(Threshold { threshold })
    };

    let (x, y) = dataset();
    let train = LabeledData::new(x.view(), y.view()).unwrap();
    let grid = ParamGrid::new().with("threshold", [3.0, 9.0]);
    let mut out = Vec::new();
    let err = quiet_tuner()
        .tune_with_writer(failing, &grid, train, None, None, &mut out)
        .unwrap_err();

    assert!(matches!(err, MlError::Model(_)));
    assert!(out.is_empty());
}

#[test]
fn test_thread_count_does_not_change_results() {
    let grid = ParamGrid::new().with("threshold", [2.0, 4.0, 6.0, 8.0, 10.0]);
    let (serial, serial_text) = run(&quiet_tuner().n_jobs(Some(1)), &grid);
    let (parallel, parallel_text) = run(&quiet_tuner().n_jobs(None), &grid);

    assert_eq!(serial.unwrap(), parallel.unwrap());
    assert_eq!(serial_text, parallel_text);
}

#[test]
fn test_kfold_strategy_and_fold_count() {
    let config = TunerConfig {
        cv_strategy: CvStrategy::KFold,
        log: false,
        ..TunerConfig::default()
    };
    let grid = ParamGrid::new().with("threshold", [6.0]);
    let (result, text) = run(&ModelTuner::new(config).cross_validation(4), &grid);

    result.unwrap();
    assert!(text.contains(" 1.000000 (+/-0.000000) for {threshold: 6.0}\n"));

    let (result, _) = run(&quiet_tuner().cross_validation(13), &grid);
    assert!(matches!(result, Err(MlError::CrossValidation(_))));
}

#[test]
fn test_grid_from_toml_file() {
    snn_ml::logging::init_logging(false);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.toml");
    std::fs::write(&path, "[grid]\nthreshold = [9.0, 6.0]\nepochs = [1]\n").unwrap();
    let grid = load_grid(&path).unwrap();

    let (result, text) = run(&quiet_tuner(), &grid);
    let history = result.unwrap();
    assert_eq!(history.params.get_float("threshold").unwrap(), 6.0);
    assert!(text.contains(" {epochs: 1, threshold: 6.0}\n"));
}

#[test]
fn test_holdout_class_rarer_than_fold_count() {
    // Label 2 has one training row, so two of the three folds train without it.
    let x = Array2::from_shape_fn((7, 1), |(i, _)| i as f64);
    let y = array![0usize, 0, 0, 1, 1, 1, 2];
    let x_test = array![[0.0], [6.0]];
    let y_test = array![0usize, 2];
    let train = LabeledData::new(x.view(), y.view()).unwrap();
    let grid = ParamGrid::new().with("threshold", [3.0]);

    let mut out = Vec::new();
    let history = quiet_tuner()
        .tune_with_writer(
            build,
            &grid,
            train,
            Some(x_test.view()),
            Some(y_test.view()),
            &mut out,
        )
        .unwrap();

    assert_eq!(history.len(), 1);
    assert!(history.get(VAL_ACCURACY).is_some());
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains(" {threshold: 3.0}\n"));
    assert!(text.contains("           2       0.00      0.00      0.00         1\n"));
}

#[test]
fn test_one_hot_targets() {
    let (x, y) = dataset();
    let one_hot = Array2::from_shape_fn((12, 2), |(i, c)| if y[i] == c { 1.0 } else { 0.0 });
    let labels = labels_from_one_hot(one_hot.view()).unwrap();
    assert_eq!(labels, y);

    let train = LabeledData::new(x.view(), labels.view()).unwrap();
    let grid = ParamGrid::new().with("threshold", [3.0, 6.0]);
    let mut out = Vec::new();
    let history = quiet_tuner()
        .tune_with_writer(build, &grid, train, None, None, &mut out)
        .unwrap();
    assert_eq!(history.params.get_float("threshold").unwrap(), 6.0);
}
