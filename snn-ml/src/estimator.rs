//! Trainable models and the classifier adapter that drives them.
//!
//! A build function turns a [`ParamSet`] into a [`Trainable`] model. The
//! [`ClassifierAdapter`] splits each candidate's parameters into build
//! arguments and fit options, encodes labels, and hands back a
//! [`FittedClassifier`] that predicts in the caller's label space.

use crate::data::{LabeledData, argmax, check_consistent_length};
use crate::error::MlError;
use crate::grid::ParamSet;
use crate::history::History;
use crate::metrics;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::collections::BTreeMap;

/// Parameter names consumed by `fit` rather than the build function.
pub const FIT_PARAMS: [&str; 2] = ["epochs", "batch_size"];

/// Options for a single call to [`Trainable::fit`].
#[derive(Debug, Clone, Copy)]
pub struct FitOptions<'a> {
    pub epochs: usize,
    pub batch_size: Option<usize>,
    pub verbose: bool,
    /// Validation rows, labels already encoded like the training labels.
    pub validation: Option<LabeledData<'a>>,
}

impl Default for FitOptions<'_> {
    fn default() -> Self {
        Self {
            epochs: 1,
            batch_size: None,
            verbose: false,
            validation: None,
        }
    }
}

/// A model that can be trained and queried for class probabilities.
pub trait Trainable: Send {
    /// Train on `x` with encoded labels `y` in `0..n_classes`.
    fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, usize>,
        options: &FitOptions<'_>,
    ) -> Result<History, MlError>;

    /// One row per sample, one column per encoded class.
    ///
    /// A single column is read as the probability of class 1.
    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, MlError>;
}

impl<T: Trainable + ?Sized> Trainable for Box<T> {
    fn fit(
        &mut self,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, usize>,
        options: &FitOptions<'_>,
    ) -> Result<History, MlError> {
        (**self).fit(x, y, options)
    }

    fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, MlError> {
        (**self).predict_proba(x)
    }
}

/// Wraps a build function so grid candidates can be fitted as classifiers.
pub struct ClassifierAdapter<F> {
    build_fn: F,
    verbose: bool,
    epochs: usize,
    batch_size: Option<usize>,
}

impl<F, M> ClassifierAdapter<F>
where
    F: Fn(&ParamSet) -> Result<M, MlError> + Sync,
    M: Trainable,
{
    pub fn new(build_fn: F) -> Self {
        Self {
            build_fn,
            verbose: false,
            epochs: 1,
            batch_size: None,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Epochs used when a candidate does not set `epochs`.
    pub fn default_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Batch size used when a candidate does not set `batch_size`.
    pub fn default_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Build a model from `params` and fit it on `(x, y)`.
    ///
    /// Classes are the sorted distinct labels of `y`.
    pub fn fit(
        &self,
        params: &ParamSet,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, usize>,
        validation: Option<LabeledData<'_>>,
    ) -> Result<FittedClassifier<M>, MlError> {
        self.fit_with_classes(params, x, y, validation, &class_labels(y))
    }

    /// Like [`Self::fit`], encoding training and validation labels against a
    /// fixed class list.
    ///
    /// Cross-validation passes the classes of the full training set so a fold
    /// missing a rare class still accepts validation rows of that class.
    pub fn fit_with_classes(
        &self,
        params: &ParamSet,
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, usize>,
        validation: Option<LabeledData<'_>>,
        classes: &[usize],
    ) -> Result<FittedClassifier<M>, MlError> {
        check_consistent_length(x, y)?;
        if y.is_empty() {
            return Err(MlError::invalid_input("cannot fit on an empty training set"));
        }

        let encoder = LabelEncoder::new(classes);
        let y_encoded = encoder.transform(y)?;
        let validation_encoded = validation
            .map(|data| Ok::<_, MlError>((data.x, encoder.transform(data.y)?)))
            .transpose()?;

        let (build_params, mut options) = self.route_params(params)?;
        options.validation = match &validation_encoded {
            Some((vx, vy)) => Some(LabeledData::new(*vx, vy.view())?),
            None => None,
        };

        let mut model = (self.build_fn)(&build_params)?;
        let mut history = model.fit(x, y_encoded.view(), &options)?;
        history.params = params.clone();

        Ok(FittedClassifier {
            model,
            classes: encoder.classes,
            history,
        })
    }

    fn route_params<'a>(&self, params: &ParamSet) -> Result<(ParamSet, FitOptions<'a>), MlError> {
        let mut build_params = params.clone();
        for name in FIT_PARAMS {
            build_params.remove(name);
        }

        let epochs = params.int_or("epochs", self.epochs as i64)?;
        let epochs = usize::try_from(epochs)
            .map_err(|_| MlError::invalid_parameter(format!("epochs must be >= 0, got {epochs}")))?;
        let batch_size = match params.get("batch_size") {
            Some(_) => {
                let size = params.get_int("batch_size")?;
                let size = usize::try_from(size).ok().filter(|&s| s > 0).ok_or_else(|| {
                    MlError::invalid_parameter(format!("batch_size must be positive, got {size}"))
                })?;
                Some(size)
            }
            None => self.batch_size,
        };

        let options = FitOptions {
            epochs,
            batch_size,
            verbose: self.verbose,
            validation: None,
        };
        Ok((build_params, options))
    }
}

/// Sorted distinct labels of `y`.
pub fn class_labels(y: ArrayView1<'_, usize>) -> Vec<usize> {
    let mut classes = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    classes
}

/// Maps labels onto `0..n_classes` by their position in a sorted class list.
struct LabelEncoder {
    classes: Vec<usize>,
    index: BTreeMap<usize, usize>,
}

impl LabelEncoder {
    fn new(classes: &[usize]) -> Self {
        let mut classes = classes.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let index = classes.iter().enumerate().map(|(i, &c)| (c, i)).collect();
        Self { classes, index }
    }

    fn transform(&self, y: ArrayView1<'_, usize>) -> Result<Array1<usize>, MlError> {
        y.iter()
            .map(|label| {
                self.index.get(label).copied().ok_or_else(|| {
                    MlError::invalid_input(format!("label {label} was not seen during training"))
                })
            })
            .collect()
    }
}

/// A model fitted through a [`ClassifierAdapter`].
#[derive(Debug, Clone)]
pub struct FittedClassifier<M> {
    model: M,
    classes: Vec<usize>,
    history: History,
}

impl<M: Trainable> FittedClassifier<M> {
    /// Assemble a fitted classifier from its parts.
    pub fn from_parts(model: M, classes: Vec<usize>, history: History) -> Self {
        Self {
            model,
            classes,
            history,
        }
    }

    /// Original labels, sorted; column `i` of the probabilities is `classes[i]`.
    pub fn classes(&self) -> &[usize] {
        &self.classes
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_history(self) -> History {
        self.history
    }

    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>, MlError> {
        let proba = self.model.predict_proba(x)?;
        if proba.nrows() != x.nrows() {
            return Err(MlError::ShapeMismatch {
                what: "probabilities",
                got: proba.nrows(),
                expected: x.nrows(),
            });
        }
        Ok(proba)
    }

    /// Predicted labels in the original label space.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<usize>, MlError> {
        let proba = self.predict_proba(x)?;
        proba
            .outer_iter()
            .enumerate()
            .map(|(row, p)| {
                let index = if p.len() == 1 {
                    usize::from(p[0] > 0.5)
                } else {
                    argmax(p.iter().copied()).ok_or_else(|| {
                        MlError::model(format!("row {row} has no finite class probability"))
                    })?
                };
                self.classes.get(index).copied().ok_or_else(|| {
                    MlError::model(format!(
                        "class index {index} out of range for {} classes",
                        self.classes.len()
                    ))
                })
            })
            .collect()
    }

    /// Mean accuracy on `(x, y)`.
    pub fn score(&self, x: ArrayView2<'_, f64>, y: ArrayView1<'_, usize>) -> Result<f64, MlError> {
        check_consistent_length(x, y)?;
        let y_pred = self.predict(x)?;
        metrics::accuracy(y, y_pred.view())
    }
}
