//! Per-epoch training history returned by a fit.

use crate::error::MlError;
use crate::grid::ParamSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const LOSS: &str = "loss";
pub const ACCURACY: &str = "accuracy";
pub const VAL_LOSS: &str = "val_loss";
pub const VAL_ACCURACY: &str = "val_accuracy";

/// Training history of one fitted model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    /// Epoch numbers, starting at zero.
    pub epoch: Vec<usize>,
    /// Metric name to one value per recorded epoch.
    pub metrics: BTreeMap<String, Vec<f64>>,
    /// Parameters the fit ran with.
    pub params: ParamSet,
    pub best_epoch: Option<usize>,
    pub best_loss: Option<f64>,
}

impl History {
    pub fn new(params: ParamSet) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    /// Record the metrics of one finished epoch.
    ///
    /// Best-epoch tracking follows `val_loss` when present, `loss` otherwise.
    pub fn record_epoch<'a, I>(&mut self, metrics: I)
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let epoch = self.epoch.len();
        self.epoch.push(epoch);

        for (name, value) in metrics {
            self.metrics.entry(name.to_string()).or_default().push(value);
        }

        let check_loss = self.last(VAL_LOSS).or_else(|| self.last(LOSS));
        if let Some(loss) = check_loss {
            if self.best_loss.is_none_or(|best| loss < best) {
                self.best_loss = Some(loss);
                self.best_epoch = Some(epoch);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.metrics.get(name).map(Vec::as_slice)
    }

    /// Value of `name` at the last epoch it was recorded.
    pub fn last(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).and_then(|values| values.last().copied())
    }

    /// Number of recorded epochs.
    pub fn len(&self) -> usize {
        self.epoch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epoch.is_empty()
    }

    pub fn to_json(&self) -> Result<String, MlError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, MlError> {
        Ok(serde_json::from_str(json)?)
    }
}
