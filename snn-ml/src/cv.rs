//! Cross-validation splitters.

use crate::error::MlError;
use ndarray::ArrayView1;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Train/test row indices of one fold. Both lists are sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Strategy for producing cross-validation folds.
pub trait CrossValidator: Send + Sync {
    fn n_splits(&self) -> usize;

    /// Produce `n_splits()` folds over the samples labelled by `y`.
    fn split(&self, y: ArrayView1<'_, usize>) -> Result<Vec<Split>, MlError>;
}

fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

fn check_n_splits(n_splits: usize, n_samples: usize) -> Result<(), MlError> {
    if n_splits < 2 {
        return Err(MlError::cross_validation(format!(
            "at least two folds are required, got {n_splits}"
        )));
    }
    if n_splits > n_samples {
        return Err(MlError::cross_validation(format!(
            "cannot have {n_splits} folds with only {n_samples} samples"
        )));
    }
    Ok(())
}

/// Build folds from a per-sample fold assignment.
fn splits_from_assignment(test_fold: &[usize], n_splits: usize) -> Vec<Split> {
    (0..n_splits)
        .map(|fold| {
            let (test, train): (Vec<usize>, Vec<usize>) =
                (0..test_fold.len()).partition(|&i| test_fold[i] == fold);
            Split { train, test }
        })
        .collect()
}

/// Plain k-fold: contiguous folds, the first `n % k` one sample larger.
#[derive(Debug, Clone)]
pub struct KFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            seed: None,
        }
    }

    pub fn shuffled(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }
}

impl CrossValidator for KFold {
    fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn split(&self, y: ArrayView1<'_, usize>) -> Result<Vec<Split>, MlError> {
        let n_samples = y.len();
        check_n_splits(self.n_splits, n_samples)?;

        let mut order: Vec<usize> = (0..n_samples).collect();
        if self.shuffle {
            order.shuffle(&mut rng_for(self.seed));
        }

        let base = n_samples / self.n_splits;
        let extra = n_samples % self.n_splits;
        let mut test_fold = vec![0; n_samples];
        let mut start = 0;
        for fold in 0..self.n_splits {
            let size = base + usize::from(fold < extra);
            for &sample in &order[start..start + size] {
                test_fold[sample] = fold;
            }
            start += size;
        }

        Ok(splits_from_assignment(&test_fold, self.n_splits))
    }
}

/// K-fold that keeps each class's proportion roughly equal across folds.
///
/// Classes are numbered by first appearance in `y`. Sorting those numbers and
/// taking every k-th one gives how many samples of each class land in each
/// fold; a class's samples then fill its folds in sample order.
#[derive(Debug, Clone)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub shuffle: bool,
    pub seed: Option<u64>,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle: false,
            seed: None,
        }
    }

    pub fn shuffled(mut self, seed: Option<u64>) -> Self {
        self.shuffle = true;
        self.seed = seed;
        self
    }
}

impl CrossValidator for StratifiedKFold {
    fn n_splits(&self) -> usize {
        self.n_splits
    }

    fn split(&self, y: ArrayView1<'_, usize>) -> Result<Vec<Split>, MlError> {
        let k = self.n_splits;
        check_n_splits(k, y.len())?;

        let mut class_of: HashMap<usize, usize> = HashMap::new();
        let encoded: Vec<usize> = y
            .iter()
            .map(|label| {
                let next = class_of.len();
                *class_of.entry(*label).or_insert(next)
            })
            .collect();
        let n_classes = class_of.len();

        let mut counts = vec![0usize; n_classes];
        for &c in &encoded {
            counts[c] += 1;
        }
        let min_count = counts.iter().copied().min().unwrap_or(0);
        if counts.iter().all(|&count| count < k) {
            return Err(MlError::cross_validation(format!(
                "n_splits={k} cannot be greater than the number of members in each class"
            )));
        }
        if min_count < k {
            tracing::warn!(
                least_populated = min_count,
                n_splits = k,
                "The least populated class has fewer members than n_splits"
            );
        }

        let mut sorted = encoded.clone();
        sorted.sort_unstable();
        let mut allocation = vec![vec![0usize; n_classes]; k];
        for (i, &c) in sorted.iter().enumerate() {
            allocation[i % k][c] += 1;
        }

        let mut rng = self.shuffle.then(|| rng_for(self.seed));
        let mut test_fold = vec![0usize; encoded.len()];
        for class in 0..n_classes {
            let mut folds_for_class: Vec<usize> = (0..k)
                .flat_map(|fold| std::iter::repeat_n(fold, allocation[fold][class]))
                .collect();
            if let Some(rng) = rng.as_mut() {
                folds_for_class.shuffle(rng);
            }
            let members = encoded.iter().enumerate().filter(|(_, c)| **c == class);
            for ((sample, _), fold) in members.zip(folds_for_class) {
                test_fold[sample] = fold;
            }
        }

        Ok(splits_from_assignment(&test_fold, k))
    }
}
