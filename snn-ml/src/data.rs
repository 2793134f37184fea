//! Borrowed feature/label views and small dataset helpers.

use crate::error::MlError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Features paired with their class labels, one row per sample.
#[derive(Debug, Clone, Copy)]
pub struct LabeledData<'a> {
    pub x: ArrayView2<'a, f64>,
    pub y: ArrayView1<'a, usize>,
}

impl<'a> LabeledData<'a> {
    /// Pair features with labels, checking they have the same number of rows.
    pub fn new(x: ArrayView2<'a, f64>, y: ArrayView1<'a, usize>) -> Result<Self, MlError> {
        check_consistent_length(x, y)?;
        Ok(Self { x, y })
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Copy out the rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> (Array2<f64>, Array1<usize>) {
        (
            self.x.select(Axis(0), indices),
            self.y.select(Axis(0), indices),
        )
    }
}

pub fn check_consistent_length(
    x: ArrayView2<'_, f64>,
    y: ArrayView1<'_, usize>,
) -> Result<(), MlError> {
    if x.nrows() != y.len() {
        return Err(MlError::ShapeMismatch {
            what: "labels",
            got: y.len(),
            expected: x.nrows(),
        });
    }
    Ok(())
}

/// Decode one-hot (or probability) rows into class indices by argmax.
///
/// Ties resolve to the lowest index.
pub fn labels_from_one_hot(y: ArrayView2<'_, f64>) -> Result<Array1<usize>, MlError> {
    if y.ncols() == 0 {
        return Err(MlError::invalid_input("one-hot labels have no columns"));
    }
    y.outer_iter()
        .enumerate()
        .map(|(row, values)| {
            argmax(values.iter().copied()).ok_or_else(|| {
                MlError::invalid_input(format!("row {row} of one-hot labels is not finite"))
            })
        })
        .collect()
}

/// Index of the largest finite value; `None` if there is none.
pub(crate) fn argmax(values: impl Iterator<Item = f64>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        if !v.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_labeled_data_checks_rows() {
        let x = array![[0.0, 1.0], [2.0, 3.0]];
        let y = array![0usize, 1, 1];
        let err = LabeledData::new(x.view(), y.view()).unwrap_err();
        assert!(matches!(
            err,
            MlError::ShapeMismatch {
                got: 3,
                expected: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_select_rows() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0usize, 0, 1, 1];
        let data = LabeledData::new(x.view(), y.view()).unwrap();

        let (xs, ys) = data.select(&[3, 1]);
        assert_eq!(xs, array![[3.0], [1.0]]);
        assert_eq!(ys, array![1usize, 0]);
    }

    #[test]
    fn test_labels_from_one_hot() {
        let y = array![[0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.1, 0.2, 0.7]];
        assert_eq!(labels_from_one_hot(y.view()).unwrap(), array![1usize, 0, 2]);

        let bad = array![[f64::NAN, f64::NAN]];
        assert!(labels_from_one_hot(bad.view()).is_err());
    }

    #[test]
    fn test_argmax_ties_pick_first() {
        assert_eq!(argmax([0.5, 0.5].into_iter()), Some(0));
        assert_eq!(argmax([f64::NAN, 0.1].into_iter()), Some(1));
        assert_eq!(argmax(std::iter::empty()), None);
    }
}
