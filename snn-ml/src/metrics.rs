//! Classification metrics: accuracy and the per-class text report.

use crate::error::MlError;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Fraction of predictions equal to the true label.
pub fn accuracy(y_true: ArrayView1<'_, usize>, y_pred: ArrayView1<'_, usize>) -> Result<f64, MlError> {
    check_pair(y_true, y_pred)?;
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(t, p)| t == p)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

fn check_pair(y_true: ArrayView1<'_, usize>, y_pred: ArrayView1<'_, usize>) -> Result<(), MlError> {
    if y_true.len() != y_pred.len() {
        return Err(MlError::ShapeMismatch {
            what: "predictions",
            got: y_pred.len(),
            expected: y_true.len(),
        });
    }
    if y_true.is_empty() {
        return Err(MlError::invalid_input("cannot score an empty label set"));
    }
    Ok(())
}

/// Precision, recall and F1 for one label (or one average row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class precision/recall/F1 with accuracy, macro and weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: BTreeMap<usize, ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
    pub digits: usize,
}

impl ClassificationReport {
    /// Build the report over the sorted union of labels seen in either input.
    ///
    /// Zero divisions score 0.0.
    pub fn new(y_true: ArrayView1<'_, usize>, y_pred: ArrayView1<'_, usize>) -> Result<Self, MlError> {
        check_pair(y_true, y_pred)?;

        let labels: BTreeSet<usize> = y_true.iter().chain(y_pred.iter()).copied().collect();
        let mut classes = BTreeMap::new();
        let mut zero_division = false;

        for &label in &labels {
            let mut tp = 0usize;
            let mut predicted = 0usize;
            let mut support = 0usize;
            for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
                if p == label {
                    predicted += 1;
                }
                if t == label {
                    support += 1;
                    if p == label {
                        tp += 1;
                    }
                }
            }

            zero_division |= predicted == 0 || support == 0;
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1_score = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            classes.insert(
                label,
                ClassMetrics {
                    precision,
                    recall,
                    f1_score,
                    support,
                },
            );
        }

        if zero_division {
            tracing::warn!("Precision or recall is ill-defined for some labels, scored as 0.0");
        }

        let total = y_true.len();
        let n = classes.len() as f64;
        let macro_avg = ClassMetrics {
            precision: classes.values().map(|m| m.precision).sum::<f64>() / n,
            recall: classes.values().map(|m| m.recall).sum::<f64>() / n,
            f1_score: classes.values().map(|m| m.f1_score).sum::<f64>() / n,
            support: total,
        };
        let weighted_avg = ClassMetrics {
            precision: weighted_mean(&classes, |m| m.precision),
            recall: weighted_mean(&classes, |m| m.recall),
            f1_score: weighted_mean(&classes, |m| m.f1_score),
            support: total,
        };

        Ok(Self {
            accuracy: accuracy(y_true, y_pred)?,
            classes,
            macro_avg,
            weighted_avg,
            digits: 2,
        })
    }

    /// Number of decimals shown when rendering.
    pub fn with_digits(mut self, digits: usize) -> Self {
        self.digits = digits;
        self
    }
}

fn weighted_mean(
    classes: &BTreeMap<usize, ClassMetrics>,
    metric: impl Fn(&ClassMetrics) -> f64,
) -> f64 {
    let total: usize = classes.values().map(|m| m.support).sum();
    if total == 0 {
        return 0.0;
    }
    classes
        .values()
        .map(|m| metric(m) * m.support as f64)
        .sum::<f64>()
        / total as f64
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

const HEADERS: [&str; 4] = ["precision", "recall", "f1-score", "support"];
const WEIGHTED_AVG: &str = "weighted avg";

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.digits;
        let name_width = self
            .classes
            .keys()
            .map(|label| label.to_string().len())
            .max()
            .unwrap_or(0);
        let width = name_width.max(WEIGHTED_AVG.len()).max(digits);

        write!(f, "{:>width$} ", "")?;
        for header in HEADERS {
            write!(f, " {header:>9}")?;
        }
        writeln!(f)?;
        writeln!(f)?;

        for (label, metrics) in &self.classes {
            write_row(f, width, digits, &label.to_string(), metrics)?;
        }
        writeln!(f)?;

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.digits$} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        write_row(f, width, digits, "macro avg", &self.macro_avg)?;
        write_row(f, width, digits, WEIGHTED_AVG, &self.weighted_avg)
    }
}

fn write_row(
    f: &mut fmt::Formatter<'_>,
    width: usize,
    digits: usize,
    name: &str,
    m: &ClassMetrics,
) -> fmt::Result {
    writeln!(
        f,
        "{name:>width$}  {:>9.digits$} {:>9.digits$} {:>9.digits$} {:>9}",
        m.precision, m.recall, m.f1_score, m.support
    )
}
