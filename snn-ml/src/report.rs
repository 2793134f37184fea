//! Plain-text summary of a finished grid search.

use crate::error::MlError;
use crate::grid::ParamSet;
use crate::metrics::ClassificationReport;
use crate::search::CvResults;
use std::io::Write;

const RULE: &str = "------------------------------------------------------";

/// Write the search summary: best parameters, one score line per candidate in
/// grid order, and the holdout classification report when one is given.
///
/// Score lines show the mean test score and twice its standard deviation.
pub fn write_search_report<W: Write>(
    out: &mut W,
    cv_results: &CvResults,
    best_params: &ParamSet,
    holdout: Option<&ClassificationReport>,
) -> Result<(), MlError> {
    writeln!(out)?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Best parameters set found on development set:")?;
    writeln!(out, " {best_params}")?;
    writeln!(out)?;
    writeln!(out, "Grid scores on development set:")?;

    let rows = cv_results
        .mean_test_score
        .iter()
        .zip(&cv_results.std_test_score)
        .zip(&cv_results.params);
    for ((mean, std_dev), params) in rows {
        writeln!(out, " {mean:.6} (+/-{:.6}) for {params}", std_dev * 2.0)?;
    }
    writeln!(out)?;

    writeln!(out, "Detailed classification report:")?;
    writeln!(out, "- The model is trained on the full development set.")?;
    writeln!(out, "- The scores are computed on the full evaluation set.")?;
    writeln!(out)?;

    if let Some(report) = holdout {
        writeln!(out, "{report}")?;
    }

    writeln!(out, "{RULE}")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pretty_assertions::assert_eq;

    fn results() -> CvResults {
        CvResults {
            params: vec![
                ParamSet::new().with("epochs", 5).with("optimizer", "adam"),
                ParamSet::new().with("epochs", 10).with("optimizer", "adam"),
            ],
            split_test_scores: vec![vec![0.5, 1.0], vec![1.0, 1.0]],
            mean_test_score: vec![0.75, 1.0],
            std_test_score: vec![0.25, 0.0],
            rank_test_score: vec![2, 1],
            ..CvResults::default()
        }
    }

    fn render(holdout: Option<&ClassificationReport>) -> String {
        let results = results();
        let mut out = Vec::new();
        write_search_report(&mut out, &results, &results.params[1], holdout).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_report_without_holdout() {
        let expected = concat!(
            "\n",
            "------------------------------------------------------\n",
            "Best parameters set found on development set:\n",
            " {epochs: 10, optimizer: \"adam\"}\n",
            "\n",
            "Grid scores on development set:\n",
            " 0.750000 (+/-0.500000) for {epochs: 5, optimizer: \"adam\"}\n",
            " 1.000000 (+/-0.000000) for {epochs: 10, optimizer: \"adam\"}\n",
            "\n",
            "Detailed classification report:\n",
            "- The model is trained on the full development set.\n",
            "- The scores are computed on the full evaluation set.\n",
            "\n",
            "------------------------------------------------------\n",
            "\n",
        );
        assert_eq!(render(None), expected);
    }

    #[test]
    fn test_report_with_holdout() {
        let y_true = array![0usize, 1];
        let y_pred = array![0usize, 1];
        let report = ClassificationReport::new(y_true.view(), y_pred.view()).unwrap();
        let text = render(Some(&report));

        let tail = format!("{report}\n{RULE}\n\n");
        assert!(text.ends_with(&tail));
        assert!(text.contains("    accuracy                           1.00         2\n"));
    }
}
