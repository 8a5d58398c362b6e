use serde::Serialize;

use crate::error::{Error, Result};
use crate::region::Region;

/// Number of rows carrying each region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelDistribution {
    counts: [usize; Region::COUNT],
}

impl LabelDistribution {
    pub fn from_labels(labels: &[Region]) -> Self {
        let mut counts = [0; Region::COUNT];
        for label in labels {
            counts[label.index()] += 1;
        }
        LabelDistribution { counts }
    }

    pub fn count(&self, region: Region) -> usize {
        self.counts[region.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// The most frequent region, earliest region on ties. `None` when empty.
    pub fn most_frequent(&self) -> Option<Region> {
        let mut best: Option<(Region, usize)> = None;
        for region in Region::ALL {
            let count = self.count(region);
            if count > 0 && best.map_or(true, |(_, c)| count > c) {
                best = Some((region, count));
            }
        }
        best.map(|(region, _)| region)
    }

    /// `(region, count)` for every region in class order.
    pub fn iter(&self) -> impl Iterator<Item = (Region, usize)> + '_ {
        Region::ALL.iter().map(move |&region| (region, self.count(region)))
    }
}

fn check_lengths(predicted: &[Region], actual: &[Region]) -> Result<()> {
    if predicted.len() != actual.len() {
        return Err(Error::ShapeMismatch {
            what: "predicted labels",
            expected: actual.len(),
            found: predicted.len(),
        });
    }
    if actual.is_empty() {
        return Err(Error::InvalidParameter(
            "cannot score an empty label vector".to_string(),
        ));
    }
    Ok(())
}

/// Fraction of predictions equal to the actual label.
pub fn accuracy(predicted: &[Region], actual: &[Region]) -> Result<f64> {
    check_lengths(predicted, actual)?;
    let correct = predicted
        .iter()
        .zip(actual.iter())
        .filter(|(p, a)| p == a)
        .count();
    Ok(correct as f64 / actual.len() as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub region: Region,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    /// `confusion_matrix[actual][predicted]`
    pub confusion_matrix: [[usize; Region::COUNT]; Region::COUNT],
    pub class_metrics: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_f1: f64,
}

impl ClassificationReport {
    /// Scores predictions against actual labels.
    ///
    /// # Arguments
    /// * `predicted` - The predicted regions.
    /// * `actual` - The true regions, parallel to `predicted`.
    ///
    /// # Returns
    /// Returns the confusion matrix, per-region precision, recall and F1, the
    /// accuracy, and the macro F1 (unweighted mean of the four F1 scores).
    /// A ratio with a zero denominator is reported as 0.
    pub fn new(predicted: &[Region], actual: &[Region]) -> Result<Self> {
        check_lengths(predicted, actual)?;

        let mut confusion_matrix = [[0usize; Region::COUNT]; Region::COUNT];
        for (p, a) in predicted.iter().zip(actual.iter()) {
            confusion_matrix[a.index()][p.index()] += 1;
        }

        let class_metrics: Vec<ClassMetrics> = Region::ALL
            .iter()
            .map(|&region| {
                let c = region.index();
                let true_positives = confusion_matrix[c][c];
                let predicted_positives: usize = confusion_matrix.iter().map(|row| row[c]).sum();
                let support: usize = confusion_matrix[c].iter().sum();
                let precision = ratio(true_positives, predicted_positives);
                let recall = ratio(true_positives, support);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    region,
                    precision,
                    recall,
                    f1_score,
                    support,
                }
            })
            .collect();

        let correct: usize = (0..Region::COUNT).map(|c| confusion_matrix[c][c]).sum();
        let macro_f1 =
            class_metrics.iter().map(|m| m.f1_score).sum::<f64>() / class_metrics.len() as f64;

        Ok(ClassificationReport {
            confusion_matrix,
            class_metrics,
            accuracy: ratio(correct, actual.len()),
            macro_f1,
        })
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use Region::*;

    #[test]
    fn test_label_distribution() {
        let distribution = LabelDistribution::from_labels(&[West, South, West, Midwest]);
        assert_eq!(distribution.count(West), 2);
        assert_eq!(distribution.count(Northeast), 0);
        assert_eq!(distribution.total(), 4);
        assert_eq!(distribution.most_frequent(), Some(West));
        assert_eq!(LabelDistribution::default().most_frequent(), None);
    }

    #[test]
    fn test_most_frequent_tie_goes_to_earliest_region() {
        let distribution = LabelDistribution::from_labels(&[West, South, South, West]);
        assert_eq!(distribution.most_frequent(), Some(South));
    }

    #[test]
    fn test_accuracy() {
        let actual = [West, South, South, Midwest];
        let predicted = [West, South, West, West];
        assert!((accuracy(&predicted, &actual).unwrap() - 0.5).abs() < 1e-12);
        assert!(accuracy(&predicted[..2], &actual).is_err());
        assert!(accuracy(&[], &[]).is_err());
    }

    #[test]
    fn test_classification_report() {
        let actual = [West, West, South, South];
        let predicted = [West, South, South, South];
        let report = ClassificationReport::new(&predicted, &actual).unwrap();

        assert_eq!(report.confusion_matrix[West.index()][South.index()], 1);
        assert!((report.accuracy - 0.75).abs() < 1e-12);

        let west = &report.class_metrics[West.index()];
        assert!((west.precision - 1.0).abs() < 1e-12);
        assert!((west.recall - 0.5).abs() < 1e-12);
        assert!((west.f1_score - 2.0 / 3.0).abs() < 1e-12);

        let south = &report.class_metrics[South.index()];
        assert!((south.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((south.recall - 1.0).abs() < 1e-12);
        assert!((south.f1_score - 0.8).abs() < 1e-12);

        // Regions never seen nor predicted contribute an F1 of 0.
        assert_eq!(report.class_metrics[Midwest.index()].f1_score, 0.0);
        let expected_macro = (2.0 / 3.0 + 0.8) / 4.0;
        assert!((report.macro_f1 - expected_macro).abs() < 1e-12);
    }
}
