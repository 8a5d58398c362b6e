use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use ndarray::prelude::*;

use super::{argmax, check_training_data, check_width, Classifier};
use crate::error::{Error, Result};
use crate::matrix::SparseMatrix;
use crate::region::Region;

/// Multinomial Naive Bayes over term counts with additive smoothing.
#[derive(Debug)]
pub struct NaiveBayes {
    pub alpha: f64,
    // (n_classes)
    class_log_prior: Option<Array1<f64>>,
    // (n_classes, n_features)
    feature_log_prob: Option<Array2<f64>>,
}

impl NaiveBayes {
    pub fn new(alpha: f64) -> Self {
        NaiveBayes {
            alpha,
            class_log_prior: None,
            feature_log_prob: None,
        }
    }
}

impl Classifier for NaiveBayes {
    fn name(&self) -> &str {
        "naive-bayes"
    }

    fn fit(
        &mut self,
        matrix: &SparseMatrix,
        labels: &[Region],
        _running: Arc<AtomicBool>,
    ) -> Result<()> {
        check_training_data(matrix, labels)?;
        if self.alpha.is_nan() || self.alpha <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "naive bayes smoothing must be positive, got {}",
                self.alpha
            )));
        }

        let n_features = matrix.n_cols();
        let mut class_rows = Array1::<f64>::zeros(Region::COUNT);
        let mut feature_counts = Array2::<f64>::zeros((Region::COUNT, n_features));
        for (i, label) in labels.iter().enumerate() {
            let c = label.index();
            class_rows[c] += 1.0;
            for (j, count) in matrix.row(i) {
                feature_counts[(c, j)] += count as f64;
            }
        }

        let n_rows = labels.len() as f64;
        // Regions absent from training get a log prior of -inf and are never predicted.
        let class_log_prior = class_rows.mapv(|rows| (rows / n_rows).ln());

        let smoothed = feature_counts + self.alpha;
        let totals = smoothed.sum_axis(Axis(1));
        let mut feature_log_prob = smoothed.mapv(f64::ln);
        for (mut row, total) in feature_log_prob.rows_mut().into_iter().zip(totals.iter()) {
            row -= total.ln();
        }

        self.class_log_prior = Some(class_log_prior);
        self.feature_log_prob = Some(feature_log_prob);
        Ok(())
    }

    fn predict(&self, matrix: &SparseMatrix) -> Result<Vec<Region>> {
        let (class_log_prior, feature_log_prob) =
            match (&self.class_log_prior, &self.feature_log_prob) {
                (Some(prior), Some(prob)) => (prior, prob),
                _ => return Err(Error::NotFitted(self.name().to_string())),
            };
        check_width(self.name(), feature_log_prob.ncols(), matrix)?;

        let predictions = (0..matrix.n_rows())
            .map(|i| {
                let mut scores = class_log_prior.to_vec();
                for (j, count) in matrix.row(i) {
                    for (c, score) in scores.iter_mut().enumerate() {
                        *score += count as f64 * feature_log_prob[(c, j)];
                    }
                }
                Region::ALL[argmax(&scores)]
            })
            .collect();
        Ok(predictions)
    }
}
