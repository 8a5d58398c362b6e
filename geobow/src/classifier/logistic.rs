use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info};
use ndarray::prelude::*;

use super::{argmax, check_training_data, check_width, Classifier};
use crate::error::{Error, Result};
use crate::matrix::SparseMatrix;
use crate::region::Region;

#[derive(Debug, Clone)]
pub struct LogisticRegressionOptions {
    /// The maximum number of full passes over the training data.
    pub num_iterations: usize,
    pub learning_rate: f64,
    /// L2 penalty on the weights (not the biases).
    pub l2_regularization: f64,
    /// Training stops once the loss changes by less than this between iterations.
    pub tolerance: f64,
}

impl Default for LogisticRegressionOptions {
    fn default() -> Self {
        LogisticRegressionOptions {
            num_iterations: 200,
            learning_rate: 0.5,
            l2_regularization: 1e-4,
            tolerance: 1e-6,
        }
    }
}

/// Multinomial logistic regression trained by full-batch gradient descent.
///
/// Counts are fed through `ln(1 + x)` before the linear layer so that a few
/// very frequent terms do not dominate the gradient.
#[derive(Debug)]
pub struct LogisticRegression {
    pub options: LogisticRegressionOptions,
    // (n_features, n_classes)
    weights: Option<Array2<f64>>,
    // (n_classes)
    biases: Option<Array1<f64>>,
    losses: Vec<f64>,
}

impl LogisticRegression {
    pub fn new(options: LogisticRegressionOptions) -> Self {
        LogisticRegression {
            options,
            weights: None,
            biases: None,
            losses: vec![],
        }
    }

    /// Training loss after each completed iteration of the last fit.
    pub fn losses(&self) -> &[f64] {
        &self.losses
    }

    fn logits(
        weights: &Array2<f64>,
        biases: &Array1<f64>,
        matrix: &SparseMatrix,
        i: usize,
    ) -> Array1<f64> {
        let mut logits = biases.clone();
        for (j, count) in matrix.row(i) {
            let x = (count as f64).ln_1p();
            logits.scaled_add(x, &weights.row(j));
        }
        logits
    }
}

/// Softmax in place, shifted by the maximum for stability.
fn softmax(logits: &mut Array1<f64>) {
    let max = logits.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    logits.mapv_inplace(|v| (v - max).exp());
    let sum = logits.sum();
    *logits /= sum;
}

impl Classifier for LogisticRegression {
    fn name(&self) -> &str {
        "logistic-regression"
    }

    fn fit(
        &mut self,
        matrix: &SparseMatrix,
        labels: &[Region],
        running: Arc<AtomicBool>,
    ) -> Result<()> {
        check_training_data(matrix, labels)?;
        if self.options.learning_rate.is_nan() || self.options.learning_rate <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "learning rate must be positive, got {}",
                self.options.learning_rate
            )));
        }

        let n_features = matrix.n_cols();
        let n_rows = labels.len() as f64;
        let l2 = self.options.l2_regularization;
        let mut weights = Array2::<f64>::zeros((n_features, Region::COUNT));
        let mut biases = Array1::<f64>::zeros(Region::COUNT);
        self.losses.clear();

        for t in 0..self.options.num_iterations {
            if !running.load(Ordering::SeqCst) {
                info!("{} stopped after {} iterations", self.name(), t);
                break;
            }

            let mut weight_gradient = Array2::<f64>::zeros((n_features, Region::COUNT));
            let mut bias_gradient = Array1::<f64>::zeros(Region::COUNT);
            let mut loss = 0.0;

            for (i, label) in labels.iter().enumerate() {
                let mut probabilities = Self::logits(&weights, &biases, matrix, i);
                softmax(&mut probabilities);

                let c = label.index();
                loss -= probabilities[c].max(1e-15).ln();

                // probabilities minus the one-hot label
                probabilities[c] -= 1.0;
                bias_gradient += &probabilities;
                for (j, count) in matrix.row(i) {
                    let x = (count as f64).ln_1p();
                    weight_gradient.row_mut(j).scaled_add(x, &probabilities);
                }
            }

            loss = loss / n_rows + 0.5 * l2 * weights.mapv(|w| w * w).sum();
            weight_gradient /= n_rows;
            weight_gradient.scaled_add(l2, &weights);
            bias_gradient /= n_rows;

            weights.scaled_add(-self.options.learning_rate, &weight_gradient);
            biases.scaled_add(-self.options.learning_rate, &bias_gradient);

            debug!("{} iteration {} - loss: {}", self.name(), t, loss);
            let previous = self.losses.last().copied();
            self.losses.push(loss);
            if let Some(previous) = previous {
                if (previous - loss).abs() < self.options.tolerance {
                    info!("{} converged after {} iterations", self.name(), t + 1);
                    break;
                }
            }
        }

        self.weights = Some(weights);
        self.biases = Some(biases);
        Ok(())
    }

    fn predict(&self, matrix: &SparseMatrix) -> Result<Vec<Region>> {
        let (weights, biases) = match (&self.weights, &self.biases) {
            (Some(weights), Some(biases)) => (weights, biases),
            _ => return Err(Error::NotFitted(self.name().to_string())),
        };
        check_width(self.name(), weights.nrows(), matrix)?;

        let predictions = (0..matrix.n_rows())
            .map(|i| {
                let logits = Self::logits(weights, biases, matrix, i);
                Region::ALL[argmax(&logits.to_vec())]
            })
            .collect();
        Ok(predictions)
    }
}
