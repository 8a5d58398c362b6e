use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::{check_training_data, Classifier};
use crate::error::{Error, Result};
use crate::matrix::SparseMatrix;
use crate::metrics::LabelDistribution;
use crate::region::Region;

/// Baseline that ignores the features and always predicts the most
/// frequent training region.
#[derive(Debug, Default)]
pub struct MajorityClass {
    label: Option<Region>,
}

impl MajorityClass {
    pub fn new() -> Self {
        MajorityClass { label: None }
    }
}

impl Classifier for MajorityClass {
    fn name(&self) -> &str {
        "majority"
    }

    fn fit(
        &mut self,
        matrix: &SparseMatrix,
        labels: &[Region],
        _running: Arc<AtomicBool>,
    ) -> Result<()> {
        check_training_data(matrix, labels)?;
        self.label = LabelDistribution::from_labels(labels).most_frequent();
        Ok(())
    }

    fn predict(&self, matrix: &SparseMatrix) -> Result<Vec<Region>> {
        let label = self
            .label
            .ok_or_else(|| Error::NotFitted(self.name().to_string()))?;
        Ok(vec![label; matrix.n_rows()])
    }
}
