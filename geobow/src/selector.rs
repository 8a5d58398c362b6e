use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::matrix::SparseMatrix;
use crate::region::Region;

/// Computes the chi-squared statistic between every column and the label.
///
/// For column `j` and region `c`, the observed value is the sum of the
/// column's counts over rows labelled `c`, and the expected value is the
/// column total times the fraction of rows labelled `c`. Regions with no
/// rows are left out. A column without any count has no defined score and
/// yields `None`.
///
/// # Arguments
/// * `matrix` - The count matrix.
/// * `labels` - One region per matrix row.
///
/// # Returns
/// Returns one score per column, or a shape-mismatch error if the label
/// vector does not have one entry per row.
pub fn chi2(matrix: &SparseMatrix, labels: &[Region]) -> Result<Vec<Option<f64>>> {
    if labels.len() != matrix.n_rows() {
        return Err(Error::ShapeMismatch {
            what: "label vector",
            expected: matrix.n_rows(),
            found: labels.len(),
        });
    }

    let n_cols = matrix.n_cols();
    let mut class_rows = [0usize; Region::COUNT];
    let mut observed = vec![[0f64; Region::COUNT]; n_cols];
    for (i, label) in labels.iter().enumerate() {
        let c = label.index();
        class_rows[c] += 1;
        for (j, count) in matrix.row(i) {
            observed[j][c] += count as f64;
        }
    }

    let n_rows = labels.len() as f64;
    let class_frequencies: Vec<(usize, f64)> = class_rows
        .iter()
        .enumerate()
        .filter(|&(_, &rows)| rows > 0)
        .map(|(c, &rows)| (c, rows as f64 / n_rows))
        .collect();

    let totals = matrix.column_sums();
    let scores = observed
        .iter()
        .zip(totals)
        .map(|(per_class, total)| {
            if total == 0 {
                return None;
            }
            let total = total as f64;
            let score = class_frequencies
                .iter()
                .map(|&(c, frequency)| {
                    let expected = frequency * total;
                    let diff = per_class[c] - expected;
                    diff * diff / expected
                })
                .sum::<f64>();
            Some(score)
        })
        .collect();

    Ok(scores)
}

/// Higher scores first, undefined scores last, then lower column first.
fn rank_order(a: (usize, Option<f64>), b: (usize, Option<f64>)) -> Ordering {
    let by_score = match (a.1, b.1) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_score.then(a.0.cmp(&b.0))
}

/// Chooses the `k` columns most dependent on the label.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSelector {
    pub k: usize,
}

impl FeatureSelector {
    pub fn new(k: usize) -> Self {
        FeatureSelector { k }
    }

    /// Scores every column of the training matrix and keeps the best `k`.
    ///
    /// # Arguments
    /// * `matrix` - The training count matrix.
    /// * `labels` - The training labels, one per row.
    ///
    /// # Returns
    /// Returns the selected features. Ties in score are broken by the lower
    /// column index, so the result is deterministic.
    ///
    /// # Errors
    /// Returns an invalid-parameter error when `k` is zero or larger than the
    /// number of columns, and a shape-mismatch error when the label count
    /// differs from the row count.
    pub fn fit(&self, matrix: &SparseMatrix, labels: &[Region]) -> Result<SelectedFeatures> {
        let n_columns = matrix.n_cols();
        if self.k == 0 || self.k > n_columns {
            return Err(Error::InvalidParameter(format!(
                "k must be between 1 and the vocabulary size {}, got {}",
                n_columns, self.k
            )));
        }

        let scores = chi2(matrix, labels)?;

        let mut ranked: Vec<usize> = (0..n_columns).collect();
        ranked.sort_by(|&a, &b| rank_order((a, scores[a]), (b, scores[b])));
        ranked.truncate(self.k);

        let mut columns = ranked.clone();
        columns.sort_unstable();
        let selected_scores = columns.iter().map(|&j| scores[j]).collect();

        info!(
            "selected {} of {} features by chi-squared score",
            self.k, n_columns
        );

        Ok(SelectedFeatures {
            n_columns,
            columns,
            scores: selected_scores,
            ranked,
        })
    }
}

/// The columns kept by a fitted [`FeatureSelector`].
///
/// Columns are held in vocabulary order, so projecting with every column
/// selected reproduces the input matrix. The same value projects the
/// training, development, and test matrices, which keeps column `j` bound
/// to the same term in all three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedFeatures {
    n_columns: usize,
    columns: Vec<usize>,
    scores: Vec<Option<f64>>,
    ranked: Vec<usize>,
}

impl SelectedFeatures {
    /// Number of selected columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Width of the matrices this selection applies to.
    pub fn n_columns(&self) -> usize {
        self.n_columns
    }

    /// Selected source columns in vocabulary order.
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    /// Scores of [`Self::columns`], in the same order.
    pub fn scores(&self) -> &[Option<f64>] {
        &self.scores
    }

    /// Selected source columns from the highest score down.
    pub fn ranked(&self) -> &[usize] {
        &self.ranked
    }

    /// Projects a matrix onto the selected columns.
    ///
    /// # Arguments
    /// * `matrix` - A matrix built against the same vocabulary as the training matrix.
    ///
    /// # Returns
    /// Returns a matrix with the same rows and `self.len()` columns.
    ///
    /// # Errors
    /// Returns a shape-mismatch error if the matrix width is not the width
    /// the selection was fitted on.
    pub fn transform(&self, matrix: &SparseMatrix) -> Result<SparseMatrix> {
        if matrix.n_cols() != self.n_columns {
            return Err(Error::ShapeMismatch {
                what: "matrix columns",
                expected: self.n_columns,
                found: matrix.n_cols(),
            });
        }
        matrix.select_columns(&self.columns)
    }

    /// Saves the selection as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Loads a selection saved by [`Self::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let selected: SelectedFeatures = serde_json::from_reader(BufReader::new(file))?;
        if selected.columns.iter().any(|&j| j >= selected.n_columns)
            || selected.columns.len() != selected.scores.len()
        {
            return Err(Error::InvalidParameter(format!(
                "selected features in {} are inconsistent",
                path.display()
            )));
        }
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::NamedTempFile;

    use crate::matrix::SparseRow;
    use Region::*;

    fn matrix(rows: &[&[u32]]) -> SparseMatrix {
        let n_cols = rows.first().map_or(0, |r| r.len());
        SparseMatrix::from_rows(n_cols, rows.iter().map(|r| SparseRow::from_dense(r))).unwrap()
    }

    #[test]
    fn test_chi2_values() {
        // column 0 only occurs in WEST rows, column 1 is spread evenly
        let m = matrix(&[&[2, 1, 0], &[2, 1, 0], &[0, 1, 0], &[0, 1, 0]]);
        let labels = [West, West, South, South];
        let scores = chi2(&m, &labels).unwrap();

        // observed (4, 0) against expected (2, 2)
        assert!((scores[0].unwrap() - 4.0).abs() < 1e-12);
        assert!(scores[1].unwrap().abs() < 1e-12);
        assert_eq!(scores[2], None);
    }

    #[test]
    fn test_chi2_shape_mismatch() {
        let m = matrix(&[&[1, 0]]);
        assert!(matches!(
            chi2(&m, &[West, West]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_fit_picks_highest_scores() {
        let m = matrix(&[
            &[3, 1, 0, 1],
            &[3, 0, 1, 1],
            &[0, 1, 0, 1],
            &[0, 0, 5, 1],
        ]);
        let labels = [West, West, South, South];
        let selected = FeatureSelector::new(2).fit(&m, &labels).unwrap();

        assert_eq!(selected.len(), 2);
        assert_eq!(selected.ranked(), &[0, 2]);
        assert_eq!(selected.columns(), &[0, 2]);

        let projected = selected.transform(&m).unwrap();
        assert_eq!(projected.n_cols(), 2);
        assert_eq!(projected.row_to_dense(3), vec![0, 5]);
    }

    #[test]
    fn test_ties_break_by_column_index() {
        let m = matrix(&[&[1, 1, 1], &[1, 1, 1]]);
        let labels = [Midwest, Northeast];
        let selected = FeatureSelector::new(2).fit(&m, &labels).unwrap();
        assert_eq!(selected.ranked(), &[0, 1]);
    }

    #[test]
    fn test_invalid_k() {
        let m = matrix(&[&[1, 1, 1]]);
        assert!(matches!(
            FeatureSelector::new(0).fit(&m, &[West]),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            FeatureSelector::new(4).fit(&m, &[West]),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_single_record_drops_empty_column() {
        // vocabulary {a, b, c}; one record [(0, 2), (2, 1)]
        let m = matrix(&[&[2, 0, 1]]);
        let selected = FeatureSelector::new(2).fit(&m, &[Midwest]).unwrap();
        assert_eq!(selected.columns(), &[0, 2]);
        assert_eq!(selected.transform(&m).unwrap().row_to_dense(0), vec![2, 1]);
    }

    #[test]
    fn test_select_all_reproduces_matrix() {
        let m = matrix(&[&[0, 4, 1], &[7, 0, 0], &[1, 1, 1]]);
        let labels = [South, West, South];
        let selected = FeatureSelector::new(3).fit(&m, &labels).unwrap();
        assert_eq!(selected.transform(&m).unwrap(), m);
    }

    #[test]
    fn test_transform_is_idempotent_and_consistent() {
        let train = matrix(&[&[3, 0, 1, 0], &[0, 2, 0, 1], &[4, 0, 0, 0]]);
        let labels = [West, South, West];
        let dev = matrix(&[&[1, 1, 1, 1], &[0, 0, 9, 0]]);
        let selected = FeatureSelector::new(2).fit(&train, &labels).unwrap();

        let first = selected.transform(&dev).unwrap();
        let second = selected.transform(&dev).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.n_cols(), selected.transform(&train).unwrap().n_cols());

        for (k, &j) in selected.columns().iter().enumerate() {
            for i in 0..dev.n_rows() {
                assert_eq!(first.get(i, k), dev.get(i, j));
            }
        }
    }

    #[test]
    fn test_refit_is_stable_and_projection_keeps_row_order() {
        let train = matrix(&[&[3, 0, 1], &[0, 2, 0], &[4, 0, 0]]);
        let labels = [West, South, West];
        let dev = matrix(&[&[1, 2, 3], &[4, 5, 6]]);
        let dev_reversed = matrix(&[&[4, 5, 6], &[1, 2, 3]]);

        let selected = FeatureSelector::new(2).fit(&train, &labels).unwrap();
        let again = FeatureSelector::new(2).fit(&train, &labels).unwrap();
        assert_eq!(selected, again);

        let projected = selected.transform(&dev).unwrap();
        let projected_reversed = selected.transform(&dev_reversed).unwrap();
        assert_eq!(projected.row_to_dense(0), projected_reversed.row_to_dense(1));
        assert_eq!(projected.row_to_dense(1), projected_reversed.row_to_dense(0));
    }

    #[test]
    fn test_transform_shape_mismatch() {
        let train = matrix(&[&[1, 0, 1]]);
        let selected = FeatureSelector::new(1).fit(&train, &[West]).unwrap();
        let narrow = matrix(&[&[1, 0]]);
        assert!(matches!(
            selected.transform(&narrow),
            Err(Error::ShapeMismatch { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    fn test_save_and_load() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let m = matrix(&[&[1, 0, 2], &[0, 3, 0]]);
        let selected = FeatureSelector::new(3).fit(&m, &[West, South])?;

        let file = NamedTempFile::new()?;
        selected.save(file.path())?;
        let loaded = SelectedFeatures::load(file.path())?;
        assert_eq!(loaded, selected);
        Ok(())
    }
}
