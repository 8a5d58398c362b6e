use crate::error::{Error, Result};

/// A sparse row of counts: `(column, count)` entries with strictly
/// increasing columns and no zero counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseRow {
    pub entries: Vec<(usize, u32)>,
}

impl SparseRow {
    /// Builds a row from a dense vector of counts, dropping the zeros.
    pub fn from_dense(values: &[u32]) -> Self {
        SparseRow {
            entries: values
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v != 0)
                .map(|(j, &v)| (j, v))
                .collect(),
        }
    }

    pub fn to_dense(&self, n_cols: usize) -> Vec<u32> {
        let mut dense = vec![0; n_cols];
        for &(j, v) in &self.entries {
            dense[j] = v;
        }
        dense
    }

    pub fn sum(&self) -> u64 {
        self.entries.iter().map(|&(_, v)| v as u64).sum()
    }
}

/// Instance × feature matrix of non-negative counts in compressed sparse
/// row layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseMatrix {
    n_cols: usize,
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<u32>,
}

impl SparseMatrix {
    /// Creates a matrix with no rows.
    pub fn empty(n_cols: usize) -> Self {
        SparseMatrix {
            n_cols,
            indptr: vec![0],
            indices: vec![],
            data: vec![],
        }
    }

    /// Assembles a matrix from rows in order.
    ///
    /// # Arguments
    /// * `n_cols` - The width of the matrix.
    /// * `rows` - The rows; each must have strictly increasing columns below `n_cols`.
    ///
    /// # Returns
    /// Returns the matrix, or a shape-mismatch error if a row addresses a
    /// column outside the matrix.
    pub fn from_rows<I>(n_cols: usize, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = SparseRow>,
    {
        let mut matrix = Self::empty(n_cols);
        for row in rows {
            matrix.push_row(row)?;
        }
        Ok(matrix)
    }

    /// Appends one row at the bottom of the matrix.
    pub fn push_row(&mut self, row: SparseRow) -> Result<()> {
        if let Some(&(j, _)) = row.entries.iter().find(|&&(j, _)| j >= self.n_cols) {
            return Err(Error::ShapeMismatch {
                what: "row column index",
                expected: self.n_cols,
                found: j,
            });
        }
        debug_assert!(row.entries.windows(2).all(|w| w[0].0 < w[1].0));

        for (j, v) in row.entries {
            if v != 0 {
                self.indices.push(j);
                self.data.push(v);
            }
        }
        self.indptr.push(self.indices.len());
        Ok(())
    }

    pub fn n_rows(&self) -> usize {
        self.indptr.len() - 1
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored non-zero entries.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Iterates over the non-zero `(column, count)` entries of row `i`.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, u32)> + '_ {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        self.indices[start..end]
            .iter()
            .copied()
            .zip(self.data[start..end].iter().copied())
    }

    pub fn get(&self, i: usize, j: usize) -> u32 {
        let (start, end) = (self.indptr[i], self.indptr[i + 1]);
        match self.indices[start..end].binary_search(&j) {
            Ok(pos) => self.data[start + pos],
            Err(_) => 0,
        }
    }

    pub fn row_to_dense(&self, i: usize) -> Vec<u32> {
        let mut dense = vec![0; self.n_cols];
        for (j, v) in self.row(i) {
            dense[j] = v;
        }
        dense
    }

    /// Sums every column over all rows.
    pub fn column_sums(&self) -> Vec<u64> {
        let mut sums = vec![0u64; self.n_cols];
        for (&j, &v) in self.indices.iter().zip(self.data.iter()) {
            sums[j] += v as u64;
        }
        sums
    }

    /// Builds a new matrix made of the given columns, in the given order.
    ///
    /// # Arguments
    /// * `columns` - Source column indices; output column `k` is source column `columns[k]`.
    ///
    /// # Returns
    /// Returns the projected matrix with the same number of rows, or a
    /// shape-mismatch error if a column index is out of range.
    pub fn select_columns(&self, columns: &[usize]) -> Result<SparseMatrix> {
        let mut remap = vec![None; self.n_cols];
        for (new_j, &old_j) in columns.iter().enumerate() {
            match remap.get_mut(old_j) {
                Some(slot) => *slot = Some(new_j),
                None => {
                    return Err(Error::ShapeMismatch {
                        what: "selected column index",
                        expected: self.n_cols,
                        found: old_j,
                    })
                }
            }
        }

        let mut projected = Self::empty(columns.len());
        for i in 0..self.n_rows() {
            let mut entries: Vec<(usize, u32)> = self
                .row(i)
                .filter_map(|(j, v)| remap[j].map(|new_j| (new_j, v)))
                .collect();
            entries.sort_unstable_by_key(|&(j, _)| j);
            projected.push_row(SparseRow { entries })?;
        }
        Ok(projected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SparseMatrix {
        SparseMatrix::from_rows(
            4,
            vec![
                SparseRow::from_dense(&[1, 0, 0, 2]),
                SparseRow::from_dense(&[0, 0, 0, 0]),
                SparseRow::from_dense(&[0, 3, 4, 0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_shape_and_access() {
        let matrix = sample();
        assert_eq!(matrix.n_rows(), 3);
        assert_eq!(matrix.n_cols(), 4);
        assert_eq!(matrix.nnz(), 4);
        assert_eq!(matrix.get(0, 3), 2);
        assert_eq!(matrix.get(1, 3), 0);
        assert_eq!(matrix.row_to_dense(2), vec![0, 3, 4, 0]);
        assert_eq!(matrix.row(1).count(), 0);
    }

    #[test]
    fn test_column_sums() {
        assert_eq!(sample().column_sums(), vec![1, 3, 4, 2]);
    }

    #[test]
    fn test_select_columns_reorders() {
        let projected = sample().select_columns(&[3, 0]).unwrap();
        assert_eq!(projected.n_rows(), 3);
        assert_eq!(projected.n_cols(), 2);
        assert_eq!(projected.row_to_dense(0), vec![2, 1]);
        assert_eq!(projected.row_to_dense(2), vec![0, 0]);
    }

    #[test]
    fn test_select_all_columns_is_identity() {
        let matrix = sample();
        assert_eq!(matrix.select_columns(&[0, 1, 2, 3]).unwrap(), matrix);
    }

    #[test]
    fn test_select_out_of_range() {
        assert!(matches!(
            sample().select_columns(&[4]),
            Err(Error::ShapeMismatch { found: 4, .. })
        ));
    }

    #[test]
    fn test_push_row_out_of_range() {
        let mut matrix = SparseMatrix::empty(2);
        let err = matrix.push_row(SparseRow {
            entries: vec![(2, 1)],
        });
        assert!(err.is_err());
        assert_eq!(matrix.n_rows(), 0);
    }

    #[test]
    fn test_sparse_row_round_trip_through_dense() {
        let row = SparseRow::from_dense(&[0, 5, 0, 1]);
        assert_eq!(row.entries, vec![(1, 5), (3, 1)]);
        assert_eq!(row.to_dense(4), vec![0, 5, 0, 1]);
        assert_eq!(row.sum(), 6);
    }
}
