use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;
use rayon::prelude::*;

use crate::decoder::{decode, DecodedRecord};
use crate::error::{Error, Result};
use crate::matrix::SparseMatrix;
use crate::metrics::LabelDistribution;
use crate::region::Region;
use crate::vocabulary::Vocabulary;

/// A dataset turned into numbers: one matrix row per record plus the
/// parallel label vector. Unlabelled datasets have an empty label vector.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub matrix: SparseMatrix,
    pub labels: Vec<Region>,
}

impl Dataset {
    /// Builds a dataset from raw records.
    ///
    /// # Arguments
    /// * `name` - The dataset name used in error messages.
    /// * `lines` - The records, without a header. Line `i` is reported as line `i + 1`.
    /// * `vocabulary` - The vocabulary shared by all datasets of a run.
    /// * `labelled` - Whether records carry a region label to be kept.
    ///
    /// # Returns
    /// Returns the dataset with one row per line in input order.
    ///
    /// # Errors
    /// Returns an error naming the dataset and line of the earliest bad
    /// record; no partial dataset is produced.
    pub fn build<S>(name: &str, lines: &[S], vocabulary: &Vocabulary, labelled: bool) -> Result<Self>
    where
        S: AsRef<str> + Sync,
    {
        let numbered: Vec<(usize, &str)> = lines
            .iter()
            .enumerate()
            .map(|(i, line)| (i + 1, line.as_ref()))
            .collect();
        Self::build_numbered(name, &numbered, vocabulary, labelled)
    }

    /// Reads a count file, skipping its header line and blank lines, and
    /// builds the dataset from the remaining records.
    ///
    /// # Arguments
    /// * `name` - The dataset name used in logs and error messages.
    /// * `path` - The count file.
    /// * `vocabulary` - The shared vocabulary.
    /// * `labelled` - Whether records carry a region label to be kept.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or a record fails to
    /// decode; line numbers in errors count the header as line 1.
    pub fn load(name: &str, path: &Path, vocabulary: &Vocabulary, labelled: bool) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut lines = Vec::new();
        for (i, line) in reader.lines().enumerate().skip(1) {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            lines.push((i + 1, line));
        }

        let numbered: Vec<(usize, &str)> = lines
            .iter()
            .map(|(number, line)| (*number, line.as_str()))
            .collect();
        let dataset = Self::build_numbered(name, &numbered, vocabulary, labelled)?;
        info!(
            "loaded dataset '{}' from {}: {} rows, {} columns, {} non-zero counts",
            dataset.name,
            path.display(),
            dataset.matrix.n_rows(),
            dataset.matrix.n_cols(),
            dataset.matrix.nnz()
        );
        Ok(dataset)
    }

    fn build_numbered(
        name: &str,
        lines: &[(usize, &str)],
        vocabulary: &Vocabulary,
        labelled: bool,
    ) -> Result<Self> {
        // Decoded in parallel, checked in input order so the earliest bad line is reported.
        let decoded: Vec<Result<DecodedRecord>> = lines
            .par_iter()
            .map(|&(line_number, line)| {
                decode(line, vocabulary, labelled).map_err(|source| Error::Record {
                    dataset: name.to_string(),
                    line: line_number,
                    source,
                })
            })
            .collect();
        let records = decoded.into_iter().collect::<Result<Vec<_>>>()?;

        let mut labels = Vec::with_capacity(if labelled { records.len() } else { 0 });
        let mut matrix = SparseMatrix::empty(vocabulary.len());
        for record in records {
            if let Some(label) = record.label {
                labels.push(label);
            }
            matrix.push_row(record.row)?;
        }

        Ok(Dataset {
            name: name.to_string(),
            matrix,
            labels,
        })
    }

    pub fn len(&self) -> usize {
        self.matrix.n_rows()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.n_rows() == 0
    }

    pub fn is_labelled(&self) -> bool {
        self.labels.len() == self.matrix.n_rows() && !self.labels.is_empty()
    }

    /// Counts how many rows carry each region.
    pub fn label_distribution(&self) -> LabelDistribution {
        LabelDistribution::from_labels(&self.labels)
    }

    /// Returns a dataset with the same rows and labels over a new matrix,
    /// e.g. the projection onto selected features.
    pub fn with_matrix(&self, matrix: SparseMatrix) -> Result<Self> {
        if matrix.n_rows() != self.matrix.n_rows() {
            return Err(Error::ShapeMismatch {
                what: "dataset rows",
                expected: self.matrix.n_rows(),
                found: matrix.n_rows(),
            });
        }
        Ok(Dataset {
            name: self.name.clone(),
            matrix,
            labels: self.labels.clone(),
        })
    }
}
