//! Classifiers behind one fit/predict interface.
//!
//! The pipeline only hands them projected count matrices and region
//! labels; each implementation is free in how it learns from them.

mod logistic;
mod majority;
mod naive_bayes;

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub use self::logistic::{LogisticRegression, LogisticRegressionOptions};
pub use self::majority::MajorityClass;
pub use self::naive_bayes::NaiveBayes;

use crate::error::{Error, Result};
use crate::matrix::SparseMatrix;
use crate::region::Region;

pub trait Classifier: Send {
    /// A short name used in logs and reports.
    fn name(&self) -> &str;

    /// Learns from a count matrix and its labels.
    ///
    /// Iterative learners check `running` between iterations and stop early
    /// once it is cleared, keeping what they learned so far.
    fn fit(
        &mut self,
        matrix: &SparseMatrix,
        labels: &[Region],
        running: Arc<AtomicBool>,
    ) -> Result<()>;

    /// Predicts one region per matrix row.
    fn predict(&self, matrix: &SparseMatrix) -> Result<Vec<Region>>;
}

/// The classifiers the pipeline knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    Majority,
    NaiveBayes,
    LogisticRegression,
}

impl ClassifierKind {
    pub const ALL: [ClassifierKind; 3] = [
        ClassifierKind::Majority,
        ClassifierKind::NaiveBayes,
        ClassifierKind::LogisticRegression,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ClassifierKind::Majority => "majority",
            ClassifierKind::NaiveBayes => "naive-bayes",
            ClassifierKind::LogisticRegression => "logistic-regression",
        }
    }

    /// Creates an unfitted classifier of this kind.
    ///
    /// # Arguments
    /// * `options` - Hyperparameters; each kind reads only the ones it uses.
    pub fn build(self, options: &ClassifierOptions) -> Box<dyn Classifier> {
        match self {
            ClassifierKind::Majority => Box::new(MajorityClass::new()),
            ClassifierKind::NaiveBayes => Box::new(NaiveBayes::new(options.alpha)),
            ClassifierKind::LogisticRegression => {
                Box::new(LogisticRegression::new(options.logistic.clone()))
            }
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassifierKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidParameter(format!("unknown classifier '{}'", s)))
    }
}

#[derive(Debug, Clone)]
pub struct ClassifierOptions {
    /// Additive smoothing for Naive Bayes.
    pub alpha: f64,
    pub logistic: LogisticRegressionOptions,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        ClassifierOptions {
            alpha: 1.0,
            logistic: LogisticRegressionOptions::default(),
        }
    }
}

pub(crate) fn check_training_data(matrix: &SparseMatrix, labels: &[Region]) -> Result<()> {
    if labels.len() != matrix.n_rows() {
        return Err(Error::ShapeMismatch {
            what: "label vector",
            expected: matrix.n_rows(),
            found: labels.len(),
        });
    }
    if labels.is_empty() {
        return Err(Error::InvalidParameter(
            "cannot fit a classifier on an empty dataset".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn check_width(name: &str, expected: usize, matrix: &SparseMatrix) -> Result<()> {
    if matrix.n_cols() != expected {
        log::debug!("{} was fitted on {} columns", name, expected);
        return Err(Error::ShapeMismatch {
            what: "classifier input columns",
            expected,
            found: matrix.n_cols(),
        });
    }
    Ok(())
}

/// Index of the largest score, the earliest one on ties.
pub(crate) fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (c, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = c;
        }
    }
    best
}
