use std::io;

use thiserror::Error;

use crate::decoder::DecodeError;

pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong on a single line of a vocabulary file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabularyErrorKind {
    #[error("missing tab delimiter between term and id")]
    MissingDelimiter,
    #[error("id '{0}' is not a non-negative integer")]
    InvalidId(String),
    #[error("term '{0}' appears more than once")]
    DuplicateTerm(String),
    #[error("id {0} appears more than once")]
    DuplicateId(u32),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("vocabulary line {line}: {kind}")]
    Vocabulary {
        line: usize,
        kind: VocabularyErrorKind,
    },

    #[error("dataset '{dataset}' line {line}: {source}")]
    Record {
        dataset: String,
        line: usize,
        #[source]
        source: DecodeError,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("shape mismatch for {what}: expected {expected}, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{0} has not been fitted")]
    NotFitted(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
