use std::collections::HashMap;

use csv::{ReaderBuilder, StringRecord};
use thiserror::Error;

use crate::literal::{parse_pairs, LiteralError};
use crate::matrix::SparseRow;
use crate::region::{Region, UnknownRegion};
use crate::vocabulary::Vocabulary;

/// Why a single count record could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed CSV record: {0}")]
    Csv(String),
    #[error("record has no field after the label")]
    MissingLabel,
    #[error("record has an empty pair list field")]
    MissingPayload,
    #[error("malformed pair list: {0}")]
    Literal(#[from] LiteralError),
    #[error(transparent)]
    UnknownLabel(#[from] UnknownRegion),
}

/// One decoded record: its counts aligned to the vocabulary columns and,
/// for labelled datasets, its region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub row: SparseRow,
    pub label: Option<Region>,
}

/// Decodes one raw count record against a vocabulary.
///
/// The record is one CSV line such as `SOUTH,...,"[(12, 3), (40, 1)]"`: the
/// first field is the label and the last field is the pair list. Fields in
/// between are skipped and may be quoted and contain commas.
///
/// # Arguments
/// * `line` - The raw record.
/// * `vocabulary` - The vocabulary that fixes the columns.
/// * `labelled` - Whether the label field must be parsed into a [`Region`].
///   When false the label is ignored and [`DecodedRecord::label`] is `None`.
///
/// # Returns
/// Returns the decoded record. Term ids unknown to the vocabulary are ignored.
/// When an id occurs twice in one record the later count wins.
///
/// # Example
/// ```
/// use geobow::decoder::decode;
/// use geobow::region::Region;
/// use geobow::vocabulary::Vocabulary;
///
/// let vocabulary = Vocabulary::from_entries([("a", 0), ("b", 1), ("c", 2)]).unwrap();
/// let record = decode("WEST,\"[(0, 3), (2, 1)]\"", &vocabulary, true).unwrap();
/// assert_eq!(record.row.to_dense(vocabulary.len()), vec![3, 0, 1]);
/// assert_eq!(record.label, Some(Region::West));
/// ```
pub fn decode(
    line: &str,
    vocabulary: &Vocabulary,
    labelled: bool,
) -> Result<DecodedRecord, DecodeError> {
    let fields = read_fields(line)?;
    if fields.len() < 2 {
        return Err(DecodeError::MissingLabel);
    }

    let label = if labelled {
        Some(fields[0].parse::<Region>()?)
    } else {
        None
    };

    let payload = &fields[fields.len() - 1];
    if payload.trim().is_empty() {
        return Err(DecodeError::MissingPayload);
    }
    let pairs = parse_pairs(payload)?;

    let counts: HashMap<u32, u32> = pairs.into_iter().collect();

    let mut entries: Vec<(usize, u32)> = counts
        .into_iter()
        .filter(|&(_, count)| count != 0)
        .filter_map(|(id, count)| vocabulary.column_of(id).map(|column| (column, count)))
        .collect();
    entries.sort_unstable_by_key(|&(column, _)| column);

    Ok(DecodedRecord {
        row: SparseRow { entries },
        label,
    })
}

/// Splits one line into its CSV fields.
fn read_fields(line: &str) -> Result<StringRecord, DecodeError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut fields = StringRecord::new();
    let found = reader
        .read_record(&mut fields)
        .map_err(|e| DecodeError::Csv(e.to_string()))?;
    if !found {
        return Err(DecodeError::MissingLabel);
    }
    Ok(fields)
}
