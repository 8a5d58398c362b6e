use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use log::info;

use crate::error::{Error, Result, VocabularyErrorKind};

/// Vocabulary maps terms to integer ids and fixes the column order of
/// every feature matrix built against it.
/// Column `j` is the `j`-th entry of the vocabulary source.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    terms: Vec<String>,
    ids: Vec<u32>,
    columns_by_id: HashMap<u32, usize>,
    columns_by_term: HashMap<String, usize>,
}

impl Vocabulary {
    /// Builds a vocabulary from `(term, id)` entries in column order.
    ///
    /// # Arguments
    /// * `entries` - The entries, one per column.
    ///
    /// # Returns
    /// Returns the vocabulary, or a vocabulary error if a term or id repeats.
    /// The reported line number is the 1-based position of the offending entry.
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut vocabulary = Vocabulary::default();
        for (i, (term, id)) in entries.into_iter().enumerate() {
            vocabulary
                .push(term.into(), id)
                .map_err(|kind| Error::Vocabulary { line: i + 1, kind })?;
        }
        Ok(vocabulary)
    }

    /// Loads a vocabulary from `term<TAB>id` lines.
    ///
    /// # Arguments
    /// * `reader` - A buffered reader over the vocabulary source.
    ///
    /// # Returns
    /// Returns the vocabulary with columns in source order.
    ///
    /// # Errors
    /// Returns an error if a line lacks the tab delimiter, the id is not a
    /// non-negative integer, a term or id is repeated, or reading fails.
    pub fn load<R: BufRead>(reader: R) -> Result<Self> {
        let mut vocabulary = Vocabulary::default();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line_number = i + 1;
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                continue;
            }

            let (term, id) = parse_line(line).map_err(|kind| Error::Vocabulary {
                line: line_number,
                kind,
            })?;
            vocabulary
                .push(term.to_string(), id)
                .map_err(|kind| Error::Vocabulary {
                    line: line_number,
                    kind,
                })?;
        }

        Ok(vocabulary)
    }

    /// Loads a vocabulary file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let vocabulary = Self::load(BufReader::new(file))?;
        info!(
            "loaded vocabulary of {} terms from {}",
            vocabulary.len(),
            path.display()
        );
        Ok(vocabulary)
    }

    fn push(&mut self, term: String, id: u32) -> std::result::Result<(), VocabularyErrorKind> {
        if self.columns_by_term.contains_key(&term) {
            return Err(VocabularyErrorKind::DuplicateTerm(term));
        }
        if self.columns_by_id.contains_key(&id) {
            return Err(VocabularyErrorKind::DuplicateId(id));
        }

        let column = self.terms.len();
        self.columns_by_id.insert(id, column);
        self.columns_by_term.insert(term.clone(), column);
        self.terms.push(term);
        self.ids.push(id);
        Ok(())
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Gets the column that holds counts for a term id, if the id is known.
    pub fn column_of(&self, id: u32) -> Option<usize> {
        self.columns_by_id.get(&id).copied()
    }

    pub fn column_of_term(&self, term: &str) -> Option<usize> {
        self.columns_by_term.get(term).copied()
    }

    pub fn id_of(&self, column: usize) -> Option<u32> {
        self.ids.get(column).copied()
    }

    pub fn term_of(&self, column: usize) -> Option<&str> {
        self.terms.get(column).map(String::as_str)
    }
}

fn parse_line(line: &str) -> std::result::Result<(&str, u32), VocabularyErrorKind> {
    let (term, id) = line
        .split_once('\t')
        .ok_or(VocabularyErrorKind::MissingDelimiter)?;
    let id = id.trim();
    let id = id
        .parse::<u32>()
        .map_err(|_| VocabularyErrorKind::InvalidId(id.to_string()))?;
    Ok((term, id))
}
