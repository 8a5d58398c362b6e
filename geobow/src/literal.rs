//! Parser for the sparse pair-list literal embedded in count records,
//! e.g. `[(12, 3), (40, 1)]`.
//!
//! The payload contains commas of its own, so it is parsed as a nested
//! structure rather than split on the record delimiter. Inner pairs may be
//! written as tuples or as two-element lists, and a trailing comma is
//! accepted after the last element of either.

use std::fmt;

/// A malformed literal, with the byte offset where parsing stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralError {
    pub offset: usize,
    pub expected: &'static str,
    pub found: Option<char>,
}

impl fmt::Display for LiteralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.found {
            Some(ch) => write!(
                f,
                "expected {} at offset {}, found '{}'",
                self.expected, self.offset, ch
            ),
            None => write!(
                f,
                "expected {} at offset {}, found end of input",
                self.expected, self.offset
            ),
        }
    }
}

impl std::error::Error for LiteralError {}

/// Parses a pair-list literal into `(term_id, count)` pairs in source order.
///
/// # Arguments
/// * `text` - The literal, without the surrounding record quotes.
///
/// # Returns
/// Returns the pairs, or a [`LiteralError`] if the text is not a list of
/// non-negative integer pairs.
///
/// # Example
/// ```
/// use geobow::literal::parse_pairs;
///
/// let pairs = parse_pairs("[(0, 2), (2, 1)]").unwrap();
/// assert_eq!(pairs, vec![(0, 2), (2, 1)]);
/// ```
pub fn parse_pairs(text: &str) -> Result<Vec<(u32, u32)>, LiteralError> {
    let mut parser = Parser::new(text);
    parser.skip_whitespace();
    let pairs = parser.list()?;
    parser.skip_whitespace();
    parser.end()?;
    Ok(pairs)
}

struct Parser<'a> {
    bytes: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Parser {
            bytes: text.as_bytes(),
            text,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn error(&self, expected: &'static str) -> LiteralError {
        LiteralError {
            offset: self.pos,
            expected,
            found: self.text[self.pos..].chars().next(),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, byte: u8, expected: &'static str) -> Result<(), LiteralError> {
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn end(&self) -> Result<(), LiteralError> {
        if self.pos == self.bytes.len() {
            Ok(())
        } else {
            Err(self.error("end of input"))
        }
    }

    // list := '[' ( pair ( ',' pair )* ','? )? ']'
    fn list(&mut self) -> Result<Vec<(u32, u32)>, LiteralError> {
        self.expect(b'[', "'['")?;
        let mut pairs = Vec::new();

        loop {
            self.skip_whitespace();
            if self.peek() == Some(b']') {
                self.pos += 1;
                return Ok(pairs);
            }

            pairs.push(self.pair()?);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    return Ok(pairs);
                }
                _ => return Err(self.error("',' or ']'")),
            }
        }
    }

    // pair := '(' int ',' int ','? ')' | '[' int ',' int ','? ']'
    fn pair(&mut self) -> Result<(u32, u32), LiteralError> {
        let close = match self.peek() {
            Some(b'(') => b')',
            Some(b'[') => b']',
            _ => return Err(self.error("'(' or '['")),
        };
        self.pos += 1;

        self.skip_whitespace();
        let id = self.integer()?;
        self.skip_whitespace();
        self.expect(b',', "','")?;
        self.skip_whitespace();
        let count = self.integer()?;
        self.skip_whitespace();

        if self.peek() == Some(b',') {
            self.pos += 1;
            self.skip_whitespace();
        }
        if close == b')' {
            self.expect(close, "')'")?;
        } else {
            self.expect(close, "']'")?;
        }
        Ok((id, count))
    }

    fn integer(&mut self) -> Result<u32, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.error("non-negative integer"));
        }
        self.text[start..self.pos].parse::<u32>().map_err(|_| {
            let mut err = self.error("integer that fits in 32 bits");
            err.offset = start;
            err.found = self.text[start..].chars().next();
            err
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tuples() {
        assert_eq!(
            parse_pairs("[(5, 3), (17, 1), (2, 10)]"),
            Ok(vec![(5, 3), (17, 1), (2, 10)])
        );
    }

    #[test]
    fn test_parse_whitespace_and_trailing_commas() {
        assert_eq!(
            parse_pairs("  [ ( 1 ,2 ,) ,[3,4], ]  "),
            Ok(vec![(1, 2), (3, 4)])
        );
        assert_eq!(parse_pairs("[(1,2),\n (3,4)]"), Ok(vec![(1, 2), (3, 4)]));
    }

    #[test]
    fn test_parse_empty_list() {
        assert_eq!(parse_pairs("[]"), Ok(vec![]));
        assert_eq!(parse_pairs("[ ]"), Ok(vec![]));
    }

    #[test]
    fn test_rejects_wrong_arity() {
        let err = parse_pairs("[(1, 2, 3)]").unwrap_err();
        assert_eq!(err.expected, "')'");
        assert_eq!(err.found, Some('3'));

        assert!(parse_pairs("[(1)]").is_err());
    }

    #[test]
    fn test_rejects_negative_and_float_values() {
        let err = parse_pairs("[(1, -2)]").unwrap_err();
        assert_eq!(err.expected, "non-negative integer");
        assert_eq!(err.offset, 5);

        assert!(parse_pairs("[(1, 2.5)]").is_err());
    }

    #[test]
    fn test_rejects_unbalanced_and_trailing_input() {
        assert!(parse_pairs("[(1, 2)").is_err());
        assert!(parse_pairs("(1, 2)").is_err());
        assert!(parse_pairs("[(1, 2)]]").is_err());
        assert!(parse_pairs("[(1, 2) (3, 4)]").is_err());
        assert!(parse_pairs("").is_err());
    }

    #[test]
    fn test_rejects_overflow() {
        let err = parse_pairs("[(99999999999, 1)]").unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.expected, "integer that fits in 32 bits");
    }

    #[test]
    fn test_error_message() {
        let err = parse_pairs("[(1, 2)").unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected ',' or ']' at offset 7, found end of input"
        );
    }
}
