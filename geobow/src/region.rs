use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One of the four US census regions a user can be assigned to.
///
/// The declaration order is the class index order used by every
/// statistical routine in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    Midwest,
    Northeast,
    South,
    West,
}

impl Region {
    pub const ALL: [Region; 4] = [
        Region::Midwest,
        Region::Northeast,
        Region::South,
        Region::West,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// Gets the class index of the region.
    ///
    /// # Example
    /// ```
    /// use geobow::region::Region;
    ///
    /// assert_eq!(Region::South.index(), 2);
    /// assert_eq!(Region::from_index(2), Some(Region::South));
    /// ```
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Region> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Midwest => "MIDWEST",
            Region::Northeast => "NORTHEAST",
            Region::South => "SOUTH",
            Region::West => "WEST",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a label token names none of the four regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRegion(pub String);

impl fmt::Display for UnknownRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown region label '{}'", self.0)
    }
}

impl std::error::Error for UnknownRegion {}

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|region| region.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| UnknownRegion(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_region() {
        assert_eq!("MIDWEST".parse::<Region>(), Ok(Region::Midwest));
        assert_eq!(" west ".parse::<Region>(), Ok(Region::West));
        assert_eq!("Northeast".parse::<Region>(), Ok(Region::Northeast));
        assert_eq!(
            "PACIFIC".parse::<Region>(),
            Err(UnknownRegion("PACIFIC".to_string()))
        );
    }

    #[test]
    fn test_index_round_trip() {
        for region in Region::ALL {
            assert_eq!(Region::from_index(region.index()), Some(region));
        }
        assert_eq!(Region::from_index(Region::COUNT), None);
    }

    #[test]
    fn test_display_matches_label_token() {
        assert_eq!(Region::South.to_string(), "SOUTH");
        assert_eq!(serde_json::to_string(&Region::Midwest).unwrap(), "\"MIDWEST\"");
    }
}
