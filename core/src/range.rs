//! Status-code range sets.
//!
//! The text grammar is a comma-separated list of entries, each either `N`
//! (the single code N) or `N:M` (every code from N through M inclusive), with
//! `0 <= N <= M <= 599`. Whitespace around entries is ignored. Overlapping or
//! duplicate entries are legal and simply widen acceptance. An absent or
//! blank text means `100:399`.

use std::fmt;
use std::str::FromStr;

use crate::error::RangeParseError;

pub const DEFAULT_VALID_RESPONSE_CODES: &str = "100:399";

const MAX_STATUS: u32 = 599;

/// Inclusive interval of status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusRange {
    low: u16,
    high: u16,
}

impl StatusRange {
    /// Returns `None` when `low > high`.
    pub fn new(low: u16, high: u16) -> Option<Self> {
        (low <= high).then_some(Self { low, high })
    }

    pub fn single(code: u16) -> Self {
        Self {
            low: code,
            high: code,
        }
    }

    pub fn low(&self) -> u16 {
        self.low
    }

    pub fn high(&self) -> u16 {
        self.high
    }

    pub fn contains(&self, status: u16) -> bool {
        (self.low..=self.high).contains(&status)
    }
}

impl fmt::Display for StatusRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.low == self.high {
            write!(f, "{}", self.low)
        } else {
            write!(f, "{}:{}", self.low, self.high)
        }
    }
}

/// Union of status ranges considered a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<StatusRange>,
}

impl RangeSet {
    /// Parse range text; `None` or blank text yields the default set.
    pub fn parse(text: Option<&str>) -> Result<Self, RangeParseError> {
        match text.map(str::trim) {
            None | Some("") => Self::from_str(DEFAULT_VALID_RESPONSE_CODES),
            Some(text) => Self::from_str(text),
        }
    }

    pub fn ranges(&self) -> &[StatusRange] {
        &self.ranges
    }

    /// The first range containing `status`, if any.
    pub fn matching(&self, status: u16) -> Option<&StatusRange> {
        self.ranges.iter().find(|r| r.contains(status))
    }

    pub fn contains(&self, status: u16) -> bool {
        self.matching(status).is_some()
    }
}

impl Default for RangeSet {
    fn default() -> Self {
        Self {
            ranges: vec![StatusRange { low: 100, high: 399 }],
        }
    }
}

impl FromStr for RangeSet {
    type Err = RangeParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let ranges = text
            .split(',')
            .map(|entry| parse_entry(text, entry.trim()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { ranges })
    }
}

fn parse_entry(text: &str, entry: &str) -> Result<StatusRange, RangeParseError> {
    if entry.is_empty() {
        return Err(RangeParseError::Empty(text.to_string()));
    }
    let mut parts = entry.split(':');
    let (low, high) = match (parts.next(), parts.next(), parts.next()) {
        (Some(n), None, None) => {
            let code = parse_code(entry, n)?;
            (code, code)
        }
        (Some(n), Some(m), None) => (parse_code(entry, n)?, parse_code(entry, m)?),
        _ => return Err(RangeParseError::Malformed(entry.to_string())),
    };
    StatusRange::new(low, high).ok_or_else(|| RangeParseError::Inverted(entry.to_string()))
}

fn parse_code(entry: &str, digits: &str) -> Result<u16, RangeParseError> {
    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeParseError::Malformed(entry.to_string()));
    }
    let code: u32 = digits
        .parse()
        .map_err(|_| RangeParseError::Malformed(entry.to_string()))?;
    if code > MAX_STATUS {
        return Err(RangeParseError::OutOfBounds(code));
    }
    // Bounded by MAX_STATUS above.
    Ok(code as u16)
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{range}")?;
        }
        Ok(())
    }
}
