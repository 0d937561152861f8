#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;

use std::str::FromStr;

use thiserror::Error;

/// Offset/limit window applied to an ordered query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    offset: Option<usize>,
    limit: Option<usize>,
}

impl Pagination {
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("invalid range parameter {0:?}, expected [start]:[end]")]
    Malformed(String),

    #[error("invalid range bound {0:?}")]
    InvalidBound(String),
}

/// A `start:end` selection over an ordered sequence. Bounds follow slice
/// semantics: a missing bound is open, a negative bound counts from the end,
/// and out-of-range bounds are clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Range {
    start: Option<i64>,
    end: Option<i64>,
}

impl Range {
    pub fn new(start: Option<i64>, end: Option<i64>) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> Option<i64> {
        self.start
    }

    pub fn end(&self) -> Option<i64> {
        self.end
    }

    /// Resolves the range against a sequence of `len` items.
    pub fn resolve(&self, len: usize) -> Pagination {
        let start = self.start.map(|b| clamp_bound(b, len)).unwrap_or(0);
        let end = self.end.map(|b| clamp_bound(b, len)).unwrap_or(len);
        Pagination::default()
            .with_offset(start)
            .with_limit(end.saturating_sub(start))
    }
}

fn clamp_bound(bound: i64, len: usize) -> usize {
    let len = len as i64;
    let bound = if bound < 0 { len + bound } else { bound };
    bound.clamp(0, len) as usize
}

impl FromStr for Range {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((start, end)) = s.split_once(':') else {
            return Err(RangeError::Malformed(s.to_string()));
        };
        if end.contains(':') {
            return Err(RangeError::Malformed(s.to_string()));
        }
        Ok(Self {
            start: parse_bound(start)?,
            end: parse_bound(end)?,
        })
    }
}

fn parse_bound(raw: &str) -> Result<Option<i64>, RangeError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| RangeError::InvalidBound(raw.to_string()))
}
