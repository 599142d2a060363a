use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

static SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)((?:\[(?:\d+|\*)\])*)$").expect("segment regex is valid")
});
static SELECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+|\*)\]").expect("selector regex is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
    /// Every element of an array
    Each,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("field path is empty")]
    Empty,
    #[error("invalid segment '{0}' in field path")]
    InvalidSegment(String),
}

/// Address of one or more values inside a JSON document,
/// e.g. `order.order_list[0].name` or `order.order_list[*].quantity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    segments: Vec<Segment>,
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw.trim().is_empty() {
            return Err(PathError::Empty);
        }
        let mut segments = Vec::new();
        for part in raw.split('.') {
            let caps = SEGMENT
                .captures(part)
                .ok_or_else(|| PathError::InvalidSegment(part.to_string()))?;
            segments.push(Segment::Key(caps[1].to_string()));
            for selector in SELECTOR.captures_iter(&caps[2]) {
                segments.push(match &selector[1] {
                    "*" => Segment::Each,
                    index => Segment::Index(
                        index
                            .parse()
                            .map_err(|_| PathError::InvalidSegment(part.to_string()))?,
                    ),
                });
            }
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FieldPath {
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn has_wildcard(&self) -> bool {
        self.segments.contains(&Segment::Each)
    }

    /// Every value the path points at, `None` when any step is missing
    #[must_use]
    pub fn resolve<'v>(&self, root: &'v Value) -> Option<Vec<&'v Value>> {
        let mut current = vec![root];
        for segment in &self.segments {
            let mut next = Vec::with_capacity(current.len());
            for value in current {
                match segment {
                    Segment::Key(key) => next.push(value.as_object()?.get(key)?),
                    Segment::Index(i) => next.push(value.as_array()?.get(*i)?),
                    Segment::Each => next.extend(value.as_array()?.iter()),
                }
            }
            current = next;
        }
        Some(current)
    }
}
