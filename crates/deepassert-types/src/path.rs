//! Property paths and caller-supplied overrides.

use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;
use crate::value::Value;

/// Dot-separated location of a node in an object graph.
///
/// Never empty. Segments compare case-insensitively; the original spelling
/// is kept for display.
#[derive(Clone, Debug, Eq)]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    /// Parse `a.b.c`. Rejects the empty string and empty segments.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let segments: Vec<String> = raw.split('.').map(|s| s.trim().to_string()).collect();
        if segments.iter().any(String::is_empty) {
            return Err(TypeError::EmptyPath(raw.to_string()));
        }
        Ok(Self { segments })
    }

    /// A single-segment path naming a comparison root.
    pub fn root(name: impl Into<String>) -> Self {
        let name = name.into();
        let name = if name.is_empty() { "root".to_string() } else { name };
        Self {
            segments: vec![name],
        }
    }

    /// This path extended by one segment.
    pub fn child(&self, segment: impl fmt::Display) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.to_string());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segments below the root segment.
    pub fn below_root(&self) -> &[String] {
        &self.segments[1..]
    }

    /// Same segments as `other`, ignoring case.
    pub fn matches(&self, other: &[String]) -> bool {
        segments_eq(&self.segments, other)
    }

    /// Strictly longer than `prefix` and starting with it.
    pub fn is_below(&self, prefix: &[String]) -> bool {
        self.segments.len() > prefix.len() && segments_eq(&self.segments[..prefix.len()], prefix)
    }

    /// Drop a leading `qualifier` segment, when the path has more than one segment.
    ///
    /// Returns `true` when the path was changed.
    pub fn strip_qualifier(&mut self, qualifier: &str) -> bool {
        if self.segments.len() > 1 && self.segments[0].eq_ignore_ascii_case(qualifier) {
            self.segments.remove(0);
            true
        } else {
            false
        }
    }
}

fn segments_eq(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.eq_ignore_ascii_case(y))
}

impl PartialEq for PropertyPath {
    fn eq(&self, other: &Self) -> bool {
        segments_eq(&self.segments, &other.segments)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl FromStr for PropertyPath {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// What an override demands of the node at its path.
#[derive(Clone, Debug)]
pub enum Expectation {
    /// The actual value must compare equal to this one.
    Value(Value),
    NotNull,
    Null,
    NotEmpty,
    Empty,
    /// The node is not inspected.
    Ignored,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "== {v}"),
            Self::NotNull => write!(f, "not null"),
            Self::Null => write!(f, "null"),
            Self::NotEmpty => write!(f, "not empty"),
            Self::Empty => write!(f, "empty"),
            Self::Ignored => write!(f, "ignored"),
        }
    }
}

/// An expectation keyed by property path.
#[derive(Clone, Debug)]
pub struct Override {
    pub path: PropertyPath,
    pub expectation: Expectation,
}

impl Override {
    pub fn new(path: PropertyPath, expectation: Expectation) -> Self {
        Self { path, expectation }
    }

    fn parse(path: &str, expectation: Expectation) -> Result<Self, TypeError> {
        Ok(Self::new(PropertyPath::parse(path)?, expectation))
    }

    pub fn value(path: &str, value: impl Into<Value>) -> Result<Self, TypeError> {
        Self::parse(path, Expectation::Value(value.into()))
    }

    pub fn not_null(path: &str) -> Result<Self, TypeError> {
        Self::parse(path, Expectation::NotNull)
    }

    pub fn null(path: &str) -> Result<Self, TypeError> {
        Self::parse(path, Expectation::Null)
    }

    pub fn not_empty(path: &str) -> Result<Self, TypeError> {
        Self::parse(path, Expectation::NotEmpty)
    }

    pub fn empty(path: &str) -> Result<Self, TypeError> {
        Self::parse(path, Expectation::Empty)
    }

    pub fn ignored(path: &str) -> Result<Self, TypeError> {
        Self::parse(path, Expectation::Ignored)
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.expectation)
    }
}
