use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KeyError;

/// Path separator used by the rendered form of a [`Key`].
pub const SEPARATOR: char = '/';

/// A hierarchical key: an ordered sequence of non-empty path segments.
///
/// Keys render as `/a/b/c`; the root key (no segments) renders as `/`.
/// Equality and ordering are segment-wise, so `/a/b` sorts before `/a-`
/// even though the rendered strings compare the other way round.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Key {
    segments: Vec<String>,
}

impl Key {
    /// The root key `/`.
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parse a rendered key such as `/providers/h1/p1`.
    ///
    /// The text must start with `/` and must not contain empty segments,
    /// so `//a` and `/a/` are rejected rather than normalized.
    pub fn parse(text: &str) -> Result<Self, KeyError> {
        let Some(rest) = text.strip_prefix(SEPARATOR) else {
            return Err(KeyError::InvalidKey {
                key: text.to_string(),
                reason: "must start with '/'".into(),
            });
        };
        if rest.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for segment in rest.split(SEPARATOR) {
            if segment.is_empty() {
                return Err(KeyError::InvalidKey {
                    key: text.to_string(),
                    reason: "path segments must not be empty".into(),
                });
            }
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    /// Build a key from individual segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self { segments })
    }

    /// Return a new key with `segment` appended.
    pub fn child(&self, segment: impl Into<String>) -> Result<Self, KeyError> {
        let segment = segment.into();
        validate_segment(&segment)?;
        let mut segments = self.segments.clone();
        segments.push(segment);
        Ok(Self { segments })
    }

    /// Return a new key with every segment of `tail` appended.
    pub fn join<S: AsRef<str>>(&self, tail: &[S]) -> Result<Self, KeyError> {
        let mut segments = self.segments.clone();
        for segment in tail {
            let segment = segment.as_ref();
            validate_segment(segment)?;
            segments.push(segment.to_string());
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment-wise prefix test: `/pins` is a prefix of `/pins/h1` and of
    /// itself, but not of `/pinsx`.
    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// The segments remaining after `prefix`, or `None` if `prefix` is not a
    /// prefix of this key.
    pub fn strip_prefix(&self, prefix: &Key) -> Option<&[String]> {
        self.segments.strip_prefix(prefix.segments.as_slice())
    }

    /// The last segment, if any.
    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }
}

/// Check that a single segment is non-empty and contains no separator.
pub fn validate_segment(segment: &str) -> Result<(), KeyError> {
    if segment.is_empty() {
        return Err(KeyError::InvalidSegment {
            segment: segment.to_string(),
            reason: "segment must not be empty".into(),
        });
    }
    if segment.contains(SEPARATOR) {
        return Err(KeyError::InvalidSegment {
            segment: segment.to_string(),
            reason: "segment must not contain '/'".into(),
        });
    }
    Ok(())
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({self})")
    }
}

impl FromStr for Key {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Key {
    type Error = KeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.to_string()
    }
}
