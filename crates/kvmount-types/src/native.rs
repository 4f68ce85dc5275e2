//! Backend-native key representations.
//!
//! A [`NativeKey`] is what a backend actually stores: either one key
//! attribute, or a partition/sort pair for composite-key tables. Native keys
//! order segment-wise so that listing a backend in native order yields
//! records in hierarchical [`Key`](crate::Key) order.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::key::SEPARATOR;

/// The encoded form of a hierarchical key inside one backend.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NativeKey {
    /// A single key attribute.
    Single(String),
    /// A composite primary key.
    Composite { partition: String, sort: String },
}

impl NativeKey {
    /// Segments of this key, as used for ordering and range matching.
    ///
    /// A single attribute splits on `/` (leading separator ignored); a
    /// composite key yields `[partition, sort]`.
    pub fn segments(&self) -> Vec<&str> {
        match self {
            NativeKey::Single(value) => split_segments(value).collect(),
            NativeKey::Composite { partition, sort } => vec![partition.as_str(), sort.as_str()],
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, NativeKey::Composite { .. })
    }

    /// The partition value of a composite key.
    pub fn partition(&self) -> Option<&str> {
        match self {
            NativeKey::Composite { partition, .. } => Some(partition),
            NativeKey::Single(_) => None,
        }
    }
}

fn split_segments(value: &str) -> impl Iterator<Item = &str> {
    value
        .strip_prefix(SEPARATOR)
        .unwrap_or(value)
        .split(SEPARATOR)
        .filter(|s| !s.is_empty())
}

impl Ord for NativeKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (NativeKey::Single(a), NativeKey::Single(b)) => {
                split_segments(a).cmp(split_segments(b)).then_with(|| a.cmp(b))
            }
            (
                NativeKey::Composite {
                    partition: pa,
                    sort: sa,
                },
                NativeKey::Composite {
                    partition: pb,
                    sort: sb,
                },
            ) => pa.cmp(pb).then_with(|| sa.cmp(sb)),
            (NativeKey::Single(_), NativeKey::Composite { .. }) => Ordering::Less,
            (NativeKey::Composite { .. }, NativeKey::Single(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for NativeKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NativeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeKey::Single(value) => write!(f, "{value}"),
            NativeKey::Composite { partition, sort } => write!(f, "({partition}, {sort})"),
        }
    }
}

impl fmt::Debug for NativeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeKey({self})")
    }
}

/// A selection of native keys for a scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeRange {
    /// Every key in the backend.
    All,
    /// Keys whose segments start with these segments.
    Prefix(Vec<String>),
}

impl NativeRange {
    pub fn contains(&self, key: &NativeKey) -> bool {
        match self {
            NativeRange::All => true,
            NativeRange::Prefix(prefix) => {
                let segments = key.segments();
                segments.len() >= prefix.len()
                    && prefix.iter().zip(segments).all(|(p, s)| p == s)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(s: &str) -> NativeKey {
        NativeKey::Single(s.to_string())
    }

    fn composite(p: &str, s: &str) -> NativeKey {
        NativeKey::Composite {
            partition: p.to_string(),
            sort: s.to_string(),
        }
    }

    #[test]
    fn single_segments_ignore_leading_separator() {
        assert_eq!(single("/a/b").segments(), vec!["a", "b"]);
        assert_eq!(single("a/b").segments(), vec!["a", "b"]);
        assert_eq!(single("h2").segments(), vec!["h2"]);
    }

    #[test]
    fn single_ordering_is_segment_wise() {
        assert!(single("/a/b") < single("/a-"));
        assert!(single("/a") < single("/a/b"));
    }

    #[test]
    fn composite_ordering_is_partition_then_sort() {
        assert!(composite("a", "z") < composite("b", "a"));
        assert!(composite("a", "a") < composite("a", "b"));
    }

    #[test]
    fn range_prefix_matches_whole_segments() {
        let range = NativeRange::Prefix(vec!["h1".into()]);
        assert!(range.contains(&composite("h1", "p1")));
        assert!(!range.contains(&composite("h10", "p1")));
        assert!(range.contains(&single("h1/x")));
        assert!(!range.contains(&single("h")));
        assert!(NativeRange::All.contains(&single("/anything")));
    }

    #[test]
    fn display_forms() {
        assert_eq!(single("/other").to_string(), "/other");
        assert_eq!(composite("h1", "p1").to_string(), "(h1, p1)");
        assert_eq!(composite("h1", "p1").partition(), Some("h1"));
        assert!(composite("h1", "p1").is_composite());
    }
}
