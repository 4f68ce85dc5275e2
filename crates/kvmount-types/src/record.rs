use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::key::Key;

/// A stored value addressed by its hierarchical key.
///
/// Records carry no version or expiry; whichever backend holds the key owns
/// the record's lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: Key,
    pub value: Bytes,
}

impl Record {
    pub fn new(key: Key, value: impl Into<Bytes>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}
