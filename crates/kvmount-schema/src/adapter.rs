//! Translation between hierarchical keys and a backend's native keys.
//!
//! Encoding rules, by schema shape:
//! - Plain: the full key string, mount prefix included, in one attribute
//! - Partition: the path below the mount prefix, joined with `/`
//! - Partition + sort: exactly two segments below the mount prefix
//!
//! `decode(encode(k)) == k` for every key the schema accepts. Keys are never
//! truncated or padded to fit a shape; a mismatch is a [`SchemaError`].

use kvmount_types::{validate_segment, Key, KeySchema, NativeKey, NativeRange, SchemaShape, SEPARATOR};

use crate::error::{Result, SchemaError};

/// Per-mount key translator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySchemaAdapter {
    prefix: Key,
    schema: KeySchema,
    shape: SchemaShape,
}

impl KeySchemaAdapter {
    /// Build an adapter for keys under `prefix`.
    pub fn new(prefix: Key, schema: KeySchema) -> Result<Self> {
        validate_schema(&schema)?;
        let shape = schema
            .shape()
            .ok_or_else(|| SchemaError::InvalidSchema("sort key requires a partition key".into()))?;
        Ok(Self {
            prefix,
            schema,
            shape,
        })
    }

    pub fn prefix(&self) -> &Key {
        &self.prefix
    }

    pub fn schema(&self) -> &KeySchema {
        &self.schema
    }

    pub fn shape(&self) -> SchemaShape {
        self.shape
    }

    /// Encode `key` into this backend's native form.
    pub fn encode(&self, key: &Key) -> Result<NativeKey> {
        let remaining = key
            .strip_prefix(&self.prefix)
            .ok_or_else(|| encode_error(key, format!("not under mount prefix {}", self.prefix)))?;

        match self.shape {
            SchemaShape::Plain => Ok(NativeKey::Single(key.to_string())),
            SchemaShape::Partition => {
                if remaining.is_empty() {
                    return Err(encode_error(
                        key,
                        "partition schema needs at least one segment below the mount prefix",
                    ));
                }
                Ok(NativeKey::Single(remaining.join("/")))
            }
            SchemaShape::PartitionSort => match remaining {
                [partition, sort] => Ok(NativeKey::Composite {
                    partition: partition.clone(),
                    sort: sort.clone(),
                }),
                _ => Err(encode_error(
                    key,
                    format!(
                        "partition+sort schema needs exactly two segments below the mount prefix, found {}",
                        remaining.len()
                    ),
                )),
            },
        }
    }

    /// Decode a native key read back from this backend.
    pub fn decode(&self, native: &NativeKey) -> Result<Key> {
        match (self.shape, native) {
            (SchemaShape::Plain, NativeKey::Single(value)) => {
                let key = Key::parse(value).map_err(|e| decode_error(native, e.to_string()))?;
                if !key.starts_with(&self.prefix) {
                    return Err(decode_error(
                        native,
                        format!("not under mount prefix {}", self.prefix),
                    ));
                }
                Ok(key)
            }
            (SchemaShape::Partition, NativeKey::Single(value)) => {
                let segments: Vec<&str> = value.split(SEPARATOR).collect();
                self.prefix
                    .join(&segments)
                    .map_err(|e| decode_error(native, e.to_string()))
            }
            (SchemaShape::PartitionSort, NativeKey::Composite { partition, sort }) => {
                for value in [partition, sort] {
                    validate_segment(value).map_err(|e| decode_error(native, e.to_string()))?;
                }
                self.prefix
                    .join(&[partition, sort])
                    .map_err(|e| decode_error(native, e.to_string()))
            }
            (shape, _) => Err(decode_error(
                native,
                format!("native key shape does not match {shape:?} schema"),
            )),
        }
    }

    /// The native selection of this mount's records under `query`.
    ///
    /// Returns `None` when no key under `query` can live in this mount.
    pub fn scan_range(&self, query: &Key) -> Option<NativeRange> {
        if let Some(remaining) = query.strip_prefix(&self.prefix) {
            let segments = match self.shape {
                SchemaShape::Plain => query.segments(),
                SchemaShape::Partition | SchemaShape::PartitionSort => remaining,
            };
            return Some(range_of(segments));
        }
        if self.prefix.starts_with(query) {
            return Some(match self.shape {
                SchemaShape::Plain => range_of(self.prefix.segments()),
                SchemaShape::Partition | SchemaShape::PartitionSort => NativeRange::All,
            });
        }
        None
    }
}

fn range_of(segments: &[String]) -> NativeRange {
    if segments.is_empty() {
        NativeRange::All
    } else {
        NativeRange::Prefix(segments.to_vec())
    }
}

/// Check field names of a schema descriptor.
pub fn validate_schema(schema: &KeySchema) -> Result<()> {
    if schema.shape().is_none() {
        return Err(SchemaError::InvalidSchema(
            "sort key requires a partition key".into(),
        ));
    }
    for field in [&schema.partition_key, &schema.sort_key].into_iter().flatten() {
        if field.trim().is_empty() {
            return Err(SchemaError::InvalidSchema(
                "key field names must not be empty".into(),
            ));
        }
    }
    if let (Some(partition), Some(sort)) = (&schema.partition_key, &schema.sort_key) {
        if partition == sort {
            return Err(SchemaError::InvalidSchema(format!(
                "partition and sort key must differ, both are {partition:?}"
            )));
        }
    }
    Ok(())
}

fn encode_error(key: &Key, reason: impl Into<String>) -> SchemaError {
    SchemaError::KeyEncoding {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn decode_error(native: &NativeKey, reason: impl Into<String>) -> SchemaError {
    SchemaError::KeyDecoding {
        native: native.to_string(),
        reason: reason.into(),
    }
}
