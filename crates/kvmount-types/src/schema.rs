use serde::{Deserialize, Serialize};

/// Field names of a backend's primary key.
///
/// With no fields the backend stores the full key string in one attribute.
/// With only a partition field the path below the mount prefix becomes the
/// partition value. With both, the two segments below the mount prefix
/// become the partition and sort values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
}

/// The shape a [`KeySchema`] gives to native keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemaShape {
    /// Full key string in a single attribute.
    Plain,
    /// Remaining path as the partition value.
    Partition,
    /// Two remaining segments as partition and sort values.
    PartitionSort,
}

impl KeySchema {
    /// A schema with no declared key fields.
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn partition(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: Some(partition_key.into()),
            sort_key: None,
        }
    }

    pub fn composite(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: Some(partition_key.into()),
            sort_key: Some(sort_key.into()),
        }
    }

    /// Shape of this schema. A sort field without a partition field is
    /// reported as `None`; such a schema cannot encode keys.
    pub fn shape(&self) -> Option<SchemaShape> {
        match (&self.partition_key, &self.sort_key) {
            (None, None) => Some(SchemaShape::Plain),
            (Some(_), None) => Some(SchemaShape::Partition),
            (Some(_), Some(_)) => Some(SchemaShape::PartitionSort),
            (None, Some(_)) => None,
        }
    }
}
