//! Store configuration: connection parameters plus the mount layout.
//!
//! Two layouts are understood:
//!
//! - **Standard**: the three-table layout (`providersTable`, `pinsTable`,
//!   `defaultTable`) mounting provider records under `/providers` with a
//!   `ContentHash`/`ProviderID` composite key, pins under `/pins` keyed by
//!   `Hash`, and everything else in a plain default table.
//! - **Explicit**: a `mounts` list of `{prefix, table, partitionKey?,
//!   sortKey?}` entries, one of which must be the root `/`.
//!
//! A [`StoreConfig`] remembers its layout so [`persist_spec`] reproduces the
//! map shape it was resolved from.

use std::collections::{BTreeMap, HashSet};

use kvmount_schema::validate_schema;
use kvmount_store::ConnectionConfig;
use kvmount_types::{Key, KeySchema, SchemaShape};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigValidationError;

pub const PROVIDERS_PREFIX: &str = "/providers";
pub const PINS_PREFIX: &str = "/pins";
pub const ROOT_PREFIX: &str = "/";

pub const PROVIDERS_PARTITION_KEY: &str = "ContentHash";
pub const PROVIDERS_SORT_KEY: &str = "ProviderID";
pub const PINS_PARTITION_KEY: &str = "Hash";

/// Configuration map field names.
pub mod fields {
    pub const ACCESS_KEY: &str = "accessKey";
    pub const SECRET_KEY: &str = "secretKey";
    pub const REGION: &str = "region";
    pub const ENDPOINT: &str = "endpoint";
    pub const PROVIDERS_TABLE: &str = "providersTable";
    pub const PINS_TABLE: &str = "pinsTable";
    pub const DEFAULT_TABLE: &str = "defaultTable";
    pub const MOUNTS: &str = "mounts";
    pub const PREFIX: &str = "prefix";
    pub const TABLE: &str = "table";
    pub const PARTITION_KEY: &str = "partitionKey";
    pub const SORT_KEY: &str = "sortKey";
}

/// One mount as declared in configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountSpec {
    pub prefix: String,
    #[serde(default)]
    pub table: String,
    #[serde(flatten)]
    pub schema: KeySchema,
}

impl MountSpec {
    pub fn new(prefix: impl Into<String>, table: impl Into<String>, schema: KeySchema) -> Self {
        Self {
            prefix: prefix.into(),
            table: table.into(),
            schema,
        }
    }
}

/// Which configuration shape a [`StoreConfig`] came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    Standard,
    Explicit,
}

/// Validated-on-demand store configuration.
///
/// Mounts are kept in registration order; that order decides ties between
/// equal prefixes when routing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub connection: ConnectionConfig,
    pub mounts: Vec<MountSpec>,
    pub layout: Layout,
}

impl StoreConfig {
    /// The standard three-table layout.
    pub fn standard(
        connection: ConnectionConfig,
        providers_table: impl Into<String>,
        pins_table: impl Into<String>,
        default_table: impl Into<String>,
    ) -> Self {
        Self {
            connection,
            mounts: vec![
                MountSpec::new(
                    PROVIDERS_PREFIX,
                    providers_table,
                    KeySchema::composite(PROVIDERS_PARTITION_KEY, PROVIDERS_SORT_KEY),
                ),
                MountSpec::new(PINS_PREFIX, pins_table, KeySchema::partition(PINS_PARTITION_KEY)),
                MountSpec::new(ROOT_PREFIX, default_table, KeySchema::plain()),
            ],
            layout: Layout::Standard,
        }
    }

    /// An explicit mount list.
    pub fn explicit(connection: ConnectionConfig, mounts: Vec<MountSpec>) -> Self {
        Self {
            connection,
            mounts,
            layout: Layout::Explicit,
        }
    }

    /// Check every field, collecting all problems.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let mut problems = self.connection_problems();
        problems.extend(self.mount_problems());
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigValidationError::new(problems))
        }
    }

    pub(crate) fn connection_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.connection.region.trim().is_empty() {
            problems.push(format!("{} must not be empty", fields::REGION));
        }
        if self.connection.endpoint.trim().is_empty() {
            problems.push(format!("{} must not be empty", fields::ENDPOINT));
        }
        if self.connection.access_key.is_empty() != self.connection.secret_key.is_empty() {
            problems.push(format!(
                "{} and {} must be set together",
                fields::ACCESS_KEY,
                fields::SECRET_KEY
            ));
        }
        problems
    }

    pub(crate) fn mount_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();
        let mut has_root = false;
        let mut by_table: BTreeMap<&str, Vec<&MountSpec>> = BTreeMap::new();
        for mount in &self.mounts {
            let label = self.table_field(mount);
            if mount.table.trim().is_empty() {
                problems.push(format!("{label} must not be empty"));
            } else {
                by_table.entry(mount.table.as_str()).or_default().push(mount);
            }
            if let Err(e) = validate_schema(&mount.schema) {
                problems.push(format!("mount {}: {e}", mount.prefix));
            }
            match Key::parse(&mount.prefix) {
                Ok(prefix) => {
                    has_root |= prefix.is_root();
                    if !seen.insert(prefix) {
                        problems.push(format!("duplicate mount prefix {}", mount.prefix));
                    }
                }
                Err(e) => problems.push(format!("mount prefix: {e}")),
            }
        }
        if !has_root {
            problems.push(format!(
                "a default mount with prefix \"{ROOT_PREFIX}\" is required ({})",
                fields::DEFAULT_TABLE
            ));
        }

        // Only plain keys carry their mount prefix, so only plain mounts can
        // tell their records apart inside one table.
        for (table, mounts) in by_table {
            let all_plain = mounts
                .iter()
                .all(|m| m.schema.shape() == Some(SchemaShape::Plain));
            if mounts.len() > 1 && !all_plain {
                let prefixes: Vec<&str> = mounts.iter().map(|m| m.prefix.as_str()).collect();
                problems.push(format!(
                    "table {table} is shared by mounts {}; only mounts without partitionKey/sortKey may share a table",
                    prefixes.join(", ")
                ));
            }
        }
        problems
    }

    /// The configuration field that names `mount`'s table.
    fn table_field(&self, mount: &MountSpec) -> String {
        match (self.layout, mount.prefix.as_str()) {
            (Layout::Standard, PROVIDERS_PREFIX) => fields::PROVIDERS_TABLE.to_string(),
            (Layout::Standard, PINS_PREFIX) => fields::PINS_TABLE.to_string(),
            (Layout::Standard, ROOT_PREFIX) => fields::DEFAULT_TABLE.to_string(),
            _ => format!("mount {}: {}", mount.prefix, fields::TABLE),
        }
    }

    fn table_for(&self, prefix: &str) -> &str {
        self.mounts
            .iter()
            .find(|m| m.prefix == prefix)
            .map(|m| m.table.as_str())
            .unwrap_or_default()
    }
}

/// Serialize a configuration back into the map shape it was resolved from.
pub fn persist_spec(config: &StoreConfig) -> Map<String, Value> {
    let mut map = Map::new();
    let conn = &config.connection;
    map.insert(fields::ACCESS_KEY.into(), Value::from(conn.access_key.clone()));
    map.insert(fields::SECRET_KEY.into(), Value::from(conn.secret_key.clone()));
    map.insert(fields::REGION.into(), Value::from(conn.region.clone()));
    map.insert(fields::ENDPOINT.into(), Value::from(conn.endpoint.clone()));

    match config.layout {
        Layout::Standard => {
            for (field, prefix) in [
                (fields::PROVIDERS_TABLE, PROVIDERS_PREFIX),
                (fields::PINS_TABLE, PINS_PREFIX),
                (fields::DEFAULT_TABLE, ROOT_PREFIX),
            ] {
                map.insert(field.into(), Value::from(config.table_for(prefix)));
            }
        }
        Layout::Explicit => {
            let mounts = config.mounts.iter().map(mount_entry).collect();
            map.insert(fields::MOUNTS.into(), Value::Array(mounts));
        }
    }
    map
}

fn mount_entry(mount: &MountSpec) -> Value {
    let mut entry = Map::new();
    entry.insert(fields::PREFIX.into(), Value::from(mount.prefix.clone()));
    entry.insert(fields::TABLE.into(), Value::from(mount.table.clone()));
    if let Some(partition) = &mount.schema.partition_key {
        entry.insert(fields::PARTITION_KEY.into(), Value::from(partition.clone()));
    }
    if let Some(sort) = &mount.schema.sort_key {
        entry.insert(fields::SORT_KEY.into(), Value::from(sort.clone()));
    }
    Value::Object(entry)
}

/// Like [`persist_spec`], omitting the named fields (e.g. `secretKey`).
pub fn persist_spec_redacted(config: &StoreConfig, redact: &[&str]) -> Map<String, Value> {
    let mut map = persist_spec(config);
    for field in redact {
        map.remove(*field);
    }
    map
}
