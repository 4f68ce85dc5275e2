//! Resolve a raw configuration map into a [`StoreConfig`].

use kvmount_store::ConnectionConfig;
use serde_json::{Map, Value};

use crate::config::{fields, MountSpec, StoreConfig};
use crate::error::ConfigValidationError;

/// Build and validate a [`StoreConfig`] from a configuration map.
///
/// A map with a `mounts` list resolves to the explicit layout; otherwise the
/// standard `providersTable`/`pinsTable`/`defaultTable` layout is assumed.
/// Type errors and validation problems are reported together.
pub fn resolve_config(map: &Map<String, Value>) -> Result<StoreConfig, ConfigValidationError> {
    let mut reader = FieldReader::new(map);

    let connection = ConnectionConfig {
        access_key: reader.string(fields::ACCESS_KEY),
        secret_key: reader.string(fields::SECRET_KEY),
        region: reader.string(fields::REGION),
        endpoint: reader.string(fields::ENDPOINT),
    };

    let config = match map.get(fields::MOUNTS) {
        Some(mounts) => {
            for field in [fields::PROVIDERS_TABLE, fields::PINS_TABLE, fields::DEFAULT_TABLE] {
                if map.contains_key(field) {
                    reader.problems.push(format!(
                        "{field} cannot be combined with {}; declare the mount explicitly",
                        fields::MOUNTS
                    ));
                }
            }
            let mounts = match serde_json::from_value::<Vec<MountSpec>>(mounts.clone()) {
                Ok(mounts) => mounts,
                Err(e) => {
                    reader.fail(fields::MOUNTS, format!("{}: {e}", fields::MOUNTS));
                    Vec::new()
                }
            };
            StoreConfig::explicit(connection, mounts)
        }
        None => StoreConfig::standard(
            connection,
            reader.string(fields::PROVIDERS_TABLE),
            reader.string(fields::PINS_TABLE),
            reader.string(fields::DEFAULT_TABLE),
        ),
    };

    // Fields that failed to parse are already reported; their empty
    // placeholders must not be reported again.
    let FieldReader {
        mut problems,
        failed,
        ..
    } = reader;
    let unparsed = |problem: &String| failed.iter().any(|field| problem.starts_with(field));
    problems.extend(config.connection_problems().into_iter().filter(|p| !unparsed(p)));
    if !failed.contains(&fields::MOUNTS) {
        problems.extend(config.mount_problems().into_iter().filter(|p| !unparsed(p)));
    }

    if problems.is_empty() {
        Ok(config)
    } else {
        Err(ConfigValidationError::new(problems))
    }
}

/// Reads typed fields out of a configuration map, remembering failures.
struct FieldReader<'a> {
    map: &'a Map<String, Value>,
    problems: Vec<String>,
    failed: Vec<&'static str>,
}

impl<'a> FieldReader<'a> {
    fn new(map: &'a Map<String, Value>) -> Self {
        Self {
            map,
            problems: Vec::new(),
            failed: Vec::new(),
        }
    }

    fn fail(&mut self, field: &'static str, problem: String) {
        self.failed.push(field);
        self.problems.push(problem);
    }

    /// An optional string field; absent means empty.
    fn string(&mut self, field: &'static str) -> String {
        match self.map.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                self.fail(field, format!("{field} must be a string, got {other}"));
                String::new()
            }
        }
    }
}
