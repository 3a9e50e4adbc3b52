//! Layered merging of configuration fragments.
//!
//! Fragments are folded left to right: each incoming fragment is merged into
//! the accumulated result and wins wherever the two disagree. On top of a
//! plain deep merge, incoming top-level keys can carry directives:
//!
//! - **Special arrays** (`datasets`, `dacs`, `superAdmins` by default) can be
//!   replaced (`datasets`), extended (`+datasets`) or pruned (`-datasets`).
//!   Pruning removes every entry whose `id`, `uri`, `name` or `sub` matches
//!   one of the given values, and fails when a value matches nothing.
//! - **Path keys** are keys that are not purely alphanumeric. They are read
//!   as path expressions (see [`crate::path_query`]) that must select exactly
//!   one existing scalar, which is then replaced.
//!
//! Everything else deep merges: maps merge key by key, and any other value
//! (arrays included) replaces what was there.
//!
//! # Example
//!
//! ```
//! use elsa_config::{ConfigValue, MergeOptions, merge};
//! use serde_json::json;
//!
//! let base = ConfigValue::from(json!({"datasets": [{"uri": "a"}, {"uri": "b"}]}));
//! let dev = ConfigValue::from(json!({"+datasets": [{"uri": "c"}], "-datasets": ["a"]}));
//!
//! let merged = merge(&base, &dev, &MergeOptions::default()).unwrap();
//! assert_eq!(merged.to_json(), json!({"datasets": [{"uri": "b"}, {"uri": "c"}]}));
//! ```

use indexmap::IndexMap;
use thiserror::Error;
use tracing::trace;

use crate::issue::InstancePath;
use crate::path_query::{PathQuery, PathQueryError};
use crate::value::ConfigValue;

pub const DEFAULT_SPECIAL_ARRAY_KEYS: [&str; 3] = ["datasets", "dacs", "superAdmins"];

/// Fields compared by a `-<array>` deletion, in order.
pub const IDENTITY_FIELDS: [&str; 4] = ["id", "uri", "name", "sub"];

/// Options for merging.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Top-level keys that accept the replace / `+` / `-` directives.
    pub special_array_keys: Vec<String>,

    /// Maximum map nesting depth (default: 64).
    pub max_depth: usize,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            special_array_keys: DEFAULT_SPECIAL_ARRAY_KEYS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_depth: 64,
        }
    }
}

impl MergeOptions {
    pub fn with_special_array_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.special_array_keys = keys.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MergeError {
    #[error("a configuration fragment must be an object, not {found}")]
    NotAnObject { found: &'static str },

    #[error("'{array}' replaces the whole array and cannot be combined with '{directive}'")]
    ConflictingDirectives { array: String, directive: String },

    #[error("'{key}' must be {expected}, but found {found}")]
    InvalidDirective {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("'-{array}' value {value} does not match the {fields} of any entry")]
    DeletionNotFound {
        array: String,
        value: String,
        fields: String,
    },

    #[error("path '{key}' did not match any existing setting")]
    PathMatchedNothing { key: String },

    #[error("path '{key}' matched {count} settings but must match exactly one")]
    PathAmbiguous { key: String, count: usize },

    #[error("path '{key}' selects {target}, which is {found} rather than a string, number or null")]
    PathTargetNotScalar {
        key: String,
        target: String,
        found: &'static str,
    },

    #[error("path '{key}' can only set a string, number or null, not {found}")]
    PathValueNotScalar { key: String, found: &'static str },

    #[error(transparent)]
    InvalidPath(#[from] PathQueryError),

    #[error("configuration nesting exceeds {max_depth} levels at '{path}'")]
    NestingTooDeep { max_depth: usize, path: String },
}

impl MergeError {
    pub fn error_code(&self) -> &'static str {
        match self {
            MergeError::ConflictingDirectives { .. } => "E-3-1",
            MergeError::NotAnObject { .. }
            | MergeError::InvalidDirective { .. }
            | MergeError::NestingTooDeep { .. } => "E-3-2",
            MergeError::DeletionNotFound { .. } => "E-3-3",
            MergeError::PathMatchedNothing { .. } => "E-3-4",
            MergeError::PathAmbiguous { .. } => "E-3-5",
            MergeError::PathTargetNotScalar { .. } => "E-3-6",
            MergeError::PathValueNotScalar { .. } => "E-3-7",
            MergeError::InvalidPath(_) => "E-3-8",
        }
    }
}

/// Merge `incoming` into `accumulated`, returning the new tree.
///
/// Neither input is modified. An `accumulated` value that is not a map is
/// treated as empty.
pub fn merge(
    accumulated: &ConfigValue,
    incoming: &ConfigValue,
    options: &MergeOptions,
) -> Result<ConfigValue, MergeError> {
    let ConfigValue::Map(incoming) = incoming else {
        return Err(MergeError::NotAnObject {
            found: incoming.type_name(),
        });
    };

    let mut result = match accumulated {
        ConfigValue::Map(map) => map.clone(),
        _ => IndexMap::new(),
    };
    let mut remaining = incoming.clone();

    for array in &options.special_array_keys {
        apply_array_directives(&mut result, &mut remaining, array)?;
    }

    let (path_keys, plain): (Vec<_>, Vec<_>) =
        remaining.into_iter().partition(|(key, _)| is_path_key(key));

    let mut root = ConfigValue::Map(result);
    for (key, value) in path_keys {
        replace_at_path(&mut root, &key, value)?;
    }

    if let ConfigValue::Map(result) = &mut root {
        let mut path = InstancePath::new();
        for (key, value) in plain {
            path.push_key(key.clone());
            deep_merge_into(result, key, value, &mut path, options.max_depth)?;
            path.pop();
        }
    }
    Ok(root)
}

/// Fold fragments in order, starting from an empty map.
pub fn merge_all<'a>(
    fragments: impl IntoIterator<Item = &'a ConfigValue>,
    options: &MergeOptions,
) -> Result<ConfigValue, MergeError> {
    fragments
        .into_iter()
        .try_fold(ConfigValue::empty_map(), |acc, fragment| {
            merge(&acc, fragment, options)
        })
}

/// True when a top-level key is a path expression rather than a plain key.
pub fn is_path_key(key: &str) -> bool {
    key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric())
}

fn apply_array_directives(
    result: &mut IndexMap<String, ConfigValue>,
    incoming: &mut IndexMap<String, ConfigValue>,
    array: &str,
) -> Result<(), MergeError> {
    let add_key = format!("+{}", array);
    let delete_key = format!("-{}", array);

    if let Some(replacement) = incoming.shift_remove(array) {
        for directive in [&add_key, &delete_key] {
            if incoming.contains_key(directive) {
                return Err(MergeError::ConflictingDirectives {
                    array: array.to_string(),
                    directive: directive.clone(),
                });
            }
        }
        let items = expect_array(array, replacement)?;
        trace!(array, count = items.len(), "replacing special array");
        result.insert(array.to_string(), ConfigValue::Array(items));
        return Ok(());
    }

    if let Some(additions) = incoming.shift_remove(&add_key) {
        let additions = expect_array(&add_key, additions)?;
        let existing = result
            .entry(array.to_string())
            .or_insert_with(|| ConfigValue::Array(Vec::new()));
        match existing {
            ConfigValue::Array(items) => {
                trace!(array, count = additions.len(), "appending to special array");
                items.extend(additions);
            }
            other => {
                return Err(MergeError::InvalidDirective {
                    key: add_key,
                    expected: "applied to an array",
                    found: other.type_name(),
                });
            }
        }
    }

    if let Some(deletions) = incoming.shift_remove(&delete_key) {
        let deletions = match deletions {
            ConfigValue::Array(values) => values,
            single if single.is_scalar() => vec![single],
            other => {
                return Err(MergeError::InvalidDirective {
                    key: delete_key,
                    expected: "an array of identifiers",
                    found: other.type_name(),
                });
            }
        };
        if let Some(bad) = deletions.iter().find(|v| !v.is_scalar()) {
            return Err(MergeError::InvalidDirective {
                key: delete_key,
                expected: "an array of identifiers",
                found: bad.type_name(),
            });
        }

        let mut empty = Vec::new();
        let items = match result.get_mut(array) {
            Some(ConfigValue::Array(items)) => items,
            Some(other) => {
                return Err(MergeError::InvalidDirective {
                    key: delete_key,
                    expected: "applied to an array",
                    found: other.type_name(),
                });
            }
            None => &mut empty,
        };
        for value in &deletions {
            let before = items.len();
            items.retain(|item| !matches_identity(item, value));
            if items.len() == before {
                return Err(MergeError::DeletionNotFound {
                    array: array.to_string(),
                    value: value.to_string(),
                    fields: IDENTITY_FIELDS.join("/"),
                });
            }
        }
    }

    Ok(())
}

fn expect_array(key: &str, value: ConfigValue) -> Result<Vec<ConfigValue>, MergeError> {
    match value {
        ConfigValue::Array(items) => Ok(items),
        other => Err(MergeError::InvalidDirective {
            key: key.to_string(),
            expected: "an array",
            found: other.type_name(),
        }),
    }
}

fn matches_identity(item: &ConfigValue, value: &ConfigValue) -> bool {
    IDENTITY_FIELDS
        .iter()
        .any(|field| item.get(field) == Some(value))
}

fn replace_at_path(root: &mut ConfigValue, key: &str, value: ConfigValue) -> Result<(), MergeError> {
    if !value.is_plain_scalar() {
        return Err(MergeError::PathValueNotScalar {
            key: key.to_string(),
            found: value.type_name(),
        });
    }

    let query = PathQuery::parse(key)?;
    let mut locations = query.select(root);
    let location = match locations.len() {
        0 => {
            return Err(MergeError::PathMatchedNothing {
                key: key.to_string(),
            });
        }
        1 => locations.remove(0),
        count => {
            return Err(MergeError::PathAmbiguous {
                key: key.to_string(),
                count,
            });
        }
    };

    let target_path = InstancePath::from(location.clone()).to_string();
    if location.is_empty() {
        return Err(MergeError::PathTargetNotScalar {
            key: key.to_string(),
            target: target_path,
            found: root.type_name(),
        });
    }
    let Some(target) = root.pointer_mut(&location) else {
        return Err(MergeError::PathMatchedNothing {
            key: key.to_string(),
        });
    };
    if !target.is_plain_scalar() {
        return Err(MergeError::PathTargetNotScalar {
            key: key.to_string(),
            target: target_path,
            found: target.type_name(),
        });
    }
    trace!(path = key, target = %target_path, "replacing scalar by path");
    *target = value;
    Ok(())
}

fn deep_merge_into(
    target: &mut IndexMap<String, ConfigValue>,
    key: String,
    incoming: ConfigValue,
    path: &mut InstancePath,
    max_depth: usize,
) -> Result<(), MergeError> {
    if path.len() > max_depth {
        return Err(MergeError::NestingTooDeep {
            max_depth,
            path: path.to_string(),
        });
    }
    match (target.get_mut(&key), incoming) {
        (Some(ConfigValue::Map(existing)), ConfigValue::Map(incoming)) => {
            for (child_key, child_value) in incoming {
                path.push_key(child_key.clone());
                deep_merge_into(existing, child_key, child_value, path, max_depth)?;
                path.pop();
            }
        }
        (_, incoming) => {
            target.insert(key, incoming);
        }
    }
    Ok(())
}
