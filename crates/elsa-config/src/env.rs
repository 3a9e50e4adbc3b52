//! Environment variables: the pipeline inputs and the final overlay.
//!
//! A fixed table of well known variables is applied on top of the merged
//! configuration, so a deployment can always override a handful of settings
//! without touching any configuration source. The overlay wins over every
//! provider.

use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use crate::value::ConfigValue;

/// Variable holding the meta configuration string.
pub const META_CONFIG_SOURCES_VAR: &str = "ELSA_DATA_META_CONFIG_SOURCES";

/// Variable holding the search path for `file(...)` sources.
pub const META_CONFIG_FOLDERS_VAR: &str = "ELSA_DATA_META_CONFIG_FOLDERS";

/// Folder searched when [`META_CONFIG_FOLDERS_VAR`] is not set.
pub const DEFAULT_CONFIG_FOLDER: &str = "./config";

/// An immutable copy of the environment.
///
/// Resolution reads variables from a snapshot rather than the live process
/// environment so it can be driven entirely from tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the current process environment. Variables whose name or value
    /// is not valid unicode are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// The configured folder search path, in order.
    ///
    /// Uses the platform path list separator. Empty entries are ignored and
    /// an unset or empty variable falls back to [`DEFAULT_CONFIG_FOLDER`].
    pub fn config_folders(&self) -> Vec<PathBuf> {
        let folders: Vec<PathBuf> = self
            .get(META_CONFIG_FOLDERS_VAR)
            .map(|raw| {
                std::env::split_paths(raw)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();
        if folders.is_empty() {
            vec![PathBuf::from(DEFAULT_CONFIG_FOLDER)]
        } else {
            folders
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EnvSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// How the raw text of an override variable is turned into a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvCoercion {
    String,
    /// Parsed as an integer; unparseable text is kept as a string and left
    /// for validation to reject.
    Integer,
    /// Parsed as JSON5.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvOverride {
    pub variable: &'static str,
    /// Dot-separated destination in the configuration tree.
    pub path: &'static str,
    pub coercion: EnvCoercion,
}

impl EnvOverride {
    pub const fn new(variable: &'static str, path: &'static str, coercion: EnvCoercion) -> Self {
        Self {
            variable,
            path,
            coercion,
        }
    }
}

pub const ENV_OVERRIDES: &[EnvOverride] = &[
    EnvOverride::new(
        "SERVICE_DISCOVERY_NAMESPACE",
        "serviceDiscoveryNamespace",
        EnvCoercion::String,
    ),
    EnvOverride::new("AWS_TEMP_BUCKET", "aws.tempBucket", EnvCoercion::String),
    EnvOverride::new("DEPLOYED_URL", "deployedUrl", EnvCoercion::String),
    EnvOverride::new("HTTP_HOSTING_HOST", "httpHosting.host", EnvCoercion::String),
    EnvOverride::new("HTTP_HOSTING_PORT", "httpHosting.port", EnvCoercion::Integer),
    EnvOverride::new(
        "HTTP_HOSTING_SESSION_SECRET",
        "httpHosting.session.secret",
        EnvCoercion::String,
    ),
    EnvOverride::new(
        "HTTP_HOSTING_SESSION_SALT",
        "httpHosting.session.salt",
        EnvCoercion::String,
    ),
    EnvOverride::new("LOGGER_LEVEL", "logger.level", EnvCoercion::String),
    EnvOverride::new("MAILER_MODE", "mailer.mode", EnvCoercion::String),
    EnvOverride::new("MAILER_OPTIONS", "mailer.options", EnvCoercion::Json),
    EnvOverride::new("MAILER_DEFAULTS", "mailer.defaults", EnvCoercion::Json),
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error("environment variable {variable} does not hold valid JSON: {message}")]
    InvalidJson { variable: String, message: String },
}

impl OverlayError {
    pub fn error_code(&self) -> &'static str {
        "E-5-2"
    }
}

/// Write every override whose variable is set into a copy of `merged`.
///
/// ```
/// use elsa_config::{ConfigValue, EnvSnapshot, ENV_OVERRIDES, apply_env_overlay};
/// use serde_json::json;
///
/// let merged = ConfigValue::from(json!({"httpHosting": {"port": 8000}}));
/// let env = EnvSnapshot::new().with("HTTP_HOSTING_PORT", "9000");
/// let result = apply_env_overlay(&merged, &env, ENV_OVERRIDES).unwrap();
/// assert_eq!(result.to_json(), json!({"httpHosting": {"port": 9000}}));
/// ```
pub fn apply_env_overlay(
    merged: &ConfigValue,
    env: &EnvSnapshot,
    overrides: &[EnvOverride],
) -> Result<ConfigValue, OverlayError> {
    let mut result = merged.clone();
    for entry in overrides {
        let Some(raw) = env.get(entry.variable) else {
            continue;
        };
        let value = coerce(entry, raw)?;
        debug!(variable = entry.variable, path = entry.path, "applying environment override");
        result.set_dotted(entry.path, value);
    }
    Ok(result)
}

fn coerce(entry: &EnvOverride, raw: &str) -> Result<ConfigValue, OverlayError> {
    match entry.coercion {
        EnvCoercion::String => Ok(ConfigValue::from(raw)),
        EnvCoercion::Integer => match raw.trim().parse::<i64>() {
            Ok(i) => Ok(ConfigValue::Integer(i)),
            Err(_) => {
                warn!(
                    variable = entry.variable,
                    "environment override is not an integer; keeping it as text"
                );
                Ok(ConfigValue::from(raw))
            }
        },
        EnvCoercion::Json => {
            ConfigValue::from_json5(raw).map_err(|e| OverlayError::InvalidJson {
                variable: entry.variable.to_string(),
                message: e.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_overlay_wins_and_creates_maps() {
        let merged = ConfigValue::from(json!({
            "httpHosting": {"port": 8000, "host": "127.0.0.1"},
            "mailer": "legacy"
        }));
        let env = EnvSnapshot::new()
            .with("HTTP_HOSTING_PORT", " 8080 ")
            .with("HTTP_HOSTING_SESSION_SECRET", "s3cret")
            .with("MAILER_OPTIONS", "{region: 'ap-southeast-2'}")
            .with("AWS_TEMP_BUCKET", "tmp-bucket")
            .with("UNRELATED", "x");

        let result = apply_env_overlay(&merged, &env, ENV_OVERRIDES).unwrap();
        assert_eq!(
            result.to_json(),
            json!({
                "httpHosting": {
                    "port": 8080,
                    "host": "127.0.0.1",
                    "session": {"secret": "s3cret"}
                },
                "mailer": {"options": {"region": "ap-southeast-2"}},
                "aws": {"tempBucket": "tmp-bucket"}
            })
        );
        // input untouched
        assert_eq!(merged.get_path(&["httpHosting", "port"]), Some(&ConfigValue::Integer(8000)));
    }

    #[test]
    fn test_overlay_keeps_non_integer_text() {
        let env = EnvSnapshot::new().with("HTTP_HOSTING_PORT", "eighty");
        let result = apply_env_overlay(&ConfigValue::empty_map(), &env, ENV_OVERRIDES).unwrap();
        assert_eq!(
            result.get_path(&["httpHosting", "port"]),
            Some(&ConfigValue::from("eighty"))
        );
    }

    #[test]
    fn test_overlay_rejects_bad_json() {
        let env = EnvSnapshot::new().with("MAILER_DEFAULTS", "{from:");
        let err = apply_env_overlay(&ConfigValue::empty_map(), &env, ENV_OVERRIDES).unwrap_err();
        assert!(matches!(err, OverlayError::InvalidJson { ref variable, .. } if variable == "MAILER_DEFAULTS"));
    }

    #[test]
    fn test_overlay_without_variables_is_identity() {
        let merged = ConfigValue::from(json!({"a": 1}));
        let result = apply_env_overlay(&merged, &EnvSnapshot::new(), ENV_OVERRIDES).unwrap();
        assert_eq!(result, merged);
    }

    #[test]
    fn test_config_folders_from_environment() {
        let env = EnvSnapshot::new();
        assert_eq!(env.config_folders(), vec![PathBuf::from("./config")]);

        let joined = std::env::join_paths(["/srv/a", "", "/srv/b"]).unwrap();
        let env = EnvSnapshot::new().with(META_CONFIG_FOLDERS_VAR, joined.to_str().unwrap());
        assert_eq!(
            env.config_folders(),
            vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
        );
    }
}
