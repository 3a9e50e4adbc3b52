//! Redaction of secrets before a configuration is displayed or logged.
//!
//! A validated configuration knows exactly which paths are sensitive, so
//! [`redact_paths`] is used for it. Trees that never made it through
//! validation (for example when showing the merged input of a failed
//! resolution) fall back to [`redact_by_keywords`].

use crate::issue::InstancePath;
use crate::value::ConfigValue;

/// Replacement text for every redacted value.
pub const REDACTED: &str = "[redacted]";

/// Key fragments that mark a setting as secret.
pub const SENSITIVE_KEYWORDS: [&str; 6] =
    ["secret", "salt", "key", "password", "token", "credential"];

/// True when a key's name suggests it holds a secret.
pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_KEYWORDS.iter().any(|word| key.contains(word))
}

/// Copy of `value` with every sensitive-looking key's value replaced.
pub fn redact_by_keywords(value: &ConfigValue) -> ConfigValue {
    match value {
        ConfigValue::Map(map) => ConfigValue::Map(
            map.iter()
                .map(|(key, v)| {
                    let v = if is_sensitive_key(key) {
                        ConfigValue::from(REDACTED)
                    } else {
                        redact_by_keywords(v)
                    };
                    (key.clone(), v)
                })
                .collect(),
        ),
        ConfigValue::Array(items) => ConfigValue::Array(items.iter().map(redact_by_keywords).collect()),
        other => other.clone(),
    }
}

/// Copy of `value` with the value at each of `paths` replaced. Paths that do
/// not exist are ignored.
pub fn redact_paths(value: &ConfigValue, paths: &[InstancePath]) -> ConfigValue {
    let mut redacted = value.clone();
    for path in paths {
        if let Some(slot) = redacted.pointer_mut(path.segments()) {
            *slot = ConfigValue::from(REDACTED);
        }
    }
    redacted
}
