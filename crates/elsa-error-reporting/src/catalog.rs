//! Error code catalog and lookup.
//!
//! Maps error codes (like "E-1-2") to their metadata. The catalog is embedded
//! from `error_catalog.json` so that lookups never touch the filesystem.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for an error code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorCodeInfo {
    /// Subsystem name ("meta", "provider", "merge", "schema", "pipeline")
    pub subsystem: String,

    /// Short title for the error
    pub title: String,

    /// Default message used when a diagnostic has no problem statement
    pub message_template: String,

    /// When this error was introduced (version)
    pub since_version: String,
}

/// Global error catalog, loaded lazily from the embedded JSON.
///
/// # Panics
///
/// Panics if the embedded JSON is invalid, which can only happen if the
/// catalog file was edited incorrectly.
pub static ERROR_CATALOG: Lazy<HashMap<String, ErrorCodeInfo>> = Lazy::new(|| {
    let json_data = include_str!("../error_catalog.json");
    serde_json::from_str(json_data).expect("Invalid error catalog JSON")
});

/// Look up error code information.
pub fn get_error_info(code: &str) -> Option<&ErrorCodeInfo> {
    ERROR_CATALOG.get(code)
}

/// Get the subsystem name for an error code.
///
/// ```
/// use elsa_error_reporting::catalog::get_subsystem;
///
/// assert_eq!(get_subsystem("E-3-1"), Some("merge"));
/// ```
pub fn get_subsystem(code: &str) -> Option<&str> {
    ERROR_CATALOG.get(code).map(|info| info.subsystem.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        assert!(!ERROR_CATALOG.is_empty());
    }

    #[test]
    fn test_internal_error_exists() {
        let info = get_error_info("E-0-1").unwrap();
        assert_eq!(info.subsystem, "internal");
        assert_eq!(info.title, "Internal Error");
    }

    #[test]
    fn test_every_code_matches_its_subsystem() {
        for (code, info) in ERROR_CATALOG.iter() {
            let expected = match code.split('-').nth(1) {
                Some("0") => "internal",
                Some("1") => "meta",
                Some("2") => "provider",
                Some("3") => "merge",
                Some("4") => "schema",
                Some("5") => "pipeline",
                other => panic!("unexpected subsystem number {:?} in {}", other, code),
            };
            assert_eq!(info.subsystem, expected, "code {}", code);
        }
    }

    #[test]
    fn test_nonexistent_code() {
        assert!(get_error_info("E-999-999").is_none());
        assert_eq!(get_subsystem("E-999-999"), None);
    }
}
