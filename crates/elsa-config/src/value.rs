//! The configuration value tree.
//!
//! Every provider produces a [`ConfigValue`], the merge engine folds them
//! together and the validator walks the result. Maps keep insertion order so
//! that redacted dumps list settings in the order they were authored.

use indexmap::IndexMap;
use std::fmt;

use crate::issue::PathSegment;

/// A JSON-shaped configuration value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ConfigValue {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<ConfigValue>),
    Map(IndexMap<String, ConfigValue>),
}

impl ConfigValue {
    /// An empty map, the starting point of every merge.
    pub fn empty_map() -> Self {
        ConfigValue::Map(IndexMap::new())
    }

    /// Parse JSON5 text into a value tree.
    pub fn from_json5(text: &str) -> Result<Self, json5::Error> {
        let json: serde_json::Value = json5::from_str(text)?;
        Ok(ConfigValue::from(json))
    }

    /// Human readable type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Null => "null",
            ConfigValue::Bool(_) => "boolean",
            ConfigValue::Integer(_) => "integer",
            ConfigValue::Float(_) => "number",
            ConfigValue::String(_) => "string",
            ConfigValue::Array(_) => "array",
            ConfigValue::Map(_) => "object",
        }
    }

    /// True for strings, numbers and null.
    ///
    /// Booleans are deliberately excluded: only these kinds may be the
    /// target or the payload of a path replacement.
    pub fn is_plain_scalar(&self) -> bool {
        matches!(
            self,
            ConfigValue::Null
                | ConfigValue::Integer(_)
                | ConfigValue::Float(_)
                | ConfigValue::String(_)
        )
    }

    /// True for anything that is not an array or a map.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, ConfigValue::Array(_) | ConfigValue::Map(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ConfigValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, ConfigValue>> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut IndexMap<String, ConfigValue>> {
        match self {
            ConfigValue::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<ConfigValue>> {
        match self {
            ConfigValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Look up a direct child of a map.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Follow a sequence of map keys.
    ///
    /// ```
    /// use elsa_config::ConfigValue;
    /// use serde_json::json;
    ///
    /// let value = ConfigValue::from(json!({"httpHosting": {"port": 8000}}));
    /// assert_eq!(
    ///     value.get_path(&["httpHosting", "port"]),
    ///     Some(&ConfigValue::Integer(8000))
    /// );
    /// ```
    pub fn get_path(&self, keys: &[&str]) -> Option<&ConfigValue> {
        keys.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Resolve a normalized location (as produced by a path query).
    pub fn pointer(&self, segments: &[PathSegment]) -> Option<&ConfigValue> {
        segments.iter().try_fold(self, |node, segment| match (node, segment) {
            (ConfigValue::Map(m), PathSegment::Key(k)) => m.get(k),
            (ConfigValue::Array(a), PathSegment::Index(i)) => a.get(*i),
            _ => None,
        })
    }

    pub fn pointer_mut(&mut self, segments: &[PathSegment]) -> Option<&mut ConfigValue> {
        let mut node = self;
        for segment in segments {
            node = match (node, segment) {
                (ConfigValue::Map(m), PathSegment::Key(k)) => m.get_mut(k)?,
                (ConfigValue::Array(a), PathSegment::Index(i)) => a.get_mut(*i)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Set the value at a dot-separated path, creating intermediate maps.
    ///
    /// Anything other than a map found along the way is replaced by a new map.
    /// A non-map root is replaced as well.
    pub fn set_dotted(&mut self, path: &str, value: ConfigValue) {
        let mut node = self;
        let mut keys = path.split('.').peekable();
        while let Some(key) = keys.next() {
            if !matches!(node, ConfigValue::Map(_)) {
                *node = ConfigValue::empty_map();
            }
            let ConfigValue::Map(map) = node else {
                return;
            };
            if keys.peek().is_none() {
                map.insert(key.to_string(), value);
                return;
            }
            node = map
                .entry(key.to_string())
                .or_insert_with(ConfigValue::empty_map);
        }
    }

    /// Convert to a `serde_json::Value`. Non-finite floats become null.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            ConfigValue::Null => Value::Null,
            ConfigValue::Bool(b) => Value::Bool(*b),
            ConfigValue::Integer(i) => Value::from(*i),
            ConfigValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            ConfigValue::String(s) => Value::String(s.clone()),
            ConfigValue::Array(items) => Value::Array(items.iter().map(|v| v.to_json()).collect()),
            ConfigValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for ConfigValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => ConfigValue::Null,
            Value::Bool(b) => ConfigValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ConfigValue::Integer(i),
                None => ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => ConfigValue::String(s),
            Value::Array(items) => {
                ConfigValue::Array(items.into_iter().map(ConfigValue::from).collect())
            }
            Value::Object(map) => ConfigValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, ConfigValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::String(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::String(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Integer(i)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<IndexMap<String, ConfigValue>> for ConfigValue {
    fn from(map: IndexMap<String, ConfigValue>) -> Self {
        ConfigValue::Map(map)
    }
}

/// Compact JSON rendering, used in log lines and error messages.
impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::String(s) => write!(f, "'{}'", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_conversion_preserves_order_and_kinds() {
        let value = ConfigValue::from(json!({
            "z": 1,
            "a": 1.5,
            "m": [true, null, "s"]
        }));
        let keys: Vec<_> = value.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(value.get("z"), Some(&ConfigValue::Integer(1)));
        assert_eq!(value.get("a"), Some(&ConfigValue::Float(1.5)));
        assert_eq!(value.to_json(), json!({"z": 1, "a": 1.5, "m": [true, null, "s"]}));
    }

    #[test]
    fn test_from_json5_keeps_authored_key_order() {
        let value = ConfigValue::from_json5("{ zebra: 1, apple: { y: 2, b: 3 }, mango: 4 }").unwrap();
        let keys: Vec<_> = value.as_map().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["zebra", "apple", "mango"]);
        let inner: Vec<_> = value.get("apple").unwrap().as_map().unwrap().keys().cloned().collect();
        assert_eq!(inner, vec!["y", "b"]);
    }

    #[test]
    fn test_from_json5_accepts_comments_and_unquoted_keys() {
        let value = ConfigValue::from_json5(
            "{\n  // the port\n  httpHosting: { port: 8000, },\n  name: 'elsa',\n}",
        )
        .unwrap();
        assert_eq!(
            value.get_path(&["httpHosting", "port"]),
            Some(&ConfigValue::Integer(8000))
        );
        assert_eq!(value.get("name").and_then(|v| v.as_str()), Some("elsa"));
    }

    #[test]
    fn test_from_json5_rejects_garbage() {
        assert!(ConfigValue::from_json5("{ not json").is_err());
    }

    #[test]
    fn test_set_dotted_creates_and_replaces_intermediates() {
        let mut value = ConfigValue::from(json!({"mailer": "SES", "other": 1}));
        value.set_dotted("mailer.options.region", ConfigValue::from("ap-southeast-2"));
        value.set_dotted("httpHosting.port", ConfigValue::Integer(9000));
        assert_eq!(
            value.to_json(),
            json!({
                "mailer": {"options": {"region": "ap-southeast-2"}},
                "other": 1,
                "httpHosting": {"port": 9000}
            })
        );
    }

    #[test]
    fn test_pointer_follows_keys_and_indexes() {
        let mut value = ConfigValue::from(json!({"datasets": [{"uri": "a"}, {"uri": "b"}]}));
        let location = vec![
            PathSegment::Key("datasets".into()),
            PathSegment::Index(1),
            PathSegment::Key("uri".into()),
        ];
        assert_eq!(value.pointer(&location), Some(&ConfigValue::from("b")));
        *value.pointer_mut(&location).unwrap() = ConfigValue::from("c");
        assert_eq!(value.get_path(&["datasets"]).unwrap().to_json(), json!([{"uri": "a"}, {"uri": "c"}]));
        assert!(value.pointer(&[PathSegment::Index(0)]).is_none());
    }

    #[test]
    fn test_plain_scalar_excludes_booleans() {
        assert!(ConfigValue::Null.is_plain_scalar());
        assert!(ConfigValue::from("x").is_plain_scalar());
        assert!(ConfigValue::Float(1.0).is_plain_scalar());
        assert!(!ConfigValue::Bool(true).is_plain_scalar());
        assert!(ConfigValue::Bool(true).is_scalar());
        assert!(!ConfigValue::empty_map().is_scalar());
    }
}
