//! Validation of configuration trees against a [`Schema`].

use indexmap::IndexMap;
use regex::Regex;
use std::collections::HashMap;
use std::net::IpAddr;
use tracing::debug;

use super::types::{
    ArraySchema, EnumSchema, IntegerSchema, ObjectSchema, Schema, StringFormat, StringSchema,
    UnionSchema,
};
use crate::issue::{ConfigIssue, InstancePath, IssueKind, PathSegment};
use crate::value::ConfigValue;

/// A value that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    /// The input with coercions and defaults applied and unknown keys
    /// removed.
    pub value: ConfigValue,
    /// Every location that holds a sensitive setting.
    pub sensitive_paths: Vec<InstancePath>,
}

/// Validate `value` against `schema`, reporting every issue found.
///
/// ```
/// use elsa_config::ConfigValue;
/// use elsa_config::schema::{validate, ObjectSchema, Property, Schema};
/// use serde_json::json;
///
/// let schema = Schema::object(
///     ObjectSchema::new().property("port", Property::required(Schema::integer())),
/// );
/// let validated = validate(&ConfigValue::from(json!({"port": "8000"})), &schema).unwrap();
/// assert_eq!(validated.value.to_json(), json!({"port": 8000}));
/// ```
pub fn validate(value: &ConfigValue, schema: &Schema) -> Result<Validated, Vec<ConfigIssue>> {
    let mut context = ValidationContext::new();
    let result = validate_generic(value, schema, &mut context);
    match result {
        Some(value) if !context.has_issues() => Ok(Validated {
            value,
            sensitive_paths: context.sensitive_paths,
        }),
        _ => Err(context.issues),
    }
}

/// Validation context tracks state during validation
#[derive(Debug, Default)]
pub struct ValidationContext {
    instance_path: InstancePath,
    issues: Vec<ConfigIssue>,
    sensitive_paths: Vec<InstancePath>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_issue(&mut self, kind: IssueKind, message: impl Into<String>) {
        self.issues
            .push(ConfigIssue::new(kind, self.instance_path.clone(), message));
    }

    /// Execute a function with a new instance path segment
    pub fn with_instance_path<F, R>(&mut self, segment: PathSegment, f: F) -> R
    where
        F: FnOnce(&mut Self) -> R,
    {
        match segment {
            PathSegment::Key(key) => self.instance_path.push_key(key),
            PathSegment::Index(index) => self.instance_path.push_index(index),
        }
        let result = f(self);
        self.instance_path.pop();
        result
    }

    pub fn issues(&self) -> &[ConfigIssue] {
        &self.issues
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    fn type_mismatch(&mut self, expected: &str, value: &ConfigValue) {
        self.add_issue(
            IssueKind::WrongType,
            format!("expected {}, got {}", expected, value.type_name()),
        );
    }
}

/// Main validation dispatcher. Returns `None` when the value is unusable;
/// the reason is recorded in the context.
fn validate_generic(
    value: &ConfigValue,
    schema: &Schema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    match schema {
        Schema::Any => Some(value.clone()),
        Schema::Boolean => validate_boolean(value, context),
        Schema::Integer(s) => validate_integer(value, s, context),
        Schema::String(s) => validate_string(value, s, context),
        Schema::Enum(s) => validate_enum(value, s, context),
        Schema::Array(s) => validate_array(value, s, context),
        Schema::Object(s) => validate_object(value, s, context),
        Schema::Union(s) => validate_union(value, s, context),
    }
}

fn validate_boolean(value: &ConfigValue, context: &mut ValidationContext) -> Option<ConfigValue> {
    match value {
        ConfigValue::Bool(b) => Some(ConfigValue::Bool(*b)),
        ConfigValue::String(s) if s == "true" => Some(ConfigValue::Bool(true)),
        ConfigValue::String(s) if s == "false" => Some(ConfigValue::Bool(false)),
        other => {
            context.type_mismatch("boolean", other);
            None
        }
    }
}

fn validate_integer(
    value: &ConfigValue,
    schema: &IntegerSchema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let number = match value {
        ConfigValue::Integer(i) => Some(*i),
        ConfigValue::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Some(*f as i64),
        ConfigValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    let Some(number) = number else {
        match value {
            ConfigValue::String(s) => context.add_issue(
                IssueKind::WrongType,
                format!("expected integer, got string '{}'", s),
            ),
            other => context.type_mismatch("integer", other),
        }
        return None;
    };

    if let Some(min) = schema.minimum
        && number < min
    {
        context.add_issue(
            IssueKind::ConstraintViolation,
            format!("number {} is less than minimum {}", number, min),
        );
        return None;
    }
    if let Some(max) = schema.maximum
        && number > max
    {
        context.add_issue(
            IssueKind::ConstraintViolation,
            format!("number {} is greater than maximum {}", number, max),
        );
        return None;
    }
    Some(ConfigValue::Integer(number))
}

fn validate_string(
    value: &ConfigValue,
    schema: &StringSchema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let ConfigValue::String(s) = value else {
        context.type_mismatch("string", value);
        return None;
    };
    let length = s.chars().count();
    let mut ok = true;

    if let Some(min) = schema.min_length
        && length < min
    {
        let message = if min == 1 {
            "must not be empty".to_string()
        } else {
            format!("string length {} is less than minimum {}", length, min)
        };
        context.add_issue(IssueKind::ConstraintViolation, message);
        ok = false;
    }
    if let Some(max) = schema.max_length
        && length > max
    {
        context.add_issue(
            IssueKind::ConstraintViolation,
            format!("string length {} is greater than maximum {}", length, max),
        );
        ok = false;
    }
    if let Some(pattern) = &schema.pattern {
        match Regex::new(pattern) {
            Ok(re) if re.is_match(s) => {}
            Ok(_) => {
                context.add_issue(
                    IssueKind::ConstraintViolation,
                    format!("'{}' does not match pattern '{}'", s, pattern),
                );
                ok = false;
            }
            Err(e) => {
                context.add_issue(
                    IssueKind::ConstraintViolation,
                    format!("pattern '{}' is not a valid regular expression: {}", pattern, e),
                );
                ok = false;
            }
        }
    }
    match schema.format {
        Some(StringFormat::Url) if !is_http_url(s) => {
            context.add_issue(
                IssueKind::ConstraintViolation,
                format!("'{}' is not an absolute http(s) URL", s),
            );
            ok = false;
        }
        Some(StringFormat::IpAddress) if s.parse::<IpAddr>().is_err() => {
            context.add_issue(
                IssueKind::ConstraintViolation,
                format!("'{}' is not an IP address", s),
            );
            ok = false;
        }
        _ => {}
    }

    ok.then(|| value.clone())
}

fn is_http_url(s: &str) -> bool {
    url::Url::parse(s)
        .is_ok_and(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
}

fn validate_enum(
    value: &ConfigValue,
    schema: &EnumSchema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let ConfigValue::String(s) = value else {
        context.type_mismatch("string", value);
        return None;
    };
    if schema.values.iter().any(|allowed| allowed == s) {
        Some(value.clone())
    } else {
        context.add_issue(
            IssueKind::ConstraintViolation,
            format!(
                "value must be one of: {}, got '{}'",
                schema.values.join(", "),
                s
            ),
        );
        None
    }
}

fn validate_array(
    value: &ConfigValue,
    schema: &ArraySchema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let ConfigValue::Array(items) = value else {
        context.type_mismatch("array", value);
        return None;
    };

    let mut ok = true;
    if let Some(min) = schema.min_items
        && items.len() < min
    {
        context.add_issue(
            IssueKind::ConstraintViolation,
            format!("array length {} is less than minimum {}", items.len(), min),
        );
        ok = false;
    }

    let mut validated = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match context.with_instance_path(PathSegment::Index(index), |ctx| {
            validate_generic(item, &schema.items, ctx)
        }) {
            Some(v) => validated.push(v),
            None => ok = false,
        }
    }

    for field in &schema.unique_by {
        ok &= check_unique(items, field, context);
    }

    ok.then_some(ConfigValue::Array(validated))
}

/// Report every item whose `field` repeats an earlier item's value.
fn check_unique(items: &[ConfigValue], field: &str, context: &mut ValidationContext) -> bool {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut ok = true;
    for (index, item) in items.iter().enumerate() {
        let Some(key) = item.get(field).filter(|v| v.is_scalar()) else {
            continue;
        };
        let rendered = key.to_string();
        if let Some(first) = seen.get(&rendered) {
            let array = context
                .instance_path
                .segments()
                .last()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "(root)".to_string());
            context.add_issue(
                IssueKind::UniquenessViolation,
                format!(
                    "`{}` entries must have a unique `{}`, but {} is used by entries {} and {}",
                    array, field, rendered, first, index
                ),
            );
            ok = false;
        } else {
            seen.insert(rendered, index);
        }
    }
    ok
}

fn validate_object(
    value: &ConfigValue,
    schema: &ObjectSchema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let ConfigValue::Map(entries) = value else {
        context.type_mismatch("object", value);
        return None;
    };

    let mut ok = true;
    let mut validated = IndexMap::with_capacity(schema.properties.len());

    for (name, property) in &schema.properties {
        // An explicit null counts as absent.
        let present = entries.get(name).filter(|v| !v.is_null());
        let candidate = match (present, &property.default) {
            (Some(v), _) => Some(v),
            (None, Some(default)) => Some(default),
            (None, None) => None,
        };
        let Some(candidate) = candidate else {
            if property.required {
                context.with_instance_path(PathSegment::Key(name.clone()), |ctx| {
                    ctx.add_issue(
                        IssueKind::MissingRequired,
                        format!("missing required setting `{}`", name),
                    )
                });
                ok = false;
            }
            continue;
        };

        let result = context.with_instance_path(PathSegment::Key(name.clone()), |ctx| {
            let result = validate_generic(candidate, &property.schema, ctx);
            if property.sensitive && result.is_some() {
                ctx.sensitive_paths.push(ctx.instance_path.clone());
            }
            result
        });
        match result {
            Some(v) => {
                validated.insert(name.clone(), v);
            }
            None => ok = false,
        }
    }

    for key in entries.keys() {
        if !schema.properties.contains_key(key) {
            debug!(path = %context.instance_path.child(key.clone()), "dropping unknown setting");
        }
    }

    ok.then_some(ConfigValue::Map(validated))
}

fn validate_union(
    value: &ConfigValue,
    schema: &UnionSchema,
    context: &mut ValidationContext,
) -> Option<ConfigValue> {
    let ConfigValue::Map(entries) = value else {
        context.type_mismatch("object", value);
        return None;
    };
    let discriminator = PathSegment::Key(schema.discriminator.clone());
    let allowed = || schema.variants.keys().cloned().collect::<Vec<_>>().join(", ");

    let Some(tag) = entries.get(&schema.discriminator) else {
        context.with_instance_path(discriminator, |ctx| {
            ctx.add_issue(
                IssueKind::MissingRequired,
                format!(
                    "missing required setting `{}` (one of: {})",
                    schema.discriminator,
                    allowed()
                ),
            )
        });
        return None;
    };
    let Some(variant) = tag.as_str().and_then(|t| schema.variants.get(t)) else {
        context.with_instance_path(discriminator, |ctx| {
            ctx.add_issue(
                IssueKind::ConstraintViolation,
                format!("value must be one of: {}, got {}", allowed(), tag),
            )
        });
        return None;
    };
    validate_object(value, variant, context)
}
