//! Schema type definitions
//!
//! Schemas are built in code with small constructor helpers rather than
//! parsed from a document:
//!
//! ```
//! use elsa_config::schema::{ObjectSchema, Property, Schema};
//!
//! let hosting = Schema::object(
//!     ObjectSchema::new()
//!         .property("host", Property::optional(Schema::ip_address()).default_value("127.0.0.1"))
//!         .property("port", Property::optional(Schema::integer().range(1, 65535)).default_value(3000_i64)),
//! );
//! assert!(matches!(hosting, Schema::Object(_)));
//! ```

use indexmap::IndexMap;

use crate::value::ConfigValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    /// Accepts anything, unchanged.
    Any,
    Boolean,
    Integer(IntegerSchema),
    String(StringSchema),
    Enum(EnumSchema),
    Array(ArraySchema),
    Object(ObjectSchema),
    Union(UnionSchema),
}

/// Integer schema. Numeric strings and integral floats are coerced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegerSchema {
    pub minimum: Option<i64>,
    pub maximum: Option<i64>,
}

/// Well known string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// An absolute `http` or `https` URL.
    Url,
    /// An IPv4 or IPv6 address.
    IpAddress,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringSchema {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
    pub format: Option<StringFormat>,
}

/// A closed set of allowed strings.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArraySchema {
    pub items: Box<Schema>,
    pub min_items: Option<usize>,
    /// Fields whose values must differ between every pair of items.
    pub unique_by: Vec<String>,
}

/// One property of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub schema: Schema,
    pub required: bool,
    /// Filled in when the property is absent. Runs through `schema`.
    pub default: Option<ConfigValue>,
    /// Redacted in every dump of the resolved configuration.
    pub sensitive: bool,
    pub description: Option<String>,
}

/// Object schema. Keys not listed in `properties` are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectSchema {
    pub properties: IndexMap<String, Property>,
}

/// Objects that pick their schema by a discriminator key.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionSchema {
    pub discriminator: String,
    pub variants: IndexMap<String, ObjectSchema>,
}

impl Schema {
    pub fn integer() -> IntegerSchema {
        IntegerSchema::default()
    }

    pub fn string() -> StringSchema {
        StringSchema::default()
    }

    /// A non-empty string.
    pub fn non_empty_string() -> Schema {
        Schema::String(StringSchema {
            min_length: Some(1),
            ..StringSchema::default()
        })
    }

    pub fn url() -> Schema {
        Schema::String(StringSchema {
            format: Some(StringFormat::Url),
            ..StringSchema::default()
        })
    }

    pub fn ip_address() -> Schema {
        Schema::String(StringSchema {
            format: Some(StringFormat::IpAddress),
            ..StringSchema::default()
        })
    }

    pub fn one_of<I, S>(values: I) -> Schema
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Schema::Enum(EnumSchema {
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn array_of(items: Schema) -> ArraySchema {
        ArraySchema {
            items: Box::new(items),
            min_items: None,
            unique_by: Vec::new(),
        }
    }

    pub fn object(schema: ObjectSchema) -> Schema {
        Schema::Object(schema)
    }

    /// A tagged union. Each variant gets the discriminator as a required
    /// property, so it survives validation.
    pub fn union<I, S>(discriminator: &str, variants: I) -> Schema
    where
        I: IntoIterator<Item = (S, ObjectSchema)>,
        S: Into<String>,
    {
        let variants = variants
            .into_iter()
            .map(|(tag, object)| {
                let tag: String = tag.into();
                let mut properties = IndexMap::with_capacity(object.properties.len() + 1);
                properties.insert(
                    discriminator.to_string(),
                    Property::required(Schema::one_of([tag.clone()])),
                );
                properties.extend(object.properties);
                (tag, ObjectSchema { properties })
            })
            .collect();
        Schema::Union(UnionSchema {
            discriminator: discriminator.to_string(),
            variants,
        })
    }

    /// Name used in type mismatch messages.
    pub fn expected_name(&self) -> &'static str {
        match self {
            Schema::Any => "anything",
            Schema::Boolean => "boolean",
            Schema::Integer(_) => "integer",
            Schema::String(_) | Schema::Enum(_) => "string",
            Schema::Array(_) => "array",
            Schema::Object(_) | Schema::Union(_) => "object",
        }
    }
}

impl IntegerSchema {
    pub fn range(mut self, minimum: i64, maximum: i64) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    pub fn minimum(mut self, minimum: i64) -> Self {
        self.minimum = Some(minimum);
        self
    }
}

impl StringSchema {
    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

impl ArraySchema {
    pub fn min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self
    }

    pub fn unique_by(mut self, field: impl Into<String>) -> Self {
        self.unique_by.push(field.into());
        self
    }
}

impl Property {
    pub fn required(schema: impl Into<Schema>) -> Self {
        Self {
            schema: schema.into(),
            required: true,
            default: None,
            sensitive: false,
            description: None,
        }
    }

    pub fn optional(schema: impl Into<Schema>) -> Self {
        Self {
            required: false,
            ..Self::required(schema)
        }
    }

    pub fn default_value(mut self, value: impl Into<ConfigValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.insert(name.into(), property);
        self
    }
}

impl From<IntegerSchema> for Schema {
    fn from(s: IntegerSchema) -> Self {
        Schema::Integer(s)
    }
}

impl From<StringSchema> for Schema {
    fn from(s: StringSchema) -> Self {
        Schema::String(s)
    }
}

impl From<ArraySchema> for Schema {
    fn from(s: ArraySchema) -> Self {
        Schema::Array(s)
    }
}

impl From<ObjectSchema> for Schema {
    fn from(s: ObjectSchema) -> Self {
        Schema::Object(s)
    }
}
