//! Declarative schemas and the validator that coerces a merged configuration
//! into its final shape.

pub mod elsa;
pub mod types;
pub mod validator;

pub use elsa::{LOG_LEVELS, elsa_schema};
pub use types::{
    ArraySchema, EnumSchema, IntegerSchema, ObjectSchema, Property, Schema, StringFormat,
    StringSchema, UnionSchema,
};
pub use validator::{Validated, ValidationContext, validate};
