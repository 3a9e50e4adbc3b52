//! Error reporting and diagnostic messages for Elsa Data configuration.
//!
//! Every stage of configuration resolution (meta string parsing, provider
//! fetches, merging, schema validation) reports failures through the same
//! structure so that an operator sees one consistent report at startup.
//!
//! # Architecture
//!
//! - [`DiagnosticMessage`]: the main message structure (code, title, problem,
//!   details, hints, optional source span)
//! - [`DiagnosticMessageBuilder`]: tidyverse-style builder for messages
//! - [`ERROR_CATALOG`]: stable error codes (`E-<subsystem>-<number>`) loaded
//!   from `error_catalog.json` at compile time
//!
//! Messages render as plain text (with an ariadne snippet when a span and its
//! source text are available) or as JSON.
//!
//! # Example
//!
//! ```
//! use elsa_error_reporting::DiagnosticMessageBuilder;
//!
//! let error = DiagnosticMessageBuilder::error("Unknown Provider")
//!     .with_code("E-1-2")
//!     .problem("`s3-secret` is not a recognised provider")
//!     .add_hint("Did you mean `aws-secret`?")
//!     .build();
//!
//! assert!(error.to_text(None).contains("[E-1-2]"));
//! ```

pub mod builder;
pub mod catalog;
pub mod diagnostic;

pub use builder::DiagnosticMessageBuilder;
pub use catalog::{ERROR_CATALOG, ErrorCodeInfo, get_error_info, get_subsystem};
pub use diagnostic::{
    DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent, SourceSpan,
    SourceText,
};
