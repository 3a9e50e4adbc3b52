//! Layered configuration resolution for Elsa Data.
//!
//! A *meta string* such as
//!
//! ```text
//! file('base') file('dev-common') aws-secret('ElsaDev')
//! ```
//!
//! names an ordered list of configuration sources. Resolution:
//!
//! 1. lexes and parses the meta string ([`meta`]),
//! 2. fetches each source in order through its provider ([`providers`]),
//! 3. folds the fragments together ([`merge`]), honouring the `+name` /
//!    `-name` array directives and path-expression keys,
//! 4. applies the environment variable overrides ([`env`]),
//! 5. validates, coerces and defaults the result against a schema
//!    ([`schema`]) and reads it into typed [`ElsaSettings`].
//!
//! [`ConfigResolver`] runs the whole pipeline. Failures convert into
//! [`ConfigIssue`]s and into diagnostic messages via
//! [`ResolveError::to_diagnostics`].

pub mod env;
pub mod issue;
pub mod merge;
pub mod meta;
pub mod path_query;
pub mod providers;
pub mod redact;
pub mod report;
pub mod resolve;
pub mod runtime;
pub mod schema;
pub mod settings;
pub mod value;

pub use env::{
    DEFAULT_CONFIG_FOLDER, ENV_OVERRIDES, EnvCoercion, EnvOverride, EnvSnapshot,
    META_CONFIG_FOLDERS_VAR, META_CONFIG_SOURCES_VAR, OverlayError, apply_env_overlay,
};
pub use issue::{ConfigIssue, InstancePath, IssueKind, PathSegment};
pub use merge::{MergeError, MergeOptions, merge, merge_all};
pub use path_query::{PathQuery, PathQueryError};
pub use providers::{
    ConfigProvider, ProviderArgument, ProviderContext, ProviderError, ProviderRegistry,
};
pub use redact::{REDACTED, redact_by_keywords};
pub use resolve::{ConfigResolver, ResolveError, ResolveResult};
pub use runtime::{CommandOutput, CommandRunner, NativeCommandRunner, RuntimeError};
pub use settings::{ElsaSettings, SecretString, ValidatedConfig};
pub use value::ConfigValue;
