//! Configuration providers.
//!
//! Each provider named in a meta string fetches one configuration fragment
//! from somewhere: a JSON5 file, a cloud secret, a local keychain or a
//! password store. Providers are built by name through a
//! [`ProviderRegistry`], so the set can be extended or replaced in tests.

pub mod aws_secret;
pub mod file;
pub mod gcloud_secret;
pub mod linux_pass;
pub mod nest;
pub mod osx_keychain;

use async_trait::async_trait;
use indexmap::IndexMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::env::EnvSnapshot;
use crate::meta::{ProviderInvocation, TokenKind};
use crate::runtime::{CommandRunner, NativeCommandRunner, RuntimeError};
use crate::value::ConfigValue;

pub use aws_secret::AwsSecretProvider;
pub use file::FileProvider;
pub use gcloud_secret::GcloudSecretProvider;
pub use linux_pass::LinuxPassProvider;
pub use nest::nest_dotted_keys;
pub use osx_keychain::OsxKeychainProvider;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider '{provider}' {message}")]
    InvalidArguments { provider: String, message: String },

    #[error("no provider is registered under the name '{0}'")]
    Unregistered(String),

    #[error("{provider} source '{locator}' was not found")]
    NotFound {
        provider: String,
        locator: String,
        searched: Vec<PathBuf>,
    },

    #[error("configuration folder '{}' cannot be used: {source}", path.display())]
    FolderUnusable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "configuration folder '{}' resolves to '{}', which is already listed",
        listed.display(),
        resolved.display()
    )]
    FolderAlreadyListed { listed: PathBuf, resolved: PathBuf },

    #[error("{provider} source '{locator}' is malformed: {message}")]
    Malformed {
        provider: String,
        locator: String,
        message: String,
    },

    #[error("{provider} source '{locator}' could not be read: {source}")]
    Io {
        provider: String,
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{provider} source '{locator}' failed: {source}")]
    Command {
        provider: String,
        locator: String,
        #[source]
        source: RuntimeError,
    },

    #[error("dotted key '{key}' conflicts with an existing value at '{at}'")]
    NestConflict { key: String, at: String },
}

impl ProviderError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ProviderError::InvalidArguments { .. } => "E-2-1",
            ProviderError::NotFound { .. } => "E-2-2",
            ProviderError::FolderUnusable { .. } => "E-2-3",
            ProviderError::FolderAlreadyListed { .. } => "E-2-4",
            ProviderError::Malformed { .. } | ProviderError::Io { .. } => "E-2-5",
            ProviderError::Command { .. } => "E-2-6",
            ProviderError::Unregistered(_) => "E-2-7",
            ProviderError::NestConflict { .. } => "E-2-8",
        }
    }
}

/// A literal argument from a meta string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderArgument {
    Str(String),
    Int(u64),
}

impl ProviderArgument {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ProviderArgument::Str(s) => Some(s),
            ProviderArgument::Int(_) => None,
        }
    }

    /// Convert the arguments of a parsed invocation.
    pub fn from_invocation(invocation: &ProviderInvocation) -> ProviderResult<Vec<Self>> {
        invocation
            .arguments
            .iter()
            .map(|token| match token.kind {
                TokenKind::Number => token
                    .value
                    .parse::<u64>()
                    .map(ProviderArgument::Int)
                    .map_err(|e| ProviderError::InvalidArguments {
                        provider: invocation.name().to_string(),
                        message: format!("has an unusable number argument {}: {}", token.value, e),
                    }),
                _ => Ok(ProviderArgument::Str(token.value.clone())),
            })
            .collect()
    }
}

impl fmt::Display for ProviderArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderArgument::Str(s) => write!(f, "'{}'", s),
            ProviderArgument::Int(i) => write!(f, "{}", i),
        }
    }
}

/// Everything a provider may need from its surroundings.
#[derive(Clone)]
pub struct ProviderContext {
    /// Search path for `file(...)` sources.
    pub config_folders: Vec<PathBuf>,
    pub env: EnvSnapshot,
    pub runner: Arc<dyn CommandRunner>,
}

impl ProviderContext {
    pub fn new(env: EnvSnapshot) -> Self {
        Self {
            config_folders: env.config_folders(),
            env,
            runner: Arc::new(NativeCommandRunner),
        }
    }

    pub fn with_config_folders(mut self, folders: Vec<PathBuf>) -> Self {
        self.config_folders = folders;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }
}

impl fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderContext")
            .field("config_folders", &self.config_folders)
            .finish_non_exhaustive()
    }
}

/// A source of one configuration fragment.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Provider name as written in meta strings.
    fn name(&self) -> &'static str;

    /// What this provider reads from, for logs and error messages.
    fn locator(&self) -> &str;

    /// Fetch the fragment. The result is always a map.
    async fn get_config(&self) -> ProviderResult<ConfigValue>;
}

pub type ProviderFactory =
    fn(&ProviderContext, &[ProviderArgument]) -> ProviderResult<Box<dyn ConfigProvider>>;

/// Maps provider names to the functions that construct them.
#[derive(Clone)]
pub struct ProviderRegistry {
    factories: IndexMap<&'static str, ProviderFactory>,
}

impl ProviderRegistry {
    /// A registry with no providers at all.
    pub fn empty() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Register (or replace) the factory for `name`.
    pub fn register(&mut self, name: &'static str, factory: ProviderFactory) -> &mut Self {
        self.factories.insert(name, factory);
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }

    pub fn create(
        &self,
        context: &ProviderContext,
        invocation: &ProviderInvocation,
    ) -> ProviderResult<Box<dyn ConfigProvider>> {
        let factory = self
            .factories
            .get(invocation.name())
            .ok_or_else(|| ProviderError::Unregistered(invocation.name().to_string()))?;
        let arguments = ProviderArgument::from_invocation(invocation)?;
        factory(context, &arguments)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register(file::NAME, FileProvider::from_arguments)
            .register(aws_secret::NAME, AwsSecretProvider::from_arguments)
            .register(gcloud_secret::NAME, GcloudSecretProvider::from_arguments)
            .register(osx_keychain::NAME, OsxKeychainProvider::from_arguments)
            .register(linux_pass::NAME, LinuxPassProvider::from_arguments);
        registry
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

/// Require exactly one non-empty string argument.
pub(crate) fn single_string_argument(
    provider: &str,
    arguments: &[ProviderArgument],
) -> ProviderResult<String> {
    match arguments {
        [ProviderArgument::Str(s)] if !s.is_empty() => Ok(s.clone()),
        [ProviderArgument::Str(_)] => Err(ProviderError::InvalidArguments {
            provider: provider.to_string(),
            message: "requires a non-empty name".to_string(),
        }),
        [ProviderArgument::Int(i)] => Err(ProviderError::InvalidArguments {
            provider: provider.to_string(),
            message: format!("requires a string argument but was given the number {}", i),
        }),
        _ => Err(ProviderError::InvalidArguments {
            provider: provider.to_string(),
            message: format!(
                "requires exactly one argument but was given {}",
                arguments.len()
            ),
        }),
    }
}

/// Parse JSON5 text that must hold an object. Keys are left as written.
pub(crate) fn parse_object(
    provider: &str,
    locator: &str,
    text: &str,
) -> ProviderResult<IndexMap<String, ConfigValue>> {
    let value = ConfigValue::from_json5(text).map_err(|e| ProviderError::Malformed {
        provider: provider.to_string(),
        locator: locator.to_string(),
        message: e.to_string(),
    })?;
    match value {
        ConfigValue::Map(map) => Ok(map),
        other => Err(ProviderError::Malformed {
            provider: provider.to_string(),
            locator: locator.to_string(),
            message: format!("expected an object but found {}", other.type_name()),
        }),
    }
}

/// Parse a secret payload and nest its dotted keys.
pub(crate) fn parse_object_payload(
    provider: &str,
    locator: &str,
    text: &str,
) -> ProviderResult<ConfigValue> {
    nest_dotted_keys(parse_object(provider, locator, text)?)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::parse_meta;

    fn invocation(meta: &str) -> ProviderInvocation {
        parse_meta(meta).unwrap().remove(0)
    }

    #[test]
    fn test_arguments_from_invocation() {
        let args = ProviderArgument::from_invocation(&invocation("file('a', 12)")).unwrap();
        assert_eq!(
            args,
            vec![ProviderArgument::Str("a".into()), ProviderArgument::Int(12)]
        );
    }

    #[test]
    fn test_single_string_argument_rules() {
        assert_eq!(
            single_string_argument("file", &[ProviderArgument::Str("base".into())]).unwrap(),
            "base"
        );
        for args in [
            vec![],
            vec![ProviderArgument::Str(String::new())],
            vec![ProviderArgument::Int(3)],
            vec![
                ProviderArgument::Str("a".into()),
                ProviderArgument::Str("b".into()),
            ],
        ] {
            assert!(matches!(
                single_string_argument("file", &args),
                Err(ProviderError::InvalidArguments { .. })
            ));
        }
    }

    #[test]
    fn test_registry_rejects_unregistered_names() {
        let registry = ProviderRegistry::empty();
        let context = ProviderContext::new(EnvSnapshot::new());
        let err = registry
            .create(&context, &invocation("file('base')"))
            .err()
            .unwrap();
        assert!(matches!(err, ProviderError::Unregistered(ref name) if name == "file"));
    }

    #[test]
    fn test_default_registry_knows_every_meta_provider() {
        let registry = ProviderRegistry::default();
        let mut names: Vec<_> = registry.names().collect();
        names.sort_unstable();
        let mut expected = crate::meta::PROVIDER_NAMES.to_vec();
        expected.sort_unstable();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_parse_object_payload_requires_object() {
        let err = parse_object_payload("aws-secret", "elsa", "[1, 2]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "aws-secret source 'elsa' is malformed: expected an object but found array"
        );
        let value = parse_object_payload("aws-secret", "elsa", "{'oidc.clientSecret': 'x'}").unwrap();
        assert_eq!(
            value.to_json(),
            serde_json::json!({"oidc": {"clientSecret": "x"}})
        );
    }
}
