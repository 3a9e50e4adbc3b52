//! The resolution pipeline: meta string, providers, merge, environment
//! overlay and validation.

use serde::de::DeserializeOwned;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::env::{ENV_OVERRIDES, EnvOverride, EnvSnapshot, META_CONFIG_SOURCES_VAR, OverlayError, apply_env_overlay};
use crate::issue::{ConfigIssue, IssueKind};
use crate::merge::{MergeError, MergeOptions, merge};
use crate::meta::{MetaError, ProviderInvocation, parse_meta};
use crate::providers::{ProviderContext, ProviderError, ProviderRegistry};
use crate::runtime::{CommandRunner, NativeCommandRunner};
use crate::schema::{Schema, elsa_schema, validate};
use crate::settings::{ElsaSettings, ValidatedConfig};
use crate::value::ConfigValue;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no configuration sources were given (set {})", META_CONFIG_SOURCES_VAR)]
    MissingMetaSources,

    #[error("meta configuration is invalid: {0}")]
    Meta(#[from] MetaError),

    #[error("{invocation} failed: {source}")]
    Provider {
        invocation: String,
        #[source]
        source: ProviderError,
    },

    #[error("{invocation} could not be merged: {source}")]
    Merge {
        invocation: String,
        #[source]
        source: MergeError,
    },

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error("configuration is invalid ({} issue(s))", .0.len())]
    Invalid(Vec<ConfigIssue>),
}

impl ResolveError {
    /// The failure as a list of issues. Only validation failures have more
    /// than one.
    pub fn issues(&self) -> Vec<ConfigIssue> {
        match self {
            ResolveError::Invalid(issues) => issues.clone(),
            ResolveError::MissingMetaSources | ResolveError::Meta(_) | ResolveError::Overlay(_) => {
                vec![ConfigIssue::at_root(IssueKind::ParseError, self.to_string())]
            }
            ResolveError::Provider { .. } => {
                vec![ConfigIssue::at_root(IssueKind::ProviderError, self.to_string())]
            }
            ResolveError::Merge { .. } => {
                vec![ConfigIssue::at_root(IssueKind::MergeError, self.to_string())]
            }
        }
    }
}

pub type ResolveResult<T> = Result<T, ResolveError>;

/// Resolves meta strings into validated configuration.
///
/// ```no_run
/// use elsa_config::{ConfigResolver, EnvSnapshot};
///
/// # async fn run() -> Result<(), elsa_config::ResolveError> {
/// let resolver = ConfigResolver::new(EnvSnapshot::from_process());
/// let config = resolver.resolve("file('base') file('dev-localhost')").await?;
/// println!("listening on port {}", config.settings.http_hosting.port);
/// # Ok(())
/// # }
/// ```
pub struct ConfigResolver {
    registry: ProviderRegistry,
    merge_options: MergeOptions,
    env: EnvSnapshot,
    overrides: Vec<EnvOverride>,
    schema: Schema,
    runner: Arc<dyn CommandRunner>,
    config_folders: Option<Vec<PathBuf>>,
}

impl ConfigResolver {
    pub fn new(env: EnvSnapshot) -> Self {
        Self {
            registry: ProviderRegistry::default(),
            merge_options: MergeOptions::default(),
            env,
            overrides: ENV_OVERRIDES.to_vec(),
            schema: elsa_schema().clone(),
            runner: Arc::new(NativeCommandRunner),
            config_folders: None,
        }
    }

    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_merge_options(mut self, options: MergeOptions) -> Self {
        self.merge_options = options;
        self
    }

    pub fn with_overrides(mut self, overrides: Vec<EnvOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    /// Search path for `file(...)` sources, replacing the one taken from
    /// the environment.
    pub fn with_config_folders(mut self, folders: Vec<PathBuf>) -> Self {
        self.config_folders = Some(folders);
        self
    }

    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    /// The meta string from the environment.
    pub fn meta_from_env(&self) -> ResolveResult<String> {
        self.env
            .get(META_CONFIG_SOURCES_VAR)
            .filter(|meta| !meta.trim().is_empty())
            .map(str::to_string)
            .ok_or(ResolveError::MissingMetaSources)
    }

    /// Parse a meta string without fetching anything.
    pub fn sources(&self, meta: &str) -> ResolveResult<Vec<ProviderInvocation>> {
        Ok(parse_meta(meta)?)
    }

    fn provider_context(&self) -> ProviderContext {
        let context = ProviderContext::new(self.env.clone()).with_runner(self.runner.clone());
        match &self.config_folders {
            Some(folders) => context.with_config_folders(folders.clone()),
            None => context,
        }
    }

    /// Fetch and merge every source, then apply the environment overlay.
    /// The result has not been validated.
    pub async fn resolve_merged(&self, meta: &str) -> ResolveResult<ConfigValue> {
        let invocations = self.sources(meta)?;
        let context = self.provider_context();
        debug!(sources = invocations.len(), folders = ?context.config_folders, "resolving configuration");

        let mut merged = ConfigValue::empty_map();
        for invocation in &invocations {
            let provider_failed = |source: ProviderError| ResolveError::Provider {
                invocation: invocation.to_string(),
                source,
            };
            // Sources are fetched one at a time, in order.
            let provider = self
                .registry
                .create(&context, invocation)
                .map_err(provider_failed)?;
            let fragment = provider.get_config().await.map_err(provider_failed)?;
            info!(provider = provider.name(), locator = provider.locator(), "loaded configuration source");

            merged = merge(&merged, &fragment, &self.merge_options).map_err(|source| {
                ResolveError::Merge {
                    invocation: invocation.to_string(),
                    source,
                }
            })?;
        }

        Ok(apply_env_overlay(&merged, &self.env, &self.overrides)?)
    }

    /// Resolve and validate, deserializing the result into `T`.
    pub async fn resolve_as<T: DeserializeOwned>(&self, meta: &str) -> ResolveResult<ValidatedConfig<T>> {
        let merged = self.resolve_merged(meta).await?;
        let validated = validate(&merged, &self.schema).map_err(ResolveError::Invalid)?;
        debug!(sensitive = validated.sensitive_paths.len(), "configuration is valid");

        ValidatedConfig::from_validated(validated.value, validated.sensitive_paths).map_err(|e| {
            ResolveError::Invalid(vec![ConfigIssue::at_root(
                IssueKind::WrongType,
                format!("validated configuration does not fit the settings type: {}", e),
            )])
        })
    }

    /// Resolve a meta string into Elsa settings.
    pub async fn resolve(&self, meta: &str) -> ResolveResult<ValidatedConfig<ElsaSettings>> {
        self.resolve_as(meta).await
    }

    /// Resolve the meta string held by the environment.
    pub async fn resolve_from_env(&self) -> ResolveResult<ValidatedConfig<ElsaSettings>> {
        let meta = self.meta_from_env()?;
        self.resolve(&meta).await
    }
}
