//! Command implementations for the elsa-config CLI
//!
//! Each command builds a resolver from the shared options and delegates to
//! elsa-config for the actual work.

pub mod merged;
pub mod resolve;
pub mod sources;

use anyhow::Result;
use elsa_config::report::META_SOURCE_NAME;
use elsa_config::{ConfigResolver, EnvSnapshot, ResolveError};
use elsa_error_reporting::SourceText;

use crate::OutputFormat;

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct CommonArgs {
    pub meta: Option<String>,
    pub folders: Option<String>,
    pub format: OutputFormat,
}

impl CommonArgs {
    pub fn resolver(&self, env: EnvSnapshot) -> ConfigResolver {
        let resolver = ConfigResolver::new(env);
        match &self.folders {
            Some(folders) => resolver.with_config_folders(
                std::env::split_paths(folders)
                    .filter(|p| !p.as_os_str().is_empty())
                    .collect(),
            ),
            None => resolver,
        }
    }

    /// The meta string from `--meta`, or from the environment.
    pub fn meta(&self, resolver: &ConfigResolver) -> Result<String, ResolveError> {
        match &self.meta {
            Some(meta) => Ok(meta.clone()),
            None => resolver.meta_from_env(),
        }
    }
}

/// Render a failure in the requested format.
pub fn render_failure(format: OutputFormat, meta: Option<&str>, error: &ResolveError) -> String {
    let diagnostics = error.to_diagnostics();
    match format {
        OutputFormat::Json => {
            let json: Vec<_> = diagnostics.iter().map(|d| d.to_json()).collect();
            serde_json::Value::Array(json).to_string()
        }
        OutputFormat::Text => {
            let source = meta.map(|content| SourceText {
                name: META_SOURCE_NAME,
                content,
            });
            diagnostics
                .iter()
                .map(|d| d.to_text(source.as_ref()))
                .collect::<Vec<_>>()
                .join("\n\n")
        }
    }
}

/// Print a failure to stderr and turn it into the command's error.
pub fn fail(format: OutputFormat, meta: Option<&str>, error: ResolveError) -> anyhow::Error {
    eprintln!("{}", render_failure(format, meta, &error));
    anyhow::anyhow!("configuration could not be resolved")
}

/// Runtime for the provider I/O
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use elsa_config::{ConfigIssue, IssueKind};

    #[test]
    fn test_meta_flag_wins_over_environment() {
        let env = EnvSnapshot::new().with(elsa_config::META_CONFIG_SOURCES_VAR, "file('env')");
        let args = CommonArgs {
            meta: Some("file('flag')".to_string()),
            folders: None,
            format: OutputFormat::Text,
        };
        let resolver = args.resolver(env.clone());
        assert_eq!(args.meta(&resolver).unwrap(), "file('flag')");

        let args = CommonArgs { meta: None, ..args };
        assert_eq!(args.meta(&args.resolver(env)).unwrap(), "file('env')");
    }

    #[test]
    fn test_json_failure_lists_every_diagnostic() {
        let error = ResolveError::Invalid(vec![
            ConfigIssue::at_root(IssueKind::MissingRequired, "first"),
            ConfigIssue::at_root(IssueKind::ConstraintViolation, "second"),
        ]);
        let rendered: serde_json::Value =
            serde_json::from_str(&render_failure(OutputFormat::Json, None, &error)).unwrap();
        assert_eq!(rendered.as_array().unwrap().len(), 2);
        assert_eq!(rendered[1]["code"], "E-4-3");
    }

    #[test]
    fn test_text_failure_includes_the_code() {
        let error = ResolveError::MissingMetaSources;
        let text = render_failure(OutputFormat::Text, None, &error);
        assert!(text.starts_with("Error [E-5-1]"));
        assert!(text.contains("ELSA_DATA_META_CONFIG_SOURCES"));
    }
}
