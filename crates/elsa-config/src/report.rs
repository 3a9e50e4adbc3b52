//! Conversion of resolution failures into diagnostic messages.

use elsa_error_reporting::{DiagnosticMessage, DiagnosticMessageBuilder, SourceSpan, get_error_info};
use std::error::Error as _;

use crate::env::META_CONFIG_SOURCES_VAR;
use crate::issue::ConfigIssue;
use crate::meta::MetaError;
use crate::providers::ProviderError;
use crate::resolve::ResolveError;

/// Display name for the meta string in rendered snippets.
pub const META_SOURCE_NAME: &str = "meta configuration";

fn title_for(code: &str, fallback: &str) -> String {
    get_error_info(code)
        .map(|info| info.title.clone())
        .unwrap_or_else(|| fallback.to_string())
}

/// A diagnostic for one validation issue.
pub fn issue_diagnostic(issue: &ConfigIssue) -> DiagnosticMessage {
    let code = issue.error_code();
    DiagnosticMessageBuilder::error(title_for(code, issue.kind.title()))
        .with_code(code)
        .problem(format!("`{}`: {}", issue.path, issue.message))
        .build()
}

/// A diagnostic for a meta string error, pointing into the meta string.
pub fn meta_diagnostic(error: &MetaError) -> DiagnosticMessage {
    let code = error.error_code();
    let offset = error.position().offset;
    DiagnosticMessageBuilder::error(title_for(code, "Invalid Meta Configuration"))
        .with_code(code)
        .problem(error.to_string())
        .with_location(SourceSpan::new(offset, offset + 1))
        .add_hint(
            "Meta strings look like `file('base') aws-secret('ElsaDev')`. \
             Are all arguments single-quoted and every list closed?",
        )
        .build()
}

fn provider_hint(error: &ProviderError) -> Option<String> {
    match error {
        ProviderError::NotFound { searched, .. } if !searched.is_empty() => Some(format!(
            "Searched {}. Is the name spelled without its extension?",
            searched
                .iter()
                .map(|p| format!("`{}`", p.display()))
                .collect::<Vec<_>>()
                .join(", ")
        )),
        ProviderError::FolderAlreadyListed { .. } => {
            Some("Remove the duplicate entry from the folder search path?".to_string())
        }
        ProviderError::Command { .. } => {
            Some("Is the command line tool installed and logged in?".to_string())
        }
        _ => None,
    }
}

impl ResolveError {
    /// Diagnostics describing this failure. Validation failures produce one
    /// message per issue.
    pub fn to_diagnostics(&self) -> Vec<DiagnosticMessage> {
        match self {
            ResolveError::Invalid(issues) => issues.iter().map(issue_diagnostic).collect(),
            ResolveError::Meta(error) => vec![meta_diagnostic(error)],
            ResolveError::MissingMetaSources => vec![
                DiagnosticMessageBuilder::error(title_for("E-5-1", "No Configuration Sources"))
                    .with_code("E-5-1")
                    .problem(self.to_string())
                    .add_hint(format!(
                        "Set `{}` or pass `--meta`?",
                        META_CONFIG_SOURCES_VAR
                    ))
                    .build(),
            ],
            ResolveError::Provider { invocation, source } => {
                let code = source.error_code();
                let mut builder = DiagnosticMessageBuilder::error(title_for(code, "Provider Failed"))
                    .with_code(code)
                    .problem(format!("Could not load `{}`", invocation))
                    .add_detail(source.to_string());
                if let Some(cause) = source.source() {
                    builder = builder.add_info(cause.to_string());
                }
                if let Some(hint) = provider_hint(source) {
                    builder = builder.add_hint(hint);
                }
                vec![builder.build()]
            }
            ResolveError::Merge { invocation, source } => {
                let code = source.error_code();
                vec![
                    DiagnosticMessageBuilder::error(title_for(code, "Merge Failed"))
                        .with_code(code)
                        .problem(format!("Could not merge `{}`", invocation))
                        .add_detail(source.to_string())
                        .build(),
                ]
            }
            ResolveError::Overlay(error) => {
                let code = error.error_code();
                vec![
                    DiagnosticMessageBuilder::error(title_for(code, "Invalid Environment Override"))
                        .with_code(code)
                        .problem(error.to_string())
                        .build(),
                ]
            }
        }
    }
}
