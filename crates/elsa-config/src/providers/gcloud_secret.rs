//! `gcloud-secret('<secret>')`: a JSON5 object held in Google Secret Manager.
//!
//! The argument is either a bare secret name, read at its latest version in
//! the active gcloud project, or a full resource name
//! (`projects/<p>/secrets/<s>` optionally followed by `/versions/<v>`).

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{
    ConfigProvider, ProviderArgument, ProviderContext, ProviderError, ProviderResult,
    parse_object_payload, single_string_argument,
};
use crate::runtime::CommandRunner;
use crate::value::ConfigValue;

pub const NAME: &str = "gcloud-secret";

pub struct GcloudSecretProvider {
    secret: String,
    runner: Arc<dyn CommandRunner>,
}

impl GcloudSecretProvider {
    pub fn new(secret: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            secret: secret.into(),
            runner,
        }
    }

    pub fn from_arguments(
        context: &ProviderContext,
        arguments: &[ProviderArgument],
    ) -> ProviderResult<Box<dyn ConfigProvider>> {
        let secret = single_string_argument(NAME, arguments)?;
        Ok(Box::new(Self::new(secret, context.runner.clone())))
    }

    fn command_args(&self) -> Vec<String> {
        let mut args = vec![
            "secrets".to_string(),
            "versions".to_string(),
            "access".to_string(),
        ];
        if self.secret.starts_with("projects/") {
            if self.secret.contains("/versions/") {
                args.push(self.secret.clone());
            } else {
                args.push(format!("{}/versions/latest", self.secret));
            }
        } else {
            args.push("latest".to_string());
            args.push(format!("--secret={}", self.secret));
        }
        args
    }
}

#[async_trait]
impl ConfigProvider for GcloudSecretProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn locator(&self) -> &str {
        &self.secret
    }

    async fn get_config(&self) -> ProviderResult<ConfigValue> {
        debug!(secret = %self.secret, "fetching secret from Google Secret Manager");
        let output = self
            .runner
            .run_checked("gcloud", &self.command_args())
            .await
            .map_err(|source| ProviderError::Command {
                provider: NAME.to_string(),
                locator: self.secret.clone(),
                source,
            })?;
        parse_object_payload(NAME, &self.secret, &output.stdout_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::ScriptedRunner;
    use crate::runtime::CommandOutput;
    use serde_json::json;

    #[tokio::test]
    async fn test_bare_secret_name_reads_latest() {
        let runner = Arc::new(ScriptedRunner::default().reply(
            "gcloud secrets versions access latest --secret=elsa-data",
            CommandOutput::ok("{ 'httpHosting.port': 9000 }"),
        ));
        let value = GcloudSecretProvider::new("elsa-data", runner.clone())
            .get_config()
            .await
            .unwrap();
        assert_eq!(value.to_json(), json!({"httpHosting": {"port": 9000}}));
        assert_eq!(runner.calls.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_resource_names_are_passed_through() {
        let runner: Arc<dyn CommandRunner> = Arc::new(ScriptedRunner::default());
        let pinned = GcloudSecretProvider::new("projects/p/secrets/s/versions/3", runner.clone());
        assert_eq!(
            pinned.command_args(),
            vec!["secrets", "versions", "access", "projects/p/secrets/s/versions/3"]
        );
        let unpinned = GcloudSecretProvider::new("projects/p/secrets/s", runner);
        assert_eq!(
            unpinned.command_args().last().map(String::as_str),
            Some("projects/p/secrets/s/versions/latest")
        );
    }

    #[tokio::test]
    async fn test_cli_failure_is_a_command_error() {
        let runner = Arc::new(ScriptedRunner::default());
        let err = GcloudSecretProvider::new("missing", runner)
            .get_config()
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Command { .. }));
    }
}
