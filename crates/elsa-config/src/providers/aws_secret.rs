//! `aws-secret('<secret id>')`: a JSON5 object held in AWS Secrets Manager.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{
    ConfigProvider, ProviderArgument, ProviderContext, ProviderError, ProviderResult,
    parse_object_payload, single_string_argument,
};
use crate::runtime::CommandRunner;
use crate::value::ConfigValue;

pub const NAME: &str = "aws-secret";

pub struct AwsSecretProvider {
    secret_id: String,
    runner: Arc<dyn CommandRunner>,
}

impl AwsSecretProvider {
    pub fn new(secret_id: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            secret_id: secret_id.into(),
            runner,
        }
    }

    pub fn from_arguments(
        context: &ProviderContext,
        arguments: &[ProviderArgument],
    ) -> ProviderResult<Box<dyn ConfigProvider>> {
        let secret_id = single_string_argument(NAME, arguments)?;
        Ok(Box::new(Self::new(secret_id, context.runner.clone())))
    }

    fn command_args(&self) -> Vec<String> {
        [
            "secretsmanager",
            "get-secret-value",
            "--secret-id",
            self.secret_id.as_str(),
            "--query",
            "SecretString",
            "--output",
            "text",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }
}

#[async_trait]
impl ConfigProvider for AwsSecretProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn locator(&self) -> &str {
        &self.secret_id
    }

    async fn get_config(&self) -> ProviderResult<ConfigValue> {
        debug!(secret_id = %self.secret_id, "fetching secret from AWS Secrets Manager");
        let output = self
            .runner
            .run_checked("aws", &self.command_args())
            .await
            .map_err(|source| ProviderError::Command {
                provider: NAME.to_string(),
                locator: self.secret_id.clone(),
                source,
            })?;
        parse_object_payload(NAME, &self.secret_id, &output.stdout_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::ScriptedRunner;
    use crate::runtime::CommandOutput;
    use serde_json::json;

    const COMMAND: &str = "aws secretsmanager get-secret-value --secret-id elsa/prod --query SecretString --output text";

    #[tokio::test]
    async fn test_secret_string_is_parsed_and_nested() {
        let runner = ScriptedRunner::default().reply(
            COMMAND,
            CommandOutput::ok("{\"oidc.clientSecret\": \"abc\", \"deployedUrl\": \"https://x\"}\n"),
        );
        let provider = AwsSecretProvider::new("elsa/prod", Arc::new(runner));
        let value = provider.get_config().await.unwrap();
        assert_eq!(
            value.to_json(),
            json!({"oidc": {"clientSecret": "abc"}, "deployedUrl": "https://x"})
        );
    }

    #[tokio::test]
    async fn test_cli_failure_is_a_command_error() {
        let runner = ScriptedRunner::default().reply(
            COMMAND,
            CommandOutput::failed(254, "An error occurred (ResourceNotFoundException)"),
        );
        let err = AwsSecretProvider::new("elsa/prod", Arc::new(runner))
            .get_config()
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Command { .. }));
        assert!(err.to_string().contains("ResourceNotFoundException"));
    }

    #[tokio::test]
    async fn test_secret_must_be_an_object() {
        let runner = ScriptedRunner::default().reply(COMMAND, CommandOutput::ok("\"just text\""));
        let err = AwsSecretProvider::new("elsa/prod", Arc::new(runner))
            .get_config()
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Malformed { .. }));
    }
}
