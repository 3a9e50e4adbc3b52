//! `osx-keychain('<service>')`: generic passwords from the macOS keychain.
//!
//! Every generic password whose service is `<service>` contributes one
//! setting: the account name is the (dotted) key and the password is the
//! value. Entries that cannot be read are skipped with a warning.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{
    ConfigProvider, ProviderArgument, ProviderContext, ProviderError, ProviderResult,
    nest_dotted_keys, single_string_argument,
};
use crate::runtime::CommandRunner;
use crate::value::ConfigValue;

pub const NAME: &str = "osx-keychain";

const SECURITY: &str = "security";

pub struct OsxKeychainProvider {
    service: String,
    runner: Arc<dyn CommandRunner>,
}

impl OsxKeychainProvider {
    pub fn new(service: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            service: service.into(),
            runner,
        }
    }

    pub fn from_arguments(
        context: &ProviderContext,
        arguments: &[ProviderArgument],
    ) -> ProviderResult<Box<dyn ConfigProvider>> {
        let service = single_string_argument(NAME, arguments)?;
        Ok(Box::new(Self::new(service, context.runner.clone())))
    }

    async fn password(&self, account: &str) -> Option<String> {
        let args = vec![
            "find-generic-password".to_string(),
            "-s".to_string(),
            self.service.clone(),
            "-a".to_string(),
            account.to_string(),
            "-w".to_string(),
        ];
        match self.runner.run_checked(SECURITY, &args).await {
            Ok(output) => Some(
                output
                    .stdout_string()
                    .trim_end_matches(['\r', '\n'])
                    .to_string(),
            ),
            Err(e) => {
                warn!(service = %self.service, account, error = %e, "skipping unreadable keychain entry");
                None
            }
        }
    }
}

#[async_trait]
impl ConfigProvider for OsxKeychainProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn locator(&self) -> &str {
        &self.service
    }

    async fn get_config(&self) -> ProviderResult<ConfigValue> {
        let dump = self
            .runner
            .run_checked(SECURITY, &["dump-keychain".to_string()])
            .await
            .map_err(|source| ProviderError::Command {
                provider: NAME.to_string(),
                locator: self.service.clone(),
                source,
            })?;

        let accounts = generic_password_accounts(&dump.stdout_string(), &self.service);
        debug!(service = %self.service, count = accounts.len(), "found keychain entries");

        let mut flat = IndexMap::new();
        for account in accounts {
            if let Some(password) = self.password(&account).await {
                flat.insert(account, ConfigValue::String(password));
            }
        }
        nest_dotted_keys(flat)
    }
}

/// Accounts of the generic password items for `service` in the output of
/// `security dump-keychain`, in listing order and without duplicates.
pub(crate) fn generic_password_accounts(dump: &str, service: &str) -> Vec<String> {
    let mut accounts = Vec::new();
    let mut class: Option<String> = None;
    let mut account: Option<String> = None;
    let mut svce: Option<String> = None;

    let mut flush = |class: &mut Option<String>,
                     account: &mut Option<String>,
                     svce: &mut Option<String>| {
        if class.as_deref() == Some("genp")
            && svce.as_deref() == Some(service)
            && let Some(acct) = account.take()
            && !accounts.contains(&acct)
        {
            accounts.push(acct);
        }
        *class = None;
        *account = None;
        *svce = None;
    };

    for line in dump.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("keychain:") {
            flush(&mut class, &mut account, &mut svce);
        } else if let Some(rest) = trimmed.strip_prefix("class:") {
            class = quoted(rest.trim());
        } else if let Some(rest) = trimmed.strip_prefix("\"acct\"<blob>=") {
            account = attribute_value(rest);
        } else if let Some(rest) = trimmed.strip_prefix("\"svce\"<blob>=") {
            svce = attribute_value(rest);
        }
    }
    flush(&mut class, &mut account, &mut svce);
    accounts
}

/// Decode a blob attribute: `"text"`, `0x...  "text"` or `<NULL>`.
fn attribute_value(raw: &str) -> Option<String> {
    if raw.starts_with('"') {
        return quoted(raw);
    }
    if raw.starts_with("0x") {
        return raw
            .split_once("  ")
            .and_then(|(_, printable)| quoted(printable.trim()));
    }
    None
}

fn quoted(raw: &str) -> Option<String> {
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::ScriptedRunner;
    use crate::runtime::CommandOutput;
    use serde_json::json;

    const DUMP: &str = r#"keychain: "/Users/elsa/Library/Keychains/login.keychain-db"
version: 512
class: "genp"
attributes:
    0x00000007 <blob>="elsa-data"
    "acct"<blob>="oidc.clientSecret"
    "svce"<blob>="elsa-data"
keychain: "/Users/elsa/Library/Keychains/login.keychain-db"
version: 512
class: "genp"
attributes:
    "acct"<blob>=0x6874747048  "httpHosting.session.salt"
    "svce"<blob>="elsa-data"
keychain: "/Users/elsa/Library/Keychains/login.keychain-db"
version: 512
class: "genp"
attributes:
    "acct"<blob>="unrelated"
    "svce"<blob>="some-other-app"
keychain: "/Users/elsa/Library/Keychains/login.keychain-db"
version: 512
class: "inet"
attributes:
    "acct"<blob>="web"
    "svce"<blob>="elsa-data"
keychain: "/Users/elsa/Library/Keychains/login.keychain-db"
version: 512
class: "genp"
attributes:
    "acct"<blob>="broken"
    "svce"<blob>="elsa-data"
"#;

    #[test]
    fn test_accounts_are_filtered_by_service_and_class() {
        assert_eq!(
            generic_password_accounts(DUMP, "elsa-data"),
            vec!["oidc.clientSecret", "httpHosting.session.salt", "broken"]
        );
        assert!(generic_password_accounts(DUMP, "nobody").is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_entries_are_skipped() {
        let runner = ScriptedRunner::default()
            .reply("security dump-keychain", CommandOutput::ok(DUMP))
            .reply(
                "security find-generic-password -s elsa-data -a oidc.clientSecret -w",
                CommandOutput::ok("client-secret\n"),
            )
            .reply(
                "security find-generic-password -s elsa-data -a httpHosting.session.salt -w",
                CommandOutput::ok("pepper\n"),
            );
        let value = OsxKeychainProvider::new("elsa-data", Arc::new(runner))
            .get_config()
            .await
            .unwrap();
        assert_eq!(
            value.to_json(),
            json!({
                "oidc": {"clientSecret": "client-secret"},
                "httpHosting": {"session": {"salt": "pepper"}}
            })
        );
    }

    #[tokio::test]
    async fn test_dump_failure_fails_the_provider() {
        let runner = ScriptedRunner::default();
        let err = OsxKeychainProvider::new("elsa-data", Arc::new(runner))
            .get_config()
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Command { .. }));
    }
}
