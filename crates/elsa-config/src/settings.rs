//! Typed view of a validated Elsa configuration.
//!
//! The validator guarantees the shape, so deserializing into these types
//! only fails when a caller validates against a different schema.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;

use crate::issue::InstancePath;
use crate::redact::redact_paths;
use crate::value::ConfigValue;

/// A string that must never be printed.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The secret itself.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(crate::redact::REDACTED)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElsaSettings {
    pub service_discovery_namespace: String,
    pub deployed_url: String,
    #[serde(default)]
    pub aws: Option<AwsSettings>,
    pub http_hosting: HttpHostingSettings,
    pub logger: LoggerSettings,
    #[serde(default)]
    pub oidc: Option<OidcSettings>,
    #[serde(default)]
    pub mailer: Option<MailerSettings>,
    pub datasets: Vec<DatasetSettings>,
    pub dacs: Vec<DacSettings>,
    pub super_admins: Vec<SuperAdminSettings>,
    #[serde(default)]
    pub dev_testing: Option<DevTestingSettings>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsSettings {
    #[serde(default)]
    pub temp_bucket: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpHostingSettings {
    pub host: String,
    pub port: u16,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    pub secret: SecretString,
    pub salt: SecretString,
    #[serde(default)]
    pub max_age: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoggerSettings {
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcSettings {
    pub issuer_url: String,
    pub client_id: String,
    pub client_secret: SecretString,
}

/// How outgoing mail is sent, selected by `mode`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "mode")]
pub enum MailerSettings {
    #[serde(rename = "SES")]
    Ses(MailerOptions),
    #[serde(rename = "SMTP")]
    Smtp(MailerOptions),
}

/// Transport options are passed through to the mail transport untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MailerOptions {
    #[serde(default)]
    pub options: Option<serde_json::Value>,
    #[serde(default)]
    pub defaults: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetSettings {
    pub uri: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub loader: Option<String>,
}

/// A Data Access Committee that applications are imported from, selected by
/// `type`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DacSettings {
    Manual(ManualDac),
    RedcapAustralianGenomicsCsv(RedcapDac),
    Rems(RemsDac),
}

impl DacSettings {
    pub fn id(&self) -> &str {
        match self {
            DacSettings::Manual(dac) => &dac.id,
            DacSettings::RedcapAustralianGenomicsCsv(dac) => &dac.id,
            DacSettings::Rems(dac) => &dac.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManualDac {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedcapDac {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub identifier_system: Option<String>,
    #[serde(default)]
    pub csv_flagship_datasets: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemsDac {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub url: String,
    pub bot_user: String,
    pub bot_key: SecretString,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SuperAdminSettings {
    pub sub: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevTestingSettings {
    #[serde(default)]
    pub allow_test_users: bool,
    #[serde(default)]
    pub allow_test_routes: bool,
    #[serde(default)]
    pub mock_aws_cloud: bool,
    #[serde(default)]
    pub source_front_end_direct: bool,
}

/// The result of a successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig<T = ElsaSettings> {
    pub settings: T,
    /// The validated tree the settings were read from.
    pub value: ConfigValue,
    pub sensitive_paths: Vec<InstancePath>,
}

impl<T: DeserializeOwned> ValidatedConfig<T> {
    pub(crate) fn from_validated(
        value: ConfigValue,
        sensitive_paths: Vec<InstancePath>,
    ) -> Result<Self, serde_json::Error> {
        let settings = serde_json::from_value(value.to_json())?;
        Ok(Self {
            settings,
            value,
            sensitive_paths,
        })
    }
}

impl<T> ValidatedConfig<T> {
    /// The validated tree with every sensitive setting replaced.
    pub fn redacted(&self) -> ConfigValue {
        redact_paths(&self.value, &self.sensitive_paths)
    }

    pub fn redacted_json(&self) -> serde_json::Value {
        self.redacted().to_json()
    }
}
