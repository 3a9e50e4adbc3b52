//! `linux-pass('<folder>')`: entries of a `pass` password store folder.
//!
//! Each `<entry>.gpg` file directly inside `<store>/<folder>` becomes one
//! setting. The entry name is the (dotted) key and the first line of the
//! decrypted entry is the value. Entries that cannot be decrypted are
//! skipped with a warning.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{
    ConfigProvider, ProviderArgument, ProviderContext, ProviderError, ProviderResult,
    nest_dotted_keys, single_string_argument,
};
use crate::env::EnvSnapshot;
use crate::runtime::CommandRunner;
use crate::value::ConfigValue;

pub const NAME: &str = "linux-pass";

/// Overrides the location of the password store, as it does for `pass`.
pub const PASSWORD_STORE_DIR_VAR: &str = "PASSWORD_STORE_DIR";

pub struct LinuxPassProvider {
    folder: String,
    store_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl LinuxPassProvider {
    pub fn new(folder: impl Into<String>, store_dir: PathBuf, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            folder: folder.into(),
            store_dir,
            runner,
        }
    }

    pub fn from_arguments(
        context: &ProviderContext,
        arguments: &[ProviderArgument],
    ) -> ProviderResult<Box<dyn ConfigProvider>> {
        let folder = single_string_argument(NAME, arguments)?;
        let escapes = Path::new(&folder)
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(ProviderError::InvalidArguments {
                provider: NAME.to_string(),
                message: format!("requires a folder inside the password store, not '{}'", folder),
            });
        }
        Ok(Box::new(Self::new(
            folder,
            store_dir(&context.env),
            context.runner.clone(),
        )))
    }

    /// Entry names in the folder, sorted.
    async fn entries(&self, folder: &Path) -> ProviderResult<Vec<String>> {
        let mut listing = match tokio::fs::read_dir(folder).await {
            Ok(listing) => listing,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ProviderError::NotFound {
                    provider: NAME.to_string(),
                    locator: self.folder.clone(),
                    searched: vec![self.store_dir.clone()],
                });
            }
            Err(source) => return Err(self.io_error(source)),
        };

        let mut names = Vec::new();
        while let Some(entry) = listing.next_entry().await.map_err(|e| self.io_error(e))? {
            let path = entry.path();
            let is_file = entry.file_type().await.is_ok_and(|t| t.is_file());
            if !is_file || path.extension().and_then(|e| e.to_str()) != Some("gpg") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn show(&self, entry: &str) -> Option<String> {
        let args = vec!["show".to_string(), format!("{}/{}", self.folder, entry)];
        match self.runner.run_checked("pass", &args).await {
            Ok(output) => Some(
                output
                    .stdout_string()
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .to_string(),
            ),
            Err(e) => {
                warn!(folder = %self.folder, entry, error = %e, "skipping unreadable pass entry");
                None
            }
        }
    }

    fn io_error(&self, source: std::io::Error) -> ProviderError {
        ProviderError::Io {
            provider: NAME.to_string(),
            locator: self.folder.clone(),
            source,
        }
    }
}

/// `$PASSWORD_STORE_DIR`, or `~/.password-store`.
fn store_dir(env: &EnvSnapshot) -> PathBuf {
    if let Some(dir) = env.get(PASSWORD_STORE_DIR_VAR).filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    let home = env.get("HOME").unwrap_or(".");
    Path::new(home).join(".password-store")
}

#[async_trait]
impl ConfigProvider for LinuxPassProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn locator(&self) -> &str {
        &self.folder
    }

    async fn get_config(&self) -> ProviderResult<ConfigValue> {
        let folder = self.store_dir.join(&self.folder);
        let entries = self.entries(&folder).await?;
        debug!(folder = %folder.display(), count = entries.len(), "found pass entries");

        let mut flat = IndexMap::new();
        for entry in entries {
            if let Some(value) = self.show(&entry).await {
                flat.insert(entry, ConfigValue::String(value));
            }
        }
        nest_dotted_keys(flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::testing::ScriptedRunner;
    use crate::runtime::CommandOutput;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_with(entries: &[&str]) -> TempDir {
        let store = TempDir::new().unwrap();
        let folder = store.path().join("elsa");
        std::fs::create_dir(&folder).unwrap();
        for entry in entries {
            std::fs::write(folder.join(entry), b"encrypted").unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_entries_become_nested_settings() {
        let store = store_with(&["oidc.clientId.gpg", "oidc.clientSecret.gpg", "notes.txt"]);
        let runner = ScriptedRunner::default()
            .reply("pass show elsa/oidc.clientId", CommandOutput::ok("client\nsecond line\n"))
            .reply("pass show elsa/oidc.clientSecret", CommandOutput::ok("s3cret\n"));
        let value = LinuxPassProvider::new("elsa", store.path().to_path_buf(), Arc::new(runner))
            .get_config()
            .await
            .unwrap();
        assert_eq!(
            value.to_json(),
            json!({"oidc": {"clientId": "client", "clientSecret": "s3cret"}})
        );
    }

    #[tokio::test]
    async fn test_failing_entries_are_skipped() {
        let store = store_with(&["a.gpg", "b.gpg"]);
        let runner = ScriptedRunner::default().reply("pass show elsa/b", CommandOutput::ok("bee"));
        let value = LinuxPassProvider::new("elsa", store.path().to_path_buf(), Arc::new(runner))
            .get_config()
            .await
            .unwrap();
        assert_eq!(value.to_json(), json!({"b": "bee"}));
    }

    #[tokio::test]
    async fn test_missing_folder_is_not_found() {
        let store = TempDir::new().unwrap();
        let err = LinuxPassProvider::new(
            "elsa",
            store.path().to_path_buf(),
            Arc::new(ScriptedRunner::default()),
        )
        .get_config()
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[test]
    fn test_store_dir_resolution() {
        let env = EnvSnapshot::new().with("HOME", "/home/elsa");
        assert_eq!(store_dir(&env), PathBuf::from("/home/elsa/.password-store"));
        let env = env.with(PASSWORD_STORE_DIR_VAR, "/srv/pass");
        assert_eq!(store_dir(&env), PathBuf::from("/srv/pass"));
    }

    #[test]
    fn test_folder_must_stay_inside_the_store() {
        let context = ProviderContext::new(EnvSnapshot::new());
        for folder in ["../etc", "/abs", "a/../../b"] {
            let result =
                LinuxPassProvider::from_arguments(&context, &[ProviderArgument::Str(folder.into())]);
            assert!(
                matches!(result, Err(ProviderError::InvalidArguments { .. })),
                "{folder}"
            );
        }
        assert!(
            LinuxPassProvider::from_arguments(&context, &[ProviderArgument::Str("elsa/dev".into())])
                .is_ok()
        );
    }
}
