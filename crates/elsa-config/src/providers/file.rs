//! `file('<name>')`: a JSON5 file from the configuration folders.
//!
//! The folders are searched in order and the first folder holding
//! `<name>.json5` wins. The file name is matched against directory listings
//! rather than joined onto the folder path, so names such as `../secrets`
//! can never reach outside the configured folders.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::{
    ConfigProvider, ProviderArgument, ProviderContext, ProviderError, ProviderResult,
    parse_object, single_string_argument,
};
use crate::value::ConfigValue;

pub const NAME: &str = "file";

/// File extension of configuration files.
pub const EXTENSION: &str = "json5";

#[derive(Debug, Clone)]
pub struct FileProvider {
    folders: Vec<PathBuf>,
    base_name: String,
}

impl FileProvider {
    pub fn new(folders: Vec<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            folders,
            base_name: base_name.into(),
        }
    }

    pub fn from_arguments(
        context: &ProviderContext,
        arguments: &[ProviderArgument],
    ) -> ProviderResult<Box<dyn ConfigProvider>> {
        let base_name = single_string_argument(NAME, arguments)?;
        Ok(Box::new(Self::new(context.config_folders.clone(), base_name)))
    }

    fn file_name(&self) -> OsString {
        OsString::from(format!("{}.{}", self.base_name, EXTENSION))
    }

    /// Canonicalize every folder, rejecting missing ones and duplicates.
    async fn resolve_folders(&self) -> ProviderResult<Vec<PathBuf>> {
        let mut resolved: Vec<PathBuf> = Vec::with_capacity(self.folders.len());
        for folder in &self.folders {
            let canonical = tokio::fs::canonicalize(folder).await.map_err(|source| {
                ProviderError::FolderUnusable {
                    path: folder.clone(),
                    source,
                }
            })?;
            let metadata = tokio::fs::metadata(&canonical).await.map_err(|source| {
                ProviderError::FolderUnusable {
                    path: folder.clone(),
                    source,
                }
            })?;
            if !metadata.is_dir() {
                return Err(ProviderError::FolderUnusable {
                    path: folder.clone(),
                    source: std::io::Error::other("not a directory"),
                });
            }
            if resolved.contains(&canonical) {
                return Err(ProviderError::FolderAlreadyListed {
                    listed: folder.clone(),
                    resolved: canonical,
                });
            }
            resolved.push(canonical);
        }
        Ok(resolved)
    }

    async fn find_in_folder(folder: &Path, file_name: &OsString) -> ProviderResult<Option<PathBuf>> {
        let unusable = |source: std::io::Error| ProviderError::FolderUnusable {
            path: folder.to_path_buf(),
            source,
        };
        let mut entries = tokio::fs::read_dir(folder).await.map_err(unusable)?;
        while let Some(entry) = entries.next_entry().await.map_err(unusable)? {
            if &entry.file_name() != file_name {
                continue;
            }
            let path = entry.path();
            match tokio::fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => return Ok(Some(path)),
                _ => trace!(path = %path.display(), "skipping non-file entry"),
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl ConfigProvider for FileProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn locator(&self) -> &str {
        &self.base_name
    }

    async fn get_config(&self) -> ProviderResult<ConfigValue> {
        let folders = self.resolve_folders().await?;
        let file_name = self.file_name();

        for folder in &folders {
            let Some(path) = Self::find_in_folder(folder, &file_name).await? else {
                continue;
            };
            debug!(path = %path.display(), "loading configuration file");
            let text = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| ProviderError::Io {
                    provider: NAME.to_string(),
                    locator: path.display().to_string(),
                    source,
                })?;
            // Dotted and path-expression keys go to the merge engine as written.
            let map = parse_object(NAME, &path.display().to_string(), &text)?;
            return Ok(ConfigValue::Map(map));
        }

        Err(ProviderError::NotFound {
            provider: NAME.to_string(),
            locator: self.base_name.clone(),
            searched: folders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[tokio::test]
    async fn test_first_folder_with_the_file_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(second.path(), "base.json5", "{ port: 2 }");
        write(second.path(), "dev.json5", "{ port: 3 }");
        write(first.path(), "dev.json5", "{ port: 1 }");

        let folders = vec![first.path().to_path_buf(), second.path().to_path_buf()];
        let dev = FileProvider::new(folders.clone(), "dev").get_config().await.unwrap();
        assert_eq!(dev.to_json(), json!({"port": 1}));
        let base = FileProvider::new(folders, "base").get_config().await.unwrap();
        assert_eq!(base.to_json(), json!({"port": 2}));
    }

    #[tokio::test]
    async fn test_name_is_matched_not_joined() {
        let root = TempDir::new().unwrap();
        let config = root.path().join("config");
        std::fs::create_dir(&config).unwrap();
        write(root.path(), "secret.json5", "{ leaked: true }");

        let err = FileProvider::new(vec![config], "../secret")
            .get_config()
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { ref locator, .. } if locator == "../secret"));
    }

    #[tokio::test]
    async fn test_missing_file_lists_searched_folders() {
        let dir = TempDir::new().unwrap();
        let err = FileProvider::new(vec![dir.path().to_path_buf()], "absent")
            .get_config()
            .await
            .unwrap_err();
        let ProviderError::NotFound { searched, .. } = err else {
            panic!("expected NotFound, got {err:?}");
        };
        assert_eq!(searched, vec![dir.path().canonicalize().unwrap()]);
    }

    #[tokio::test]
    async fn test_duplicate_folder_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "base.json5", "{}");
        let sub = dir.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let folders = vec![dir.path().to_path_buf(), sub.join("..")];

        let err = FileProvider::new(folders, "base").get_config().await.unwrap_err();
        assert!(matches!(err, ProviderError::FolderAlreadyListed { .. }));
    }

    #[tokio::test]
    async fn test_missing_folder_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = FileProvider::new(vec![dir.path().join("nope")], "base")
            .get_config()
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::FolderUnusable { .. }));
    }

    #[tokio::test]
    async fn test_dotted_and_path_keys_are_kept_flat() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "dev.json5",
            r#"{ "httpHosting.port": 1, "$.datasets[?(@.uri == 'a')].name": "A" }"#,
        );
        let value = FileProvider::new(vec![dir.path().to_path_buf()], "dev")
            .get_config()
            .await
            .unwrap();
        assert_eq!(
            value.to_json(),
            json!({"httpHosting.port": 1, "$.datasets[?(@.uri == 'a')].name": "A"})
        );
    }

    #[tokio::test]
    async fn test_malformed_file_and_non_object_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "broken.json5", "{ port: ");
        write(dir.path(), "list.json5", "[1, 2]");
        let folders = vec![dir.path().to_path_buf()];

        for name in ["broken", "list"] {
            let err = FileProvider::new(folders.clone(), name)
                .get_config()
                .await
                .unwrap_err();
            assert!(matches!(err, ProviderError::Malformed { .. }), "{name}: {err}");
        }
    }

    #[tokio::test]
    async fn test_directory_named_like_the_file_is_skipped() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::create_dir(first.path().join("base.json5")).unwrap();
        write(second.path(), "base.json5", "{ from: 'second' }");

        let value = FileProvider::new(
            vec![first.path().to_path_buf(), second.path().to_path_buf()],
            "base",
        )
        .get_config()
        .await
        .unwrap();
        assert_eq!(value.to_json(), json!({"from": "second"}));
    }
}
