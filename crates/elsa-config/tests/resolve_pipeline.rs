use elsa_config::{
    ConfigResolver, EnvSnapshot, IssueKind, MergeError, ProviderError, ResolveError,
};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

/// A config folder holding the usual base / dev-common / dev-localhost split.
fn dev_fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "base.json5",
        r#"{
  // shared by every deployment
  deployedUrl: "https://elsa.example.org",
  httpHosting: {
    port: 8000,
    session: { secret: "base secret", salt: "base salt 0123456789" },
  },
  datasets: [
    { uri: "urn:fdc:umccr.org:2022:dataset/10g", name: "10G" },
  ],
  superAdmins: [ { sub: "admin-1" } ],
}"#,
    );
    write(
        dir.path(),
        "dev-common.json5",
        r#"{
  httpHosting: { port: 8001 },
  logger: { level: "debug" },
  "+datasets": [ { uri: "urn:fdc:umccr.org:2022:dataset/10f" } ],
}"#,
    );
    write(
        dir.path(),
        "dev-localhost.json5",
        r#"{
  deployedUrl: "http://localhost:3000",
  devTesting: { allowTestUsers: true },
}"#,
    );
    dir
}

fn resolver(dir: &TempDir) -> ConfigResolver {
    ConfigResolver::new(EnvSnapshot::new()).with_config_folders(vec![dir.path().to_path_buf()])
}

#[tokio::test]
async fn test_later_sources_win_and_unset_keys_fall_through() {
    let dir = dev_fixture();
    let config = resolver(&dir)
        .resolve("file('base') file('dev-common') file('dev-localhost')")
        .await
        .unwrap();

    assert_eq!(config.settings.http_hosting.port, 8001);
    assert_eq!(config.settings.deployed_url, "http://localhost:3000");
    assert_eq!(config.settings.logger.level, "debug");
    assert_eq!(
        config
            .settings
            .datasets
            .iter()
            .map(|d| d.uri.as_str())
            .collect::<Vec<_>>(),
        vec![
            "urn:fdc:umccr.org:2022:dataset/10g",
            "urn:fdc:umccr.org:2022:dataset/10f"
        ]
    );
}

#[tokio::test]
async fn test_reversed_order_changes_the_winner() {
    let dir = dev_fixture();
    let merged = resolver(&dir)
        .resolve_merged("file('dev-common') file('base')")
        .await
        .unwrap();
    assert_eq!(merged.get_path(&["httpHosting", "port"]).unwrap().as_i64(), Some(8000));
}

#[tokio::test]
async fn test_environment_overrides_every_source() {
    let dir = dev_fixture();
    let env = EnvSnapshot::new()
        .with("HTTP_HOSTING_PORT", "9999")
        .with("HTTP_HOSTING_SESSION_SECRET", "from the environment");
    let config = ConfigResolver::new(env)
        .with_config_folders(vec![dir.path().to_path_buf()])
        .resolve("file('base') file('dev-common') file('dev-localhost')")
        .await
        .unwrap();
    assert_eq!(config.settings.http_hosting.port, 9999);
    assert_eq!(
        config.settings.http_hosting.session.secret.expose(),
        "from the environment"
    );
}

#[tokio::test]
async fn test_bad_integer_override_is_reported_by_validation() {
    let dir = dev_fixture();
    let env = EnvSnapshot::new().with("HTTP_HOSTING_PORT", "eighty");
    let err = ConfigResolver::new(env)
        .with_config_folders(vec![dir.path().to_path_buf()])
        .resolve("file('base')")
        .await
        .unwrap_err();
    let issues = err.issues();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].kind, IssueKind::WrongType);
    assert_eq!(issues[0].path.to_string(), "httpHosting.port");
}

#[tokio::test]
async fn test_redacted_output_hides_sensitive_settings() {
    let dir = dev_fixture();
    let config = resolver(&dir).resolve("file('base')").await.unwrap();
    let redacted = config.redacted_json();
    assert_eq!(
        redacted["httpHosting"]["session"],
        json!({"secret": "[redacted]", "salt": "[redacted]"})
    );
    assert!(!redacted.to_string().contains("base secret"));
}

#[tokio::test]
async fn test_duplicate_dataset_uri_fails_validation() {
    let dir = dev_fixture();
    write(
        dir.path(),
        "dup.json5",
        r#"{ "+datasets": [ { uri: "urn:fdc:umccr.org:2022:dataset/10g" } ] }"#,
    );
    let err = resolver(&dir)
        .resolve("file('base') file('dup')")
        .await
        .unwrap_err();
    let ResolveError::Invalid(issues) = &err else {
        panic!("expected a validation failure, got {err}");
    };
    assert_eq!(issues[0].kind, IssueKind::UniquenessViolation);
    assert!(issues[0].message.contains("`uri`"));
    assert!(issues[0].message.contains("entries 0 and 1"));
}

#[tokio::test]
async fn test_replace_and_append_in_one_source_is_rejected() {
    let dir = dev_fixture();
    write(
        dir.path(),
        "both.json5",
        r#"{ superAdmins: [], "+superAdmins": [ { sub: "x" } ] }"#,
    );
    let err = resolver(&dir)
        .resolve_merged("file('base') file('both')")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Merge {
            source: MergeError::ConflictingDirectives { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_deleting_an_unknown_entry_is_rejected() {
    let dir = dev_fixture();
    write(dir.path(), "remove.json5", r#"{ "-superAdmins": [ "admin-2" ] }"#);
    let err = resolver(&dir)
        .resolve_merged("file('base') file('remove')")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Merge {
            source: MergeError::DeletionNotFound { .. },
            ..
        }
    ));

    write(dir.path(), "remove.json5", r#"{ "-superAdmins": [ "admin-1" ] }"#);
    let merged = resolver(&dir)
        .resolve_merged("file('base') file('remove')")
        .await
        .unwrap();
    assert_eq!(merged.get_path(&["superAdmins"]).unwrap().to_json(), json!([]));
}

#[tokio::test]
async fn test_path_keys_replace_existing_scalars() {
    let dir = dev_fixture();
    write(
        dir.path(),
        "rename.json5",
        r#"{ "$.datasets[?(@.uri == 'urn:fdc:umccr.org:2022:dataset/10g')].name": "Ten G" }"#,
    );
    let config = resolver(&dir)
        .resolve("file('base') file('rename')")
        .await
        .unwrap();
    assert_eq!(config.settings.datasets[0].name.as_deref(), Some("Ten G"));
}

#[tokio::test]
async fn test_dotted_keys_in_files_only_replace_existing_settings() {
    let dir = dev_fixture();
    write(dir.path(), "port.json5", r#"{ "httpHosting.port": 9000 }"#);
    let merged = resolver(&dir)
        .resolve_merged("file('base') file('port')")
        .await
        .unwrap();
    assert_eq!(merged.get_path(&["httpHosting", "port"]).unwrap().as_i64(), Some(9000));

    write(dir.path(), "host.json5", r#"{ "httpHosting.host": "0.0.0.0" }"#);
    let err = resolver(&dir)
        .resolve_merged("file('base') file('host')")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Merge {
            source: MergeError::PathMatchedNothing { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_same_folder_listed_twice_is_rejected() {
    let dir = dev_fixture();
    let dotted = dir.path().join(".");
    let err = ConfigResolver::new(EnvSnapshot::new())
        .with_config_folders(vec![dir.path().to_path_buf(), dotted])
        .resolve_merged("file('base')")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::Provider {
            source: ProviderError::FolderAlreadyListed { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn test_traversal_is_not_found() {
    let root = TempDir::new().unwrap();
    let config = root.path().join("config");
    std::fs::create_dir(&config).unwrap();
    write(root.path(), "outside.json5", "{ leaked: true }");

    let resolver =
        ConfigResolver::new(EnvSnapshot::new()).with_config_folders(vec![config.clone()]);
    for meta in ["file('../outside')", "file('nonexistent')"] {
        let err = resolver.resolve_merged(meta).await.unwrap_err();
        assert!(
            matches!(
                err,
                ResolveError::Provider {
                    source: ProviderError::NotFound { .. },
                    ..
                }
            ),
            "{meta}: {err}"
        );
    }
}
