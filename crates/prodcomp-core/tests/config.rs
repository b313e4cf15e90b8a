use prodcomp_core::config::{dirs_path, FileKind, GlobalConfig, MetadataMode, ScanConfig};

#[test]
fn test_global_config_defaults() {
    let config = GlobalConfig::default();
    assert_eq!(config.scan.artifact_patterns, vec!["*.rpm"]);
    assert_eq!(config.scan.updateinfo_patterns, vec!["*updateinfo*.xml"]);
    assert_eq!(config.scan.metadata, MetadataMode::Header);
    assert!(config.build.reposdir.is_none());
}

#[test]
fn test_empty_toml_uses_defaults() {
    let config: GlobalConfig = toml::from_str("").unwrap();
    assert_eq!(config.scan.artifact_patterns, vec!["*.rpm"]);
}

#[test]
fn test_scan_section() {
    let config: GlobalConfig = toml::from_str(
        r#"
[scan]
artifact-patterns = ["*.rpm", "*.drpm"]
metadata = "filename"

[build]
reposdir = "/srv/repos"
"#,
    )
    .unwrap();
    assert_eq!(config.scan.artifact_patterns.len(), 2);
    assert_eq!(config.scan.updateinfo_patterns, vec!["*updateinfo*.xml"]);
    assert_eq!(config.scan.metadata, MetadataMode::Filename);
    assert_eq!(config.build.reposdir.as_deref(), Some("/srv/repos"));
}

#[test]
fn test_matcher_classifies() {
    let matcher = ScanConfig::default().matcher().unwrap();
    assert_eq!(matcher.classify("bash-5.2-1.x86_64.rpm"), Some(FileKind::Artifact));
    assert_eq!(matcher.classify("updateinfo.xml"), Some(FileKind::UpdateInfo));
    assert_eq!(
        matcher.classify("SUSE-2025-101-updateinfo.xml"),
        Some(FileKind::UpdateInfo)
    );
    assert_eq!(matcher.classify("repomd.xml"), None);
    assert_eq!(matcher.classify("README"), None);
}

#[test]
fn test_invalid_pattern() {
    let scan = ScanConfig {
        artifact_patterns: vec!["[".to_string()],
        ..ScanConfig::default()
    };
    let err = scan.matcher().unwrap_err();
    assert!(err.to_string().contains("Invalid scan pattern"));
}

#[test]
fn test_load_from_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[build]\nreposdir = \"repos\"\n").unwrap();
    let config = GlobalConfig::load_from(&path).unwrap();
    assert_eq!(config.build.reposdir.as_deref(), Some("repos"));
}

#[test]
fn test_load_from_missing_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let config = GlobalConfig::load_from(&tmp.path().join("config.toml")).unwrap();
    assert!(config.build.reposdir.is_none());
}

#[test]
fn test_load_from_broken_file() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("config.toml");
    std::fs::write(&path, "[scan\n").unwrap();
    let err = GlobalConfig::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse global config"));
}

#[test]
fn test_dirs_path_default_name() {
    if std::env::var("PRODCOMP_HOME").is_err() {
        assert!(dirs_path().ends_with(".prodcomp"));
    }
}
