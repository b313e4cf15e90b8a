use prodcomp_core::manifest::{BuildOption, MediaMode, ProductManifest};

const MANIFEST: &str = r#"
name = "Leap"
version = "16.0"
vendor = "openSUSE"
architectures = ["x86_64", "aarch64", "s390x"]
build_options = ["ignore_missing_packages"]
debug = "drop"

[flavors.dvd]
architectures = ["x86_64"]
build_options = ["take_all_available_versions", "ignore_missing_packages"]

[flavors.ftp]
name = "Leap-FTP"
summary = "FTP tree"
version = ""
debug = "split"
content = ["main", "extras"]
"#;

#[test]
fn test_flavor_replaces_lists() {
    let manifest = ProductManifest::from_str(MANIFEST).unwrap();
    let dvd = manifest.for_flavor("dvd").unwrap();
    assert_eq!(dvd.architectures, vec!["x86_64"]);
    // Unset lists keep the global value
    assert_eq!(dvd.content, vec!["main"]);
}

#[test]
fn test_flavor_merges_build_options() {
    let manifest = ProductManifest::from_str(MANIFEST).unwrap();
    let dvd = manifest.for_flavor("dvd").unwrap();
    assert_eq!(
        dvd.build_options,
        vec![
            BuildOption::IgnoreMissingPackages,
            BuildOption::TakeAllAvailableVersions
        ]
    );
}

#[test]
fn test_flavor_scalars() {
    let manifest = ProductManifest::from_str(MANIFEST).unwrap();
    let ftp = manifest.for_flavor("ftp").unwrap();
    assert_eq!(ftp.name, "Leap-FTP");
    assert_eq!(ftp.summary.as_deref(), Some("FTP tree"));
    // Empty strings do not override
    assert_eq!(ftp.version.as_deref(), Some("16.0"));
    assert_eq!(ftp.debug, Some(MediaMode::Split));
    assert_eq!(ftp.content, vec!["main", "extras"]);
    assert_eq!(ftp.architectures.len(), 3);
}

#[test]
fn test_unknown_flavor() {
    let manifest = ProductManifest::from_str(MANIFEST).unwrap();
    let err = manifest.for_flavor("cd").unwrap_err();
    assert!(err.to_string().contains("Flavor not found: cd"));
}

#[test]
fn test_flavor_names_sorted() {
    let manifest = ProductManifest::from_str(MANIFEST).unwrap();
    assert_eq!(manifest.flavor_names(), vec!["dvd", "ftp"]);
}
