use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use prodcomp_test_utils::{RepoTree, RpmFixture};

const MANIFEST: &str = r#"
name = "Mini"
version = "1.0"
vendor = "example"
architectures = ["x86_64"]
source = "split"

[[packagesets]]
supportstatus = "l3"
packages = ["bash", "zypper >= 1.14"]
"#;

fn prodcomp_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("prodcomp").unwrap();
    cmd.env("PRODCOMP_HOME", home.path())
        .env_remove("PRODCOMP_MANIFEST")
        .env_remove("RUST_LOG");
    cmd
}

fn repo() -> RepoTree {
    let repo = RepoTree::new().unwrap();
    repo.add("x86_64", &RpmFixture::binary("bash", "5.2", "1.1", "x86_64"))
        .unwrap();
    repo.add("src", &RpmFixture::source("bash", "5.2", "1.1"))
        .unwrap();
    for version in ["1.14.50", "1.14.89"] {
        repo.add("x86_64", &RpmFixture::binary("zypper", version, "1.1", "x86_64"))
            .unwrap();
        repo.add("src", &RpmFixture::source("zypper", version, "1.1"))
            .unwrap();
    }
    repo
}

#[test]
fn test_plan_text() {
    let home = TempDir::new().unwrap();
    let repo = repo();
    let manifest = repo.write_file("ProductCompose.toml", MANIFEST).unwrap();

    prodcomp_cmd(&home)
        .arg("plan")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--reposdir")
        .arg(repo.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("Mini-1.0 (version 1.0)"))
        .stdout(predicate::str::contains("bash-5.2-1.1.x86_64 [l3]"))
        .stdout(predicate::str::contains("zypper-1.14.89-1.1.src"))
        .stdout(predicate::str::contains("zypper-1.14.50").not());
}

#[test]
fn test_plan_json() {
    let home = TempDir::new().unwrap();
    let repo = repo();
    let manifest = repo.write_file("ProductCompose.toml", MANIFEST).unwrap();

    prodcomp_cmd(&home)
        .args(["plan", "--json", "--manifest"])
        .arg(&manifest)
        .arg("--reposdir")
        .arg(repo.root())
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""nevra": "bash-5.2-1.1.x86_64""#))
        .stdout(predicate::str::contains(r#""medium": "source""#))
        .stdout(predicate::str::contains(r#""supportstatus": "l3""#));
}

#[test]
fn test_plan_missing_packages_abort() {
    let home = TempDir::new().unwrap();
    let repo = repo();
    let manifest = repo
        .write_file(
            "ProductCompose.toml",
            &MANIFEST.replace(r#""bash", "#, r#""bash", "vim", "#),
        )
        .unwrap();

    prodcomp_cmd(&home)
        .arg("plan")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--reposdir")
        .arg(repo.root())
        .assert()
        .failure()
        .stderr(predicate::str::contains("package vim (x86_64)"))
        .stderr(predicate::str::contains("Abort due to 1 missing package(s)"));
}

#[test]
fn test_plan_missing_packages_ignored() {
    let home = TempDir::new().unwrap();
    let repo = repo();
    let content = MANIFEST.replace(r#""bash", "#, r#""bash", "vim", "#).replace(
        "source = \"split\"",
        "source = \"split\"\nbuild_options = [\"ignore_missing_packages\"]",
    );
    let manifest = repo.write_file("ProductCompose.toml", &content).unwrap();

    prodcomp_cmd(&home)
        .arg("plan")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--reposdir")
        .arg(repo.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("missing package vim (x86_64)"));
}

#[test]
fn test_plan_requires_reposdir() {
    let home = TempDir::new().unwrap();
    let repo = repo();
    let manifest = repo.write_file("ProductCompose.toml", MANIFEST).unwrap();

    prodcomp_cmd(&home)
        .arg("plan")
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No repository directory given"));
}

#[test]
fn test_plan_uses_global_reposdir() {
    let home = TempDir::new().unwrap();
    let repo = repo();
    let manifest = repo.write_file("ProductCompose.toml", MANIFEST).unwrap();
    std::fs::write(
        home.path().join("config.toml"),
        format!("[build]\nreposdir = {:?}\n", repo.root().display().to_string()),
    )
    .unwrap();

    prodcomp_cmd(&home)
        .arg("plan")
        .arg("--manifest")
        .arg(&manifest)
        .assert()
        .success()
        .stdout(predicate::str::contains("bash-5.2-1.1.x86_64"));
}

#[test]
fn test_plan_reports_product_cpeid() {
    let home = TempDir::new().unwrap();
    let repo = repo();
    repo.add(
        "x86_64",
        &RpmFixture::binary("Mini-release", "1.0", "1.1", "x86_64").with_provide(
            "product-cpeid()",
            prodcomp_test_utils::SENSE_EQUAL,
            "cpe%3A%2Fo%3Aexample%3Amini%3A1.0",
        ),
    )
    .unwrap();
    repo.add("src", &RpmFixture::source("Mini-release", "1.0", "1.1"))
        .unwrap();
    let manifest = repo
        .write_file(
            "ProductCompose.toml",
            &MANIFEST.replace(r#""bash", "#, r#""bash", "Mini-release", "#),
        )
        .unwrap();

    prodcomp_cmd(&home)
        .arg("plan")
        .arg("--manifest")
        .arg(&manifest)
        .arg("--reposdir")
        .arg(repo.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("cpeid: cpe:/o:example:mini:1.0"));
}
