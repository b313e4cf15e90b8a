//! Update notice documents (`updateinfo.xml`): `<updates><update>...</update></updates>`.

use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use prodcomp_util::errors::ComposeError;

use crate::evr::{Evr, Op};
use crate::package::VersionConstraint;

/// A parsed update notice document.
#[derive(Debug, Clone, Default)]
pub struct UpdateInfo {
    pub location: PathBuf,
    pub updates: Vec<Update>,
}

/// One `<update>` entry.
#[derive(Debug, Clone, Default)]
pub struct Update {
    pub id: String,
    pub status: Option<String>,
    /// The `type` attribute (`security`, `recommended`, ...).
    pub kind: Option<String>,
    pub from: Option<String>,
    pub title: Option<String>,
    /// Set when the update carries a `<blocked_in_product>` element.
    pub blocked: bool,
    pub packages: Vec<UpdatePackage>,
}

/// A `pkglist/collection/package` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePackage {
    pub name: String,
    pub epoch: Option<String>,
    pub version: String,
    pub release: Option<String>,
    pub arch: String,
    /// Path of the file relative to the repository root (`arch/file.rpm`).
    pub src: Option<String>,
    pub filename: Option<String>,
    pub embargo_date: Option<String>,
}

impl UpdatePackage {
    /// `= [epoch:]version` with the release wildcarded, as withdrawn by a blocked update.
    pub fn version_constraint(&self) -> VersionConstraint {
        VersionConstraint::new(Op::EQ, Evr::new(self.epoch.as_deref(), &self.version, None))
    }
}

impl UpdateInfo {
    pub fn from_path(path: &Path) -> Result<Self, ComposeError> {
        let content = std::fs::read_to_string(path)?;
        let mut info = Self::from_str(&content).map_err(|e| match e {
            ComposeError::UpdateInfo { message, .. } => ComposeError::UpdateInfo {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })?;
        info.location = path.to_path_buf();
        Ok(info)
    }

    /// Parse a document; the location is left empty.
    pub fn from_str(xml: &str) -> Result<Self, ComposeError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut info = UpdateInfo::default();
        let mut path: Vec<String> = Vec::new();
        let mut text_buf = String::new();
        let mut current: Option<Update> = None;
        let mut current_pkg: Option<UpdatePackage> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    path.push(tag);
                    text_buf.clear();
                    open_element(e, &path, &mut current, &mut current_pkg)?;
                }
                Ok(Event::Empty(ref e)) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    path.push(tag);
                    open_element(e, &path, &mut current, &mut current_pkg)?;
                    close_element(&path, "", &mut info, &mut current, &mut current_pkg);
                    path.pop();
                }
                Ok(Event::Text(ref e)) => {
                    text_buf = e.unescape().unwrap_or_default().to_string();
                }
                Ok(Event::End(_)) => {
                    close_element(&path, &text_buf, &mut info, &mut current, &mut current_pkg);
                    path.pop();
                    text_buf.clear();
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(parse_error(format!(
                        "malformed XML at byte {}: {e}",
                        reader.buffer_position()
                    )));
                }
                _ => {}
            }
        }

        if !path.is_empty() {
            return Err(parse_error(format!("unclosed element <{}>", path.join(">"))));
        }
        Ok(info)
    }

    /// `arch/filename` paths named by the `src` attribute of package entries.
    pub fn sources(&self) -> impl Iterator<Item = &str> + '_ {
        self.updates
            .iter()
            .flat_map(|u| &u.packages)
            .filter_map(|p| p.src.as_deref())
    }

    /// Package entries of updates blocked in the product.
    pub fn blocked_packages(&self) -> impl Iterator<Item = &UpdatePackage> + '_ {
        self.updates
            .iter()
            .filter(|u| u.blocked)
            .flat_map(|u| &u.packages)
    }
}

fn parse_error(message: String) -> ComposeError {
    ComposeError::UpdateInfo {
        path: String::new(),
        message,
    }
}

fn open_element(
    e: &BytesStart<'_>,
    path: &[String],
    current: &mut Option<Update>,
    current_pkg: &mut Option<UpdatePackage>,
) -> Result<(), ComposeError> {
    match path_context(path).as_str() {
        "updates>update" => {
            *current = Some(Update {
                from: attribute(e, "from")?,
                status: attribute(e, "status")?,
                kind: attribute(e, "type")?,
                ..Default::default()
            });
        }
        "updates>update>blocked_in_product" => {
            if let Some(update) = current.as_mut() {
                update.blocked = true;
            }
        }
        "updates>update>pkglist>collection>package" => {
            let name = attribute(e, "name")?
                .ok_or_else(|| parse_error("package entry without name".to_string()))?;
            *current_pkg = Some(UpdatePackage {
                name,
                epoch: attribute(e, "epoch")?,
                version: attribute(e, "version")?.unwrap_or_default(),
                release: attribute(e, "release")?,
                arch: attribute(e, "arch")?.unwrap_or_default(),
                src: attribute(e, "src")?,
                filename: None,
                embargo_date: attribute(e, "embargo_date")?,
            });
        }
        _ => {}
    }
    Ok(())
}

fn close_element(
    path: &[String],
    text: &str,
    info: &mut UpdateInfo,
    current: &mut Option<Update>,
    current_pkg: &mut Option<UpdatePackage>,
) {
    match path_context(path).as_str() {
        "updates>update" => {
            if let Some(update) = current.take() {
                info.updates.push(update);
            }
        }
        "updates>update>id" => {
            if let Some(update) = current.as_mut() {
                update.id = text.to_string();
            }
        }
        "updates>update>title" => {
            if let Some(update) = current.as_mut() {
                update.title = Some(text.to_string());
            }
        }
        "updates>update>pkglist>collection>package>filename" => {
            if let Some(pkg) = current_pkg.as_mut() {
                pkg.filename = Some(text.to_string());
            }
        }
        "updates>update>pkglist>collection>package" => {
            if let (Some(pkg), Some(update)) = (current_pkg.take(), current.as_mut()) {
                update.packages.push(pkg);
            }
        }
        _ => {}
    }
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Result<Option<String>, ComposeError> {
    for attr in e.attributes() {
        let attr = attr.map_err(|err| parse_error(format!("bad attribute: {err}")))?;
        if attr.key.as_ref() == key.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|err| parse_error(format!("bad attribute value: {err}")))?;
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

fn path_context(path: &[String]) -> String {
    path.join(">")
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTICE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<updates>
  <update from="maint-coord@suse.de" status="stable" type="security" version="1">
    <id>SUSE-SLE-Module-Basesystem-15-SP6-2025-101</id>
    <title>Security update for zypper</title>
    <pkglist>
      <collection>
        <package name="zypper" epoch="0" version="1.14.89" release="150600.10.1" arch="x86_64" src="x86_64/zypper-1.14.89-150600.10.1.x86_64.rpm">
          <filename>zypper-1.14.89-150600.10.1.x86_64.rpm</filename>
        </package>
        <package name="zypper" version="1.14.89" release="150600.10.1" arch="src" src="src/zypper-1.14.89-150600.10.1.src.rpm"/>
      </collection>
    </pkglist>
  </update>
  <update status="stable" type="recommended">
    <id>BLOCKED-1</id>
    <blocked_in_product/>
    <pkglist>
      <collection>
        <package name="libsolv-tools" version="0.7.31" release="1.1" arch="x86_64" embargo_date="2099-01-01"/>
      </collection>
    </pkglist>
  </update>
</updates>
"#;

    #[test]
    fn parse_updates() {
        let info = UpdateInfo::from_str(NOTICE).unwrap();
        assert_eq!(info.updates.len(), 2);

        let first = &info.updates[0];
        assert_eq!(first.id, "SUSE-SLE-Module-Basesystem-15-SP6-2025-101");
        assert_eq!(first.kind.as_deref(), Some("security"));
        assert_eq!(first.status.as_deref(), Some("stable"));
        assert_eq!(first.from.as_deref(), Some("maint-coord@suse.de"));
        assert_eq!(first.title.as_deref(), Some("Security update for zypper"));
        assert!(!first.blocked);
        assert_eq!(first.packages.len(), 2);
        assert_eq!(first.packages[0].epoch.as_deref(), Some("0"));
        assert_eq!(
            first.packages[0].filename.as_deref(),
            Some("zypper-1.14.89-150600.10.1.x86_64.rpm")
        );
        assert_eq!(first.packages[1].arch, "src");
        assert_eq!(first.packages[1].filename, None);
    }

    #[test]
    fn blocked_flag_and_embargo() {
        let info = UpdateInfo::from_str(NOTICE).unwrap();
        let blocked = &info.updates[1];
        assert!(blocked.blocked);
        assert_eq!(blocked.packages[0].embargo_date.as_deref(), Some("2099-01-01"));
        assert_eq!(blocked.packages[0].epoch, None);
    }

    #[test]
    fn sources_by_src_path() {
        let info = UpdateInfo::from_str(NOTICE).unwrap();
        let sources: Vec<&str> = info.sources().collect();
        assert!(sources.contains(&"x86_64/zypper-1.14.89-150600.10.1.x86_64.rpm"));
        assert!(!sources.contains(&"x86_64/zypper-1.14.88-150600.9.1.x86_64.rpm"));
    }

    #[test]
    fn blocked_packages_only_from_blocked_updates() {
        let info = UpdateInfo::from_str(NOTICE).unwrap();
        let names: Vec<&str> = info.blocked_packages().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["libsolv-tools"]);
    }

    #[test]
    fn version_constraint_wildcards_epoch_and_release() {
        let info = UpdateInfo::from_str(NOTICE).unwrap();
        let c = info.updates[1].packages[0].version_constraint();
        assert_eq!(c.evr.epoch, None);
        assert_eq!(c.evr.release, None);
        assert_eq!(c.to_string(), "= 0.7.31");
    }

    #[test]
    fn malformed_document_is_rejected() {
        let err = UpdateInfo::from_str("<updates><update><id>x</id></updates>").unwrap_err();
        assert!(matches!(err, ComposeError::UpdateInfo { .. }), "got: {err}");
    }

    #[test]
    fn empty_document() {
        let info = UpdateInfo::from_str("<updates/>").unwrap();
        assert!(info.updates.is_empty());
    }
}
