//! The artifact pool: every package found below a repository root, indexed by name.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use prodcomp_core::config::{FileKind, ScanConfig};
use prodcomp_core::package::{Package, VersionConstraint};
use prodcomp_core::updateinfo::UpdateInfo;
use prodcomp_util::errors::ComposeError;
use prodcomp_util::fs::relative_to;

/// Counts from one [`Pool::scan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub packages: usize,
    pub updateinfos: usize,
    /// Files that looked like packages but had unreadable headers.
    pub skipped: usize,
}

/// Indexed packages and update notices of one build invocation.
#[derive(Debug, Default)]
pub struct Pool {
    packages: BTreeMap<String, Vec<Package>>,
    updateinfos: BTreeMap<PathBuf, UpdateInfo>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk `root` recursively and index packages and update notices.
    ///
    /// Entries are visited in file name order so that insertion order (and
    /// with it tie-breaking in [`Pool::lookup_best`]) does not depend on the
    /// filesystem. Unreadable package headers and directory entries that
    /// cannot be walked (symlink loops, permissions) are skipped with a warning;
    /// malformed update notices abort the scan.
    pub fn scan(&mut self, root: &Path, config: &ScanConfig) -> Result<ScanSummary, ComposeError> {
        if !root.is_dir() {
            return Err(ComposeError::Generic {
                message: format!("Repository directory {} does not exist", root.display()),
            });
        }
        let matcher = config.matcher()?;
        let headers = config.metadata.header_source();
        let mut summary = ScanSummary::default();

        for entry in WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) if entry.file_type().is_file() => entry,
                Ok(_) => continue,
                Err(e) => {
                    warn!("skipping unreadable entry under {}: {e}", root.display());
                    summary.skipped += 1;
                    continue;
                }
            };
            let path = entry.path();
            let file_name = entry.file_name().to_string_lossy();
            match matcher.classify(&file_name) {
                Some(FileKind::UpdateInfo) => {
                    let info = UpdateInfo::from_path(path)?;
                    debug!("update notice {} ({} updates)", path.display(), info.updates.len());
                    self.add_updateinfo(info);
                    summary.updateinfos += 1;
                }
                Some(FileKind::Artifact) => match headers.read_header(path) {
                    Ok(header) => {
                        let origin = relative_to(root, path);
                        let pkg = Package::from_header(header, path, &origin);
                        debug!("found {} at {}", pkg, origin.display());
                        self.add(pkg);
                        summary.packages += 1;
                    }
                    Err(e) => {
                        warn!("skipping {}: {e}", path.display());
                        summary.skipped += 1;
                    }
                },
                None => {}
            }
        }

        info!(
            "scanned {}: {} packages, {} update notices, {} skipped",
            root.display(),
            summary.packages,
            summary.updateinfos,
            summary.skipped
        );
        Ok(summary)
    }

    /// Append a package; all versions and architectures of a name are kept.
    pub fn add(&mut self, pkg: Package) {
        self.packages.entry(pkg.name.clone()).or_default().push(pkg);
    }

    pub fn add_updateinfo(&mut self, info: UpdateInfo) {
        self.updateinfos.insert(info.location.clone(), info);
    }

    /// Every package of `name` matching `arch` and `constraint`, in scan order.
    pub fn lookup_all(
        &self,
        arch: Option<&str>,
        name: &str,
        constraint: Option<&VersionConstraint>,
    ) -> Vec<&Package> {
        self.packages
            .get(name)
            .map(|pkgs| {
                pkgs.iter()
                    .filter(|p| p.matches(arch, Some(name), constraint))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The highest version among [`Pool::lookup_all`]; the first one scanned wins ties.
    pub fn lookup_best(
        &self,
        arch: Option<&str>,
        name: &str,
        constraint: Option<&VersionConstraint>,
    ) -> Option<&Package> {
        best(self.lookup_all(arch, name, constraint))
    }

    /// Delete every matching package. Returns how many were removed.
    pub fn remove(
        &mut self,
        arch: Option<&str>,
        name: &str,
        constraint: Option<&VersionConstraint>,
    ) -> usize {
        let Some(pkgs) = self.packages.get_mut(name) else {
            return 0;
        };
        let before = pkgs.len();
        pkgs.retain(|p| !p.matches(arch, Some(name), constraint));
        let removed = before - pkgs.len();
        if pkgs.is_empty() {
            self.packages.remove(name);
        }
        removed
    }

    /// Remove the packages named by blocked update notices, any architecture,
    /// matching `name = [epoch:]version` with the release left open.
    pub fn remove_blocked(&mut self) -> usize {
        let blocked: Vec<(String, VersionConstraint)> = self
            .updateinfos
            .values()
            .flat_map(UpdateInfo::blocked_packages)
            .map(|p| (p.name.clone(), p.version_constraint()))
            .collect();

        let mut removed = 0;
        for (name, constraint) in &blocked {
            let n = self.remove(None, name, Some(constraint));
            if n > 0 {
                debug!("removed {n} blocked package(s) {name} {constraint}");
            }
            removed += n;
        }
        removed
    }

    /// Distinct package names, optionally only those usable on `arch` (including `noarch`).
    pub fn names(&self, arch: Option<&str>) -> BTreeSet<&str> {
        self.packages
            .iter()
            .filter(|(_, pkgs)| pkgs.iter().any(|p| p.matches(arch, None, None)))
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Update notices ordered by location.
    pub fn updateinfos(&self) -> impl Iterator<Item = &UpdateInfo> {
        self.updateinfos.values()
    }

    pub fn has_updateinfos(&self) -> bool {
        !self.updateinfos.is_empty()
    }

    /// Total number of indexed packages.
    pub fn len(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

/// Highest version of `candidates`; on equal versions the earliest wins.
pub fn best<'p>(candidates: impl IntoIterator<Item = &'p Package>) -> Option<&'p Package> {
    candidates.into_iter().fold(None, |best, pkg| match best {
        Some(b) if pkg <= b => Some(b),
        _ => Some(pkg),
    })
}
