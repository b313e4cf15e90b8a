//! Picking concrete packages from the pool for a resolved package set.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use prodcomp_core::evr::Op;
use prodcomp_core::manifest::{BuildOption, MediaMode, ProductManifest};
use prodcomp_core::package::{Package, VersionConstraint};
use prodcomp_core::supportstatus::SupportStatusOverrides;
use prodcomp_core::updateinfo::UpdateInfo;
use prodcomp_util::errors::ComposeError;

use crate::miss::{Miss, MissKind, MissReport};
use crate::pkgset::PackageSet;
use crate::pool::{best, Pool};
use crate::selector::Selector;

/// Which part of the product tree a pick belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Medium {
    Binary,
    Source,
    Debug,
}

impl fmt::Display for Medium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Medium::Binary => f.write_str("binary"),
            Medium::Source => f.write_str("source"),
            Medium::Debug => f.write_str("debug"),
        }
    }
}

/// Selection switches derived from a (flavor-applied) manifest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectOptions {
    pub take_all: bool,
    pub updateinfo_packages_only: bool,
    pub sources: bool,
    pub debug: bool,
    pub slsa_provenance: bool,
}

impl SelectOptions {
    pub fn from_manifest(manifest: &ProductManifest) -> Self {
        Self {
            take_all: manifest.has_option(BuildOption::TakeAllAvailableVersions),
            updateinfo_packages_only: manifest.has_option(BuildOption::UpdateinfoPackagesOnly),
            sources: MediaMode::wanted(manifest.source),
            debug: MediaMode::wanted(manifest.debug),
            slsa_provenance: manifest.has_option(BuildOption::AddSlsaProvenance),
        }
    }
}

/// One package placed into the tree.
#[derive(Debug, Clone)]
pub struct Pick<'p> {
    pub package: &'p Package,
    pub medium: Medium,
    /// `<file>.slsa_provenance.json` next to the package, when requested and present.
    pub provenance: Option<PathBuf>,
}

/// Result of selecting one content set for one architecture.
#[derive(Debug, Default)]
pub struct Selection<'p> {
    pub arch: String,
    pub picks: Vec<Pick<'p>>,
    /// Support status per binary package name.
    pub supportstatus: BTreeMap<String, Option<String>>,
    pub misses: MissReport,
    seen: HashSet<PathBuf>,
}

impl<'p> Selection<'p> {
    fn new(arch: &str) -> Self {
        Self {
            arch: arch.to_string(),
            ..Default::default()
        }
    }

    fn push(&mut self, package: &'p Package, medium: Medium, slsa: bool) {
        if !self.seen.insert(package.location.clone()) {
            return;
        }
        let provenance = slsa.then(|| provenance_path(&package.location)).flatten();
        self.picks.push(Pick {
            package,
            medium,
            provenance,
        });
    }

    /// Picks of one medium, in selection order.
    pub fn of(&self, medium: Medium) -> impl Iterator<Item = &Pick<'p>> + '_ {
        self.picks.iter().filter(move |p| p.medium == medium)
    }

    pub fn len(&self) -> usize {
        self.picks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.picks.is_empty()
    }
}

fn provenance_path(location: &Path) -> Option<PathBuf> {
    let file = location.file_name()?.to_str()?;
    let stem = file.strip_suffix(".rpm").unwrap_or(file);
    let path = location.with_file_name(format!("{stem}.slsa_provenance.json"));
    path.is_file().then_some(path)
}

/// Candidates for `sel` on `arch`, newest build cutoff applied.
fn candidates<'p>(pool: &'p Pool, arch: &str, sel: &Selector) -> Vec<&'p Package> {
    let mut found = pool.lookup_all(Some(arch), &sel.name, sel.constraint.as_ref());
    if let Some(cutoff) = sel.ignore_binaries_newer_than {
        found.retain(|p| p.buildtime.map_or(true, |t| t <= cutoff));
    }
    found
}

/// `arch/filename` references of all update notices in the pool.
fn update_references(pool: &Pool) -> HashSet<&str> {
    pool.updateinfos().flat_map(UpdateInfo::sources).collect()
}

/// Select the packages of `set` for `arch`, with their source and debug companions.
///
/// Misses are collected, never raised; the caller decides whether they abort.
pub fn select<'p>(
    pool: &'p Pool,
    set: &PackageSet,
    arch: &str,
    options: &SelectOptions,
    overrides: &SupportStatusOverrides,
) -> Result<Selection<'p>, ComposeError> {
    let referenced = if options.updateinfo_packages_only {
        if !pool.has_updateinfos() {
            warn!("filtering for updates enabled, but no update notices found");
        }
        if !options.take_all {
            return Err(ComposeError::Generic {
                message: "filtering for updates enabled, but take_all_available_versions is not set"
                    .to_string(),
            });
        }
        Some(update_references(pool))
    } else {
        None
    };

    let mut selection = Selection::new(arch);
    for sel in set {
        let found = candidates(pool, arch, sel);
        let packages: Vec<&Package> = if options.take_all {
            found
        } else {
            best(found).into_iter().collect()
        };

        if packages.is_empty() {
            if referenced.is_none() {
                warn!("package {sel} not found for {arch}");
                selection.misses.add(Miss::new(MissKind::Package, arch, sel.to_string()));
            }
            continue;
        }

        for pkg in packages {
            if let Some(refs) = &referenced {
                let key = format!("{}/{}", pkg.arch, pkg.canonical_filename());
                if !refs.contains(key.as_str()) {
                    debug!("no update for {pkg}");
                    continue;
                }
            }

            selection.push(pkg, Medium::Binary, options.slsa_provenance);
            let status = overrides
                .get(&pkg.name)
                .map(str::to_string)
                .or_else(|| sel.supportstatus.clone());
            selection.supportstatus.insert(pkg.name.clone(), status);

            let Some(src) = &pkg.source else {
                warn!("package {pkg} does not have a source package");
                continue;
            };

            if options.sources {
                match pool.lookup_best(Some(&src.arch), &src.name, Some(&src.constraint())) {
                    Some(srpm) => selection.push(srpm, Medium::Source, options.slsa_provenance),
                    None => {
                        warn!(
                            "source package {}-{}-{}.{} not found, required by {pkg}",
                            src.name, src.version, src.release, src.arch
                        );
                        selection.misses.add(
                            Miss::new(
                                MissKind::Source,
                                arch,
                                format!("{} {}", src.name, src.constraint()),
                            )
                            .required_by(pkg.nevra()),
                        );
                    }
                }
            }

            if options.debug {
                let debugsource = format!("{}-debugsource", src.name);
                if let Some(d) = pool.lookup_best(Some(arch), &debugsource, Some(&src.constraint())) {
                    selection.push(d, Medium::Debug, options.slsa_provenance);
                }
                let debuginfo = format!("{}-debuginfo", pkg.name);
                let own = VersionConstraint::new(Op::EQ, pkg.to_evr());
                if let Some(d) = pool.lookup_best(Some(arch), &debuginfo, Some(&own)) {
                    selection.push(d, Medium::Debug, options.slsa_provenance);
                }
            }
        }
    }

    info!(
        "selected {} packages for {arch} ({} missing)",
        selection.len(),
        selection.misses.len()
    );
    Ok(selection)
}

/// Best package for every selector of an unpack set.
pub fn select_unpack<'p>(
    pool: &'p Pool,
    set: &PackageSet,
    arch: &str,
) -> (Vec<&'p Package>, MissReport) {
    let mut picks = Vec::new();
    let mut misses = MissReport::new();
    for sel in set {
        match best(candidates(pool, arch, sel)) {
            Some(pkg) => picks.push(pkg),
            None => {
                warn!("package {sel} not found");
                misses.add(Miss::new(MissKind::Unpack, arch, sel.to_string()));
            }
        }
    }
    (picks, misses)
}

/// Product version taken from the best `version_from_package` build on the first architecture.
pub fn product_version(pool: &Pool, manifest: &ProductManifest) -> Result<Option<String>, ComposeError> {
    let Some(name) = manifest.version_from_package.as_deref() else {
        return Ok(manifest.version.clone());
    };
    let arch = manifest.architectures.first().map(String::as_str);
    pool.lookup_best(arch, name, None)
        .map(|pkg| Some(pkg.version.clone()))
        .ok_or_else(|| ComposeError::Generic {
            message: format!("Unable to find {name} package, can not set the product version"),
        })
}
