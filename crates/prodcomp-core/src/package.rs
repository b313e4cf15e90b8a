use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::evr::{compare, Evr, Op};
use crate::header::{split_nevra, PackageHeader};

const CPEID_PREFIX: &str = "product-cpeid() = ";

/// Whether `name` is a `-debuginfo` or `-debugsource` package name.
pub fn is_debug_name(name: &str) -> bool {
    name.ends_with("-debuginfo") || name.ends_with("-debugsource")
}

/// A version constraint: comparison operator plus anchor EVR.
///
/// An anchor without epoch or release matches any epoch/release of the
/// candidate (the candidate's own value is substituted before comparing).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionConstraint {
    pub op: Op,
    pub evr: Evr,
}

impl VersionConstraint {
    pub fn new(op: Op, evr: Evr) -> Self {
        Self { op, evr }
    }

    /// `= version-release` with the epoch left open.
    pub fn exact(version: &str, release: Option<&str>) -> Self {
        Self::new(Op::EQ, Evr::new(None, version, release))
    }

    /// Whether `candidate` satisfies the constraint.
    pub fn accepts(&self, candidate: &Evr) -> bool {
        let anchor = Evr {
            epoch: self.evr.epoch.clone().or_else(|| candidate.epoch.clone()),
            version: self.evr.version.clone(),
            release: self.evr.release.clone().or_else(|| candidate.release.clone()),
        };
        self.op.accepts(compare(candidate, &anchor))
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, self.evr)
    }
}

/// The source package a binary was built from, as recorded in its header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceRef {
    pub name: String,
    pub version: String,
    pub release: String,
    pub arch: String,
}

impl SourceRef {
    /// Parse a `name-version-release.arch.rpm` source file name.
    pub fn parse(sourcerpm: &str) -> Option<Self> {
        let file = sourcerpm.strip_suffix(".rpm")?;
        let nevra = split_nevra(file)?;
        // Source file names never carry an epoch; a colon belongs to the version
        let version = match nevra.epoch {
            Some(epoch) => format!("{epoch}:{}", nevra.version),
            None => nevra.version,
        };
        Some(Self {
            name: nevra.name,
            version,
            release: nevra.release,
            arch: nevra.arch,
        })
    }

    /// Constraint selecting this source build (epoch unknown, so wildcarded).
    pub fn constraint(&self) -> VersionConstraint {
        VersionConstraint::exact(&self.version, Some(&self.release))
    }
}

/// One discovered package file.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub epoch: Option<String>,
    pub version: String,
    pub release: String,
    /// Real architecture, or one of `noarch`, `src`, `nosrc`.
    pub arch: String,
    pub source: Option<SourceRef>,
    pub license: Option<String>,
    pub buildtime: Option<u64>,
    pub disturl: Option<String>,
    pub provides: Vec<String>,
    /// Absolute path of the file.
    pub location: PathBuf,
    /// Path relative to the scanned root.
    pub origin: PathBuf,
}

impl Package {
    /// Build a package from its header. `origin` is the path relative to the scan root.
    pub fn from_header(header: PackageHeader, location: &Path, origin: &Path) -> Self {
        let source = header.sourcerpm.as_deref().and_then(SourceRef::parse);
        Self {
            name: header.name,
            epoch: header.epoch,
            version: header.version,
            release: header.release,
            arch: header.arch,
            source,
            license: header.license,
            buildtime: header.buildtime,
            disturl: header.disturl,
            provides: header.provides,
            location: location.to_path_buf(),
            origin: origin.to_path_buf(),
        }
    }

    pub fn to_evr(&self) -> Evr {
        Evr::new(self.epoch.as_deref(), &self.version, Some(&self.release))
    }

    /// `[epoch:]version-release`, with a `0` epoch hidden.
    pub fn evr(&self) -> String {
        self.to_evr().to_string()
    }

    pub fn nevra(&self) -> String {
        format!("{}-{}.{}", self.name, self.evr(), self.arch)
    }

    /// File name as produced by the build system (no epoch).
    pub fn canonical_filename(&self) -> String {
        format!(
            "{}-{}-{}.{}.rpm",
            self.name, self.version, self.release, self.arch
        )
    }

    pub fn is_source(&self) -> bool {
        self.arch == "src" || self.arch == "nosrc"
    }

    /// Check the package against an optional architecture, name and version constraint.
    ///
    /// A differing `arch` still matches a `noarch` package unless the request
    /// is for `src` or `nosrc`.
    pub fn matches(
        &self,
        arch: Option<&str>,
        name: Option<&str>,
        constraint: Option<&VersionConstraint>,
    ) -> bool {
        if name.is_some_and(|n| n != self.name) {
            return false;
        }
        if let Some(arch) = arch {
            if arch != self.arch && (arch == "src" || arch == "nosrc" || self.arch != "noarch") {
                return false;
            }
        }
        match constraint {
            None => true,
            Some(c) => c.accepts(&self.to_evr()),
        }
    }

    /// CPE identifier advertised by `*-release` packages, percent-decoded.
    pub fn product_cpeid(&self) -> Option<String> {
        self.provides
            .iter()
            .find_map(|p| p.strip_prefix(CPEID_PREFIX))
            .map(percent_decode)
    }
}

/// Percent-decode; malformed escapes stay literal and invalid UTF-8 is replaced.
fn percent_decode(s: &str) -> String {
    String::from_utf8_lossy(&urlencoding::decode_binary(s.as_bytes())).into_owned()
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Package {}

impl PartialOrd for Package {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Name first, then EVR. Architecture does not take part.
impl Ord for Package {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| compare(&self.to_evr(), &other.to_evr()))
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nevra())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(name: &str, epoch: Option<&str>, version: &str, release: &str, arch: &str) -> Package {
        let header = PackageHeader {
            name: name.to_string(),
            epoch: epoch.map(str::to_string),
            version: version.to_string(),
            release: release.to_string(),
            arch: arch.to_string(),
            sourcerpm: Some(format!("{name}-{version}-{release}.src.rpm")),
            ..Default::default()
        };
        let file = format!("{name}-{version}-{release}.{arch}.rpm");
        Package::from_header(header, Path::new(&file), Path::new(&file))
    }

    fn ge(evr: &str) -> VersionConstraint {
        VersionConstraint::new(Op::GE, Evr::parse(evr))
    }

    #[test]
    fn noarch_matches_binary_arch_but_not_src() {
        let p = pkg("filesystem", None, "84.87", "1.1", "noarch");
        assert!(p.matches(Some("x86_64"), Some("filesystem"), None));
        assert!(p.matches(Some("noarch"), None, None));
        assert!(!p.matches(Some("src"), None, None));
        assert!(!p.matches(Some("nosrc"), None, None));
    }

    #[test]
    fn src_and_nosrc_do_not_cross_match() {
        let p = pkg("firmware", None, "1", "1", "nosrc");
        assert!(p.matches(Some("nosrc"), None, None));
        assert!(!p.matches(Some("src"), None, None));
        assert!(!p.matches(Some("x86_64"), None, None));
    }

    #[test]
    fn other_arch_does_not_match() {
        let p = pkg("bash", None, "5.2", "1", "aarch64");
        assert!(!p.matches(Some("x86_64"), None, None));
        assert!(!p.matches(None, Some("zsh"), None));
        assert!(p.matches(None, None, None));
    }

    #[test]
    fn release_wildcard() {
        let p = pkg("zypper", None, "1.14.71", "150600.8.1", "x86_64");
        let eq = VersionConstraint::new(Op::EQ, Evr::parse("1.14.71"));
        assert!(p.matches(None, None, Some(&eq)));
        let lt = VersionConstraint::new(Op::LT, Evr::parse("1.14.71"));
        assert!(!p.matches(None, None, Some(&lt)));
        assert!(p.matches(None, None, Some(&ge("1.14.71-150600.8.1"))));
        assert!(!p.matches(None, None, Some(&ge("1.14.71-150600.9"))));
    }

    #[test]
    fn epoch_wildcard_and_zero() {
        let p = pkg("vim", Some("2"), "9.1", "1.1", "x86_64");
        // No epoch in the anchor: the package's own epoch is used
        assert!(p.matches(None, None, Some(&VersionConstraint::exact("9.1", Some("1.1")))));
        // An explicit zero epoch is lower than 2
        let pinned = VersionConstraint::new(Op::EQ, Evr::new(Some("0"), "9.1", Some("1.1")));
        assert!(!p.matches(None, None, Some(&pinned)));
        assert!(p.matches(None, None, Some(&ge("0:10"))));
    }

    #[test]
    fn evr_and_nevra_strings() {
        let p = pkg("vim", Some("2"), "9.1", "1.1", "x86_64");
        assert_eq!(p.evr(), "2:9.1-1.1");
        assert_eq!(p.nevra(), "vim-2:9.1-1.1.x86_64");
        assert_eq!(p.canonical_filename(), "vim-9.1-1.1.x86_64.rpm");
        let q = pkg("vim", Some("0"), "9.1", "1.1", "x86_64");
        assert_eq!(q.evr(), "9.1-1.1");
    }

    #[test]
    fn source_reference() {
        let p = pkg("libzypp-devel", None, "17.35.16", "1.1", "x86_64");
        let src = p.source.as_ref().unwrap();
        assert_eq!(src.name, "libzypp-devel");
        assert_eq!(src.version, "17.35.16");
        assert_eq!(src.release, "1.1");
        assert_eq!(src.arch, "src");
        assert!(SourceRef::parse("garbage").is_none());
    }

    #[test]
    fn source_reference_with_dashed_name() {
        let src = SourceRef::parse("python-rpm-macros-20240618.1e386da-1.1.nosrc.rpm").unwrap();
        assert_eq!(src.name, "python-rpm-macros");
        assert_eq!(src.version, "20240618.1e386da");
        assert_eq!(src.arch, "nosrc");
    }

    #[test]
    fn cpeid_is_hex_decoded() {
        let mut p = pkg("SLES-release", None, "15.7", "1", "x86_64");
        p.provides = vec![
            "SLES-release = 15.7-1".to_string(),
            "product-cpeid() = cpe%3A%2Fo%3Asuse%3Asles%3A15%3Asp7".to_string(),
        ];
        assert_eq!(p.product_cpeid().as_deref(), Some("cpe:/o:suse:sles:15:sp7"));
        assert!(pkg("bash", None, "1", "1", "x86_64").product_cpeid().is_none());
    }

    #[test]
    fn percent_decode_leaves_bad_escapes() {
        assert_eq!(percent_decode("a%2"), "a%2");
        assert_eq!(percent_decode("a%zz"), "a%zz");
        assert_eq!(percent_decode("%41%42"), "AB");
        assert_eq!(percent_decode("a%FFb"), "a\u{FFFD}b");
    }

    #[test]
    fn ordering_by_name_then_evr() {
        let a = pkg("a", None, "2", "1", "x86_64");
        let b = pkg("b", None, "1", "1", "x86_64");
        let a_new = pkg("a", None, "10", "1", "x86_64");
        let a_epoch = pkg("a", Some("1"), "1", "1", "x86_64");
        assert!(a < b);
        assert!(a < a_new);
        assert!(a_new < a_epoch);
        assert_eq!(a, pkg("a", None, "2", "1", "noarch"));
    }

    #[test]
    fn debug_and_source_flags() {
        assert!(is_debug_name("bash-debuginfo"));
        assert!(is_debug_name("bash-debugsource"));
        assert!(!is_debug_name("bash"));
        assert!(!is_debug_name("debuginfo-install"));
        assert!(pkg("bash", None, "1", "1", "src").is_source());
    }
}
