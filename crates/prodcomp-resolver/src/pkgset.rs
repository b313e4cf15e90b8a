//! Ordered, composable collections of selectors.

use std::cell::OnceCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use prodcomp_core::package::Package;
use prodcomp_util::errors::ComposeError;

use crate::selector::Selector;

/// A named, ordered list of selectors with a lazily built name index.
#[derive(Debug, Clone, Default)]
pub struct PackageSet {
    pub name: String,
    selectors: Vec<Selector>,
    by_name: OnceCell<BTreeMap<String, Vec<usize>>>,
    /// Tag given to selectors created from specs, and to added selectors lacking one.
    pub supportstatus: Option<String>,
    /// Force `supportstatus` onto every added selector.
    pub override_supportstatus: bool,
    pub ignore_binaries_newer_than: Option<u64>,
}

impl PackageSet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set the support status from a declaration; a leading `=` enables override.
    pub fn set_supportstatus(&mut self, status: &str) {
        match status.strip_prefix('=') {
            Some(rest) => {
                self.supportstatus = Some(rest.to_string());
                self.override_supportstatus = true;
            }
            None => {
                self.supportstatus = Some(status.to_string());
                self.override_supportstatus = false;
            }
        }
    }

    fn index(&self) -> &BTreeMap<String, Vec<usize>> {
        self.by_name.get_or_init(|| {
            let mut index: BTreeMap<String, Vec<usize>> = BTreeMap::new();
            for (i, sel) in self.selectors.iter().enumerate() {
                index.entry(sel.name.clone()).or_default().push(i);
            }
            index
        })
    }

    fn replace(&mut self, selectors: Vec<Selector>) {
        self.selectors = selectors;
        self.by_name = OnceCell::new();
    }

    /// Selectors for `name`, in insertion order.
    pub fn named<'s>(&'s self, name: &str) -> impl Iterator<Item = &'s Selector> + 's {
        self.index()
            .get(name)
            .into_iter()
            .flatten()
            .map(move |&i| &self.selectors[i])
    }

    /// Append one selector per spec, tagged with this set's provenance.
    pub fn add_specs<S: AsRef<str>>(&mut self, specs: &[S]) -> Result<(), ComposeError> {
        let parsed = specs
            .iter()
            .map(|spec| {
                let mut sel = Selector::parse(spec.as_ref())?;
                sel.supportstatus = self.supportstatus.clone();
                sel.ignore_binaries_newer_than = self.ignore_binaries_newer_than;
                Ok(sel)
            })
            .collect::<Result<Vec<_>, ComposeError>>()?;
        let mut selectors = std::mem::take(&mut self.selectors);
        selectors.extend(parsed);
        self.replace(selectors);
        Ok(())
    }

    /// Append the selectors of `other` not already present.
    pub fn add(&mut self, other: &PackageSet) {
        let mut seen: HashSet<Selector> = self.selectors.iter().cloned().collect();
        let mut selectors = std::mem::take(&mut self.selectors);
        for sel in &other.selectors {
            if seen.contains(sel) {
                continue;
            }
            let mut sel = sel.clone();
            if self.override_supportstatus
                || (self.supportstatus.is_some() && sel.supportstatus.is_none())
            {
                sel.supportstatus = self.supportstatus.clone();
            }
            seen.insert(sel.clone());
            selectors.push(sel);
        }
        self.replace(selectors);
    }

    /// Remove everything `other` selects. Order of the survivors is kept.
    pub fn sub(&mut self, other: &PackageSet) -> Result<(), ComposeError> {
        let mut kept = Vec::with_capacity(self.selectors.len());
        for sel in &self.selectors {
            let mut current = Some(sel.clone());
            for osel in other.named(&sel.name) {
                let Some(s) = current.take() else { break };
                current = s.sub(osel)?;
            }
            kept.extend(current);
        }
        self.replace(kept);
        Ok(())
    }

    /// Keep only what both sets select.
    pub fn intersect(&mut self, other: &PackageSet) -> Result<(), ComposeError> {
        let mut kept: Vec<Selector> = Vec::new();
        let mut seen: HashSet<Selector> = HashSet::new();
        for sel in &self.selectors {
            for osel in other.named(&sel.name) {
                if let Some(isel) = sel.intersect(osel)? {
                    if seen.insert(isel.clone()) {
                        kept.push(isel);
                    }
                }
            }
        }
        self.replace(kept);
        Ok(())
    }

    /// Distinct selector names.
    pub fn names(&self) -> BTreeSet<&str> {
        self.index().keys().map(String::as_str).collect()
    }

    /// Whether some selector for the package's name matches it.
    pub fn matchespkg(&self, arch: Option<&str>, pkg: &Package) -> bool {
        self.named(&pkg.name).any(|sel| sel.matches(arch, pkg))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Selector> {
        self.selectors.iter()
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }
}

impl<'a> IntoIterator for &'a PackageSet {
    type Item = &'a Selector;
    type IntoIter = std::slice::Iter<'a, Selector>;

    fn into_iter(self) -> Self::IntoIter {
        self.selectors.iter()
    }
}

impl fmt::Display for PackageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, sel) in self.selectors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{sel}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(name: &str, specs: &[&str]) -> PackageSet {
        let mut s = PackageSet::new(name);
        s.add_specs(specs).unwrap();
        s
    }

    fn rendered(s: &PackageSet) -> Vec<String> {
        s.iter().map(|sel| sel.to_string()).collect()
    }

    #[test]
    fn add_specs_tags_selectors() {
        let mut s = PackageSet::new("base");
        s.set_supportstatus("l3");
        s.ignore_binaries_newer_than = Some(1_700_000_000);
        s.add_specs(&["bash", "zypper >= 1.14"]).unwrap();
        assert_eq!(s.len(), 2);
        assert!(s.iter().all(|sel| sel.supportstatus.as_deref() == Some("l3")));
        assert!(s.iter().all(|sel| sel.ignore_binaries_newer_than == Some(1_700_000_000)));
    }

    #[test]
    fn add_specs_rejects_bad_spec() {
        let mut s = PackageSet::new("base");
        assert!(s.add_specs(&["bash", "zypper >="]).is_err());
    }

    #[test]
    fn add_deduplicates() {
        let mut s = set("main", &["bash", "zypper >= 1.14"]);
        let other = set("other", &["zypper>=1.14", "vim"]);
        s.add(&other);
        s.add(&other);
        assert_eq!(rendered(&s), vec!["bash", "zypper >= 1.14", "vim"]);
        assert_eq!(s.names().into_iter().collect::<Vec<_>>(), vec!["bash", "vim", "zypper"]);
    }

    #[test]
    fn add_inherits_missing_supportstatus() {
        let mut dest = PackageSet::new("main");
        dest.set_supportstatus("l2");
        let mut tagged = PackageSet::new("tagged");
        tagged.set_supportstatus("l3");
        tagged.add_specs(&["bash"]).unwrap();
        let untagged = set("untagged", &["vim"]);
        dest.add(&tagged);
        dest.add(&untagged);
        let tags: Vec<_> = dest.iter().map(|s| s.supportstatus.clone()).collect();
        assert_eq!(tags, vec![Some("l3".to_string()), Some("l2".to_string())]);
    }

    #[test]
    fn add_override_replaces_supportstatus() {
        let mut dest = PackageSet::new("main");
        dest.set_supportstatus("=unsupported");
        assert!(dest.override_supportstatus);
        let mut tagged = PackageSet::new("tagged");
        tagged.set_supportstatus("l3");
        tagged.add_specs(&["bash"]).unwrap();
        dest.add(&tagged);
        assert_eq!(
            dest.iter().next().unwrap().supportstatus.as_deref(),
            Some("unsupported")
        );
        // The source set is untouched
        assert_eq!(tagged.iter().next().unwrap().supportstatus.as_deref(), Some("l3"));
    }

    #[test]
    fn sub_folds_over_same_name() {
        let mut s = set("main", &["bash", "zypper", "vim >= 9"]);
        let other = set("other", &["bash", "zypper < 1.14", "zypper = 1.14", "emacs"]);
        s.sub(&other).unwrap();
        assert_eq!(rendered(&s), vec!["zypper > 1.14", "vim >= 9"]);
    }

    #[test]
    fn sub_propagates_errors() {
        let mut s = set("main", &["zypper >= 1.0"]);
        let other = set("other", &["zypper = 2.0"]);
        assert!(s.sub(&other).is_err());
    }

    #[test]
    fn intersect_pairs() {
        let mut s = set("main", &["bash", "zypper >= 1.14", "vim"]);
        let other = set("other", &["zypper = 1.15", "zypper = 1.16", "bash", "emacs"]);
        s.intersect(&other).unwrap();
        assert_eq!(rendered(&s), vec!["bash", "zypper = 1.15", "zypper = 1.16"]);
    }

    #[test]
    fn intersect_deduplicates() {
        let mut s = set("main", &["zypper >= 1.0", "zypper >= 1.1"]);
        let other = set("other", &["zypper = 2.0"]);
        s.intersect(&other).unwrap();
        assert_eq!(rendered(&s), vec!["zypper = 2.0"]);
    }

    #[test]
    fn index_is_rebuilt_after_mutation() {
        let mut s = set("main", &["bash"]);
        assert_eq!(s.names().len(), 1);
        s.add_specs(&["vim"]).unwrap();
        assert_eq!(s.names().len(), 2);
        s.sub(&set("x", &["vim"])).unwrap();
        assert_eq!(s.names().into_iter().collect::<Vec<_>>(), vec!["bash"]);
    }

    #[test]
    fn matchespkg_uses_selectors_of_same_name() {
        use prodcomp_core::header::PackageHeader;
        use std::path::Path;

        let pkg = |name: &str, version: &str, arch: &str| {
            let header = PackageHeader {
                name: name.to_string(),
                version: version.to_string(),
                release: "1.1".to_string(),
                arch: arch.to_string(),
                ..Default::default()
            };
            Package::from_header(header, Path::new("x.rpm"), Path::new("x.rpm"))
        };
        let s = set("main", &["bash", "zypper >= 1.14.71", "zypper < 1.0"]);
        assert!(s.matchespkg(Some("x86_64"), &pkg("bash", "5.2", "x86_64")));
        assert!(s.matchespkg(Some("x86_64"), &pkg("zypper", "1.14.89", "noarch")));
        assert!(s.matchespkg(None, &pkg("zypper", "0.9", "x86_64")));
        assert!(!s.matchespkg(Some("x86_64"), &pkg("zypper", "1.14.50", "x86_64")));
        assert!(!s.matchespkg(Some("x86_64"), &pkg("vim", "9.1", "x86_64")));
        assert!(!s.matchespkg(Some("aarch64"), &pkg("bash", "5.2", "x86_64")));
    }

    #[test]
    fn display() {
        let s = set("base", &["bash", "zypper >= 1.14"]);
        assert_eq!(s.to_string(), "base(bash, zypper >= 1.14)");
    }
}
