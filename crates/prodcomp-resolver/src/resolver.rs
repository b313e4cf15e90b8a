//! Named package set resolution: recursive add/sub/intersect composition of
//! `[[packagesets]]` declarations with memoization and cycle detection.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use tracing::{debug, trace};

use prodcomp_core::manifest::PackageSetDecl;
use prodcomp_core::package::is_debug_name;
use prodcomp_util::errors::ComposeError;

use crate::pkgset::PackageSet;
use crate::pool::Pool;

/// Synthetic set holding every non-debug package name of the pool.
pub const ALL_SET: &str = "__all__";

/// Set composition operator of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Add,
    Sub,
    Intersect,
}

impl SetOp {
    /// Application order within one declaration.
    pub const ORDER: [SetOp; 3] = [SetOp::Add, SetOp::Sub, SetOp::Intersect];

    fn operands(self, decl: &PackageSetDecl) -> &[String] {
        match self {
            SetOp::Add => &decl.add,
            SetOp::Sub => &decl.sub,
            SetOp::Intersect => &decl.intersect,
        }
    }

    fn apply(self, target: &mut PackageSet, operand: &PackageSet) -> Result<(), ComposeError> {
        match self {
            SetOp::Add => {
                target.add(operand);
                Ok(())
            }
            SetOp::Sub => target.sub(operand),
            SetOp::Intersect => target.intersect(operand),
        }
    }
}

impl fmt::Display for SetOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOp::Add => f.write_str("add"),
            SetOp::Sub => f.write_str("sub"),
            SetOp::Intersect => f.write_str("intersect"),
        }
    }
}

/// A set reference with optional context overrides:
/// `name [architecture=A] [flavor=F]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOperand {
    pub name: String,
    pub arch: Option<String>,
    /// `Some("")` is treated like `None`.
    pub flavor: Option<String>,
}

impl SetOperand {
    pub fn parse(reference: &str) -> Result<Self, ComposeError> {
        let invalid = || ComposeError::InvalidSetReference {
            reference: reference.to_string(),
        };
        let mut tokens = reference.split_whitespace();
        let name = tokens.next().ok_or_else(invalid)?;
        if name.contains('=') {
            return Err(invalid());
        }
        let mut operand = SetOperand {
            name: name.to_string(),
            arch: None,
            flavor: None,
        };
        for token in tokens {
            if let Some(arch) = token.strip_prefix("architecture=") {
                if arch.is_empty() {
                    return Err(invalid());
                }
                operand.arch = Some(arch.to_string());
            } else if let Some(flavor) = token.strip_prefix("flavor=") {
                operand.flavor = Some(flavor.to_string());
            } else {
                return Err(invalid());
            }
        }
        Ok(operand)
    }

    /// Architecture and flavor to resolve this operand in.
    fn context<'a>(&'a self, arch: &'a str, flavor: Option<&'a str>) -> (&'a str, Option<&'a str>) {
        let arch = self.arch.as_deref().unwrap_or(arch);
        let flavor = match self.flavor.as_deref() {
            Some(f) if !f.is_empty() => Some(f),
            _ => flavor,
        };
        (arch, flavor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SetKey {
    arch: String,
    flavor: String,
    name: String,
}

impl SetKey {
    fn new(arch: &str, flavor: Option<&str>, name: &str) -> Self {
        Self {
            arch: arch.to_string(),
            flavor: flavor.unwrap_or_default().to_string(),
            name: name.to_string(),
        }
    }
}

#[derive(Debug)]
enum SetState {
    InProgress,
    Done(PackageSet),
}

/// Declarations active in one `(arch, flavor)` context. Known names whose
/// declarations are all filtered out map to `None`.
type Visible<'a> = BTreeMap<&'a str, Option<&'a PackageSetDecl>>;

/// Owns the memo table of one build invocation.
///
/// Resolving the same `(arch, flavor, name)` twice returns the memoized
/// result; a context is never shared between independent builds.
pub struct ResolutionContext<'a> {
    decls: &'a [PackageSetDecl],
    pool: Option<&'a Pool>,
    states: HashMap<SetKey, SetState>,
    all_sets: HashMap<String, PackageSet>,
    visible: HashMap<(String, String), Visible<'a>>,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(decls: &'a [PackageSetDecl], pool: Option<&'a Pool>) -> Self {
        Self {
            decls,
            pool,
            states: HashMap::new(),
            all_sets: HashMap::new(),
            visible: HashMap::new(),
        }
    }

    /// Resolve `reference` (a set name, optionally with
    /// `architecture=`/`flavor=` overrides) for `arch` and `flavor`.
    pub fn resolve(
        &mut self,
        arch: &str,
        flavor: Option<&str>,
        reference: &str,
    ) -> Result<PackageSet, ComposeError> {
        let operand = SetOperand::parse(reference)?;
        let (arch, flavor) = operand.context(arch, flavor);
        self.resolve_named(arch, flavor, &operand.name)
    }

    /// Union of several sets, in order, as one set called `name`.
    pub fn resolve_union<S: AsRef<str>>(
        &mut self,
        name: &str,
        arch: &str,
        flavor: Option<&str>,
        references: &[S],
    ) -> Result<PackageSet, ComposeError> {
        let mut union = PackageSet::new(name);
        for reference in references {
            let set = self.resolve(arch, flavor, reference.as_ref())?;
            union.add(&set);
        }
        Ok(union)
    }

    fn resolve_named(
        &mut self,
        arch: &str,
        flavor: Option<&str>,
        name: &str,
    ) -> Result<PackageSet, ComposeError> {
        if name == ALL_SET {
            return self.all_set(arch);
        }

        let key = SetKey::new(arch, flavor, name);
        match self.states.get(&key) {
            Some(SetState::InProgress) => {
                return Err(ComposeError::CyclicSet {
                    name: name.to_string(),
                })
            }
            Some(SetState::Done(set)) => {
                trace!("package set {name} for {arch}/{} is memoized", key.flavor);
                return Ok(set.clone());
            }
            None => {}
        }
        self.states.insert(key.clone(), SetState::InProgress);
        match self.build_set(arch, flavor, name, &key) {
            Ok(set) => {
                debug!("resolved {set} for {arch}/{}", key.flavor);
                self.states.insert(key, SetState::Done(set.clone()));
                Ok(set)
            }
            Err(e) => {
                // a later lookup must not mistake the aborted set for a cycle
                self.states.remove(&key);
                Err(e)
            }
        }
    }

    fn build_set(
        &mut self,
        arch: &str,
        flavor: Option<&str>,
        name: &str,
        key: &SetKey,
    ) -> Result<PackageSet, ComposeError> {
        let decl = {
            let visible = self.visible(arch, flavor)?;
            match visible.get(name) {
                None => {
                    return Err(ComposeError::UnknownSet {
                        name: name.to_string(),
                    })
                }
                Some(decl) => *decl,
            }
        };

        let mut set = PackageSet::new(name);
        if let Some(decl) = decl {
            if let Some(status) = decl.supportstatus.as_deref().filter(|s| !s.is_empty()) {
                set.set_supportstatus(status);
            }
            set.ignore_binaries_newer_than = decl.ignore_binaries_newer_than;
            set.add_specs(&decl.packages)?;

            for op in SetOp::ORDER {
                for reference in op.operands(decl) {
                    let operand = SetOperand::parse(reference)?;
                    let (oarch, oflavor) = operand.context(arch, flavor);
                    let other = self.resolve_named(oarch, oflavor, &operand.name)?;
                    op.apply(&mut set, &other)?;
                }
            }
        } else {
            debug!("package set {name} does not apply to {arch}/{}", key.flavor);
        }
        Ok(set)
    }

    fn all_set(&mut self, arch: &str) -> Result<PackageSet, ComposeError> {
        if let Some(set) = self.all_sets.get(arch) {
            return Ok(set.clone());
        }
        let pool = self.pool.ok_or_else(|| ComposeError::MissingPool {
            set: ALL_SET.to_string(),
        })?;
        let names: Vec<&str> = pool
            .names(Some(arch))
            .into_iter()
            .filter(|n| !is_debug_name(n))
            .collect();
        let mut set = PackageSet::new(ALL_SET);
        set.add_specs(&names)?;
        debug!("{ALL_SET} for {arch} has {} packages", set.len());
        self.all_sets.insert(arch.to_string(), set.clone());
        Ok(set)
    }

    /// Declarations visible in `(arch, flavor)`, computed once per context.
    fn visible(&mut self, arch: &str, flavor: Option<&str>) -> Result<&Visible<'a>, ComposeError> {
        let key = (arch.to_string(), flavor.unwrap_or_default().to_string());
        let table = match self.visible.entry(key) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => e.insert(filter_decls(self.decls, arch, flavor)?),
        };
        Ok(table)
    }
}

/// Map every declared name to its single active declaration, if any.
fn filter_decls<'a>(
    decls: &'a [PackageSetDecl],
    arch: &str,
    flavor: Option<&str>,
) -> Result<Visible<'a>, ComposeError> {
    let mut table: Visible<'a> = BTreeMap::new();
    for decl in decls {
        let slot = table.entry(decl.name.as_str()).or_insert(None);
        if !decl.applies_to(arch, flavor.filter(|f| !f.is_empty())) {
            continue;
        }
        if slot.is_some() {
            return Err(ComposeError::DuplicateSet {
                name: decl.name.clone(),
            });
        }
        *slot = Some(decl);
    }
    Ok(table)
}
