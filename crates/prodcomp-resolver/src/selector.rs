//! Package selectors: a name plus an optional version range.
//!
//! `sub` and `intersect` only produce results expressible as a single
//! selector; anything else is a configuration error.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use prodcomp_core::evr::{compare, Evr, Op};
use prodcomp_core::package::{Package, VersionConstraint};
use prodcomp_util::errors::ComposeError;

/// `name` or `name OP [epoch:]version[-release]`.
#[derive(Debug, Clone)]
pub struct Selector {
    pub name: String,
    /// `None` matches every version of `name`.
    pub constraint: Option<VersionConstraint>,
    pub supportstatus: Option<String>,
    /// Build time cutoff; candidates built later are skipped during selection.
    pub ignore_binaries_newer_than: Option<u64>,
}

impl Selector {
    /// Unconstrained selector for `name`.
    pub fn any(name: &str) -> Self {
        Self {
            name: name.to_string(),
            constraint: None,
            supportstatus: None,
            ignore_binaries_newer_than: None,
        }
    }

    /// Parse a selector. Whitespace is ignored; an omitted epoch is `0`.
    pub fn parse(spec: &str) -> Result<Self, ComposeError> {
        let compact: String = spec.chars().filter(|c| !c.is_whitespace()).collect();
        let invalid = || ComposeError::InvalidSelector {
            spec: spec.to_string(),
        };

        let Some(op_start) = compact.find(['<', '>', '=']) else {
            if compact.is_empty() {
                return Err(invalid());
            }
            return Ok(Self::any(&compact));
        };
        let name = &compact[..op_start];
        let rest = &compact[op_start..];
        let op_len = if rest[1..].starts_with(['<', '>', '=']) { 2 } else { 1 };
        let op = Op::parse(&rest[..op_len]).ok_or_else(invalid)?;
        let value = &rest[op_len..];
        if name.is_empty() || value.is_empty() || value.contains(['<', '>', '=']) {
            return Err(invalid());
        }

        let mut evr = Evr::parse(value);
        if evr.epoch.is_none() {
            evr.epoch = Some("0".to_string());
        }
        if evr.version.is_empty() || evr.epoch.as_deref() == Some("") {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_string(),
            constraint: Some(VersionConstraint::new(op, evr)),
            supportstatus: None,
            ignore_binaries_newer_than: None,
        })
    }

    pub fn op(&self) -> Option<Op> {
        self.constraint.as_ref().map(|c| c.op)
    }

    pub fn release(&self) -> Option<&str> {
        self.constraint
            .as_ref()
            .and_then(|c| c.evr.release.as_deref())
    }

    /// Whether `pkg` is selected for `arch`.
    pub fn matches(&self, arch: Option<&str>, pkg: &Package) -> bool {
        pkg.matches(arch, Some(&self.name), self.constraint.as_ref())
    }

    fn with_constraint(&self, op: Op, evr: &Evr) -> Self {
        Self {
            constraint: Some(VersionConstraint::new(op, evr.clone())),
            ..self.clone()
        }
    }

    /// Versions accepted by `self` but not by `other`.
    ///
    /// Returns `Ok(None)` when nothing is left.
    pub fn sub(&self, other: &Selector) -> Result<Option<Selector>, ComposeError> {
        if self.name != other.name {
            return Ok(Some(self.clone()));
        }
        let Some(oc) = &other.constraint else {
            return Ok(None);
        };
        let Some(sc) = &self.constraint else {
            let op = Op::ALL.without(oc.op);
            return Ok((!op.is_empty()).then(|| self.with_constraint(op, &oc.evr)));
        };

        match anchor_cmp(sc, oc) {
            Ordering::Equal => {
                if sc.evr.release.is_some() != oc.evr.release.is_some() {
                    return Err(self.ambiguous("sub", other));
                }
                let op = sc.op.without(oc.op);
                Ok((!op.is_empty()).then(|| self.with_constraint(op, &sc.evr)))
            }
            Ordering::Less => {
                if sc.op.gt {
                    return Err(self.unrepresentable("sub", other));
                }
                Ok((!oc.op.lt).then(|| self.clone()))
            }
            Ordering::Greater => {
                if sc.op.lt {
                    return Err(self.unrepresentable("sub", other));
                }
                Ok((!oc.op.gt).then(|| self.clone()))
            }
        }
    }

    /// Versions accepted by both `self` and `other`.
    ///
    /// Returns `Ok(None)` for an empty intersection.
    pub fn intersect(&self, other: &Selector) -> Result<Option<Selector>, ComposeError> {
        if self.name != other.name {
            return Ok(None);
        }
        let Some(oc) = &other.constraint else {
            return Ok(Some(self.clone()));
        };
        let Some(sc) = &self.constraint else {
            return Ok(Some(other.clone()));
        };

        let (s, o) = (sc.op, oc.op);
        match anchor_cmp(sc, oc) {
            Ordering::Equal => {
                // Prefer the operand that pins a release
                let basis = if sc.evr.release.is_some() || oc.evr.release.is_none() {
                    self
                } else {
                    other
                };
                let op = s.intersect(o);
                if op.is_empty() {
                    if sc.evr.release.is_some() != oc.evr.release.is_some() {
                        return Err(self.ambiguous("intersect", other));
                    }
                    return Ok(None);
                }
                let evr = basis.constraint.as_ref().map(|c| c.evr.clone()).unwrap_or_default();
                Ok(Some(basis.with_constraint(op, &evr)))
            }
            Ordering::Less => match (s.gt, o.lt) {
                (true, false) => Ok(Some(other.clone())),
                (false, true) => Ok(Some(self.clone())),
                (false, false) => Ok(None),
                (true, true) => Err(self.unrepresentable("intersect", other)),
            },
            Ordering::Greater => match (o.gt, s.lt) {
                (true, false) => Ok(Some(self.clone())),
                (false, true) => Ok(Some(other.clone())),
                (false, false) => Ok(None),
                (true, true) => Err(self.unrepresentable("intersect", other)),
            },
        }
    }

    fn unrepresentable(&self, operation: &str, other: &Selector) -> ComposeError {
        ComposeError::Unrepresentable {
            operation: operation.to_string(),
            lhs: self.to_string(),
            rhs: other.to_string(),
        }
    }

    fn ambiguous(&self, operation: &str, other: &Selector) -> ComposeError {
        ComposeError::Ambiguous {
            operation: operation.to_string(),
            lhs: self.to_string(),
            rhs: other.to_string(),
        }
    }
}

/// Compare the anchors of two constraints; a release missing on one side
/// takes the other side's value.
fn anchor_cmp(a: &VersionConstraint, b: &VersionConstraint) -> Ordering {
    let lhs = Evr {
        release: a.evr.release.clone().or_else(|| b.evr.release.clone()),
        ..a.evr.clone()
    };
    let rhs = Evr {
        release: b.evr.release.clone().or_else(|| a.evr.release.clone()),
        ..b.evr.clone()
    };
    compare(&lhs, &rhs)
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            None => f.write_str(&self.name),
            Some(c) => write!(f, "{} {c}", self.name),
        }
    }
}

/// Selectors are equal when they render the same. Provenance tags are ignored.
impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.to_string() == other.to_string()
    }
}

impl Eq for Selector {}

impl Hash for Selector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}
