//! Selectors that found nothing in the pool.

use std::fmt;

use serde::Serialize;

/// What kind of lookup came up empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissKind {
    Package,
    Source,
    Unpack,
}

impl fmt::Display for MissKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissKind::Package => f.write_str("package"),
            MissKind::Source => f.write_str("source"),
            MissKind::Unpack => f.write_str("unpack"),
        }
    }
}

/// One unmatched lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Miss {
    pub kind: MissKind,
    pub arch: String,
    /// The selector or `name = version-release` that was looked up.
    pub wanted: String,
    /// Binary package whose source was missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_by: Option<String>,
}

impl Miss {
    pub fn new(kind: MissKind, arch: &str, wanted: impl Into<String>) -> Self {
        Self {
            kind,
            arch: arch.to_string(),
            wanted: wanted.into(),
            required_by: None,
        }
    }

    pub fn required_by(mut self, nevra: impl Into<String>) -> Self {
        self.required_by = Some(nevra.into());
        self
    }
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.wanted, self.arch)?;
        if let Some(by) = &self.required_by {
            write!(f, " required by {by}")?;
        }
        Ok(())
    }
}

/// Accumulated misses of a selection pass. Reported, never raised.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct MissReport {
    pub misses: Vec<Miss>,
}

impl MissReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, miss: Miss) {
        self.misses.push(miss);
    }

    pub fn extend(&mut self, other: MissReport) {
        self.misses.extend(other.misses);
    }

    pub fn is_empty(&self) -> bool {
        self.misses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.misses.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Miss> {
        self.misses.iter()
    }
}

impl fmt::Display for MissReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.misses.is_empty() {
            return write!(f, "No missing packages.");
        }
        writeln!(f, "Missing packages ({}):", self.misses.len())?;
        for miss in &self.misses {
            writeln!(f, "  {miss}")?;
        }
        Ok(())
    }
}
