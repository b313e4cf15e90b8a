//! RPM label (epoch, version, release) parsing, comparison and operator sets.
//!
//! Version strings use RPM's `rpmvercmp` ordering:
//! - Segments are runs of digits or runs of letters; everything else separates
//! - Numeric segments compare as numbers and always outrank alpha segments
//! - `~` sorts before anything, even the end of the string (`1.0~rc1 < 1.0`)
//! - `^` sorts after the end of the string but before any other segment
//!   (`1.0 < 1.0^git1 < 1.0.1`)

use std::cmp::Ordering;
use std::fmt;

/// Compare two version or release strings with RPM semantics.
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let one = a.as_bytes();
    let two = b.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    while i < one.len() || j < two.len() {
        while i < one.len() && !is_segment_start(one[i]) {
            i += 1;
        }
        while j < two.len() && !is_segment_start(two[j]) {
            j += 1;
        }

        let c1 = one.get(i).copied();
        let c2 = two.get(j).copied();

        if c1 == Some(b'~') || c2 == Some(b'~') {
            if c1 != Some(b'~') {
                return Ordering::Greater;
            }
            if c2 != Some(b'~') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if c1 == Some(b'^') || c2 == Some(b'^') {
            if c1.is_none() {
                return Ordering::Less;
            }
            if c2.is_none() {
                return Ordering::Greater;
            }
            if c1 != Some(b'^') {
                return Ordering::Greater;
            }
            if c2 != Some(b'^') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if i >= one.len() || j >= two.len() {
            break;
        }

        let numeric = one[i].is_ascii_digit();
        let end1 = segment_end(one, i, numeric);
        let end2 = segment_end(two, j, numeric);

        // Segment types differ: numeric always wins over alpha
        if end2 == j {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let mut seg1 = &one[i..end1];
        let mut seg2 = &two[j..end2];
        if numeric {
            seg1 = strip_leading_zeros(seg1);
            seg2 = strip_leading_zeros(seg2);
            match seg1.len().cmp(&seg2.len()) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        match seg1.cmp(seg2) {
            Ordering::Equal => {}
            other => return other,
        }

        i = end1;
        j = end2;
    }

    match (i >= one.len(), j >= two.len()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

fn is_segment_start(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'~' || c == b'^'
}

fn segment_end(s: &[u8], start: usize, numeric: bool) -> usize {
    let same_class = |c: u8| {
        if numeric {
            c.is_ascii_digit()
        } else {
            c.is_ascii_alphabetic()
        }
    };
    s[start..]
        .iter()
        .position(|&c| !same_class(c))
        .map_or(s.len(), |offset| start + offset)
}

fn strip_leading_zeros(seg: &[u8]) -> &[u8] {
    let first = seg.iter().position(|&c| c != b'0').unwrap_or(seg.len());
    &seg[first..]
}

/// An epoch/version/release triple.
///
/// `epoch` and `release` may be absent. In [`compare`] an absent epoch
/// counts as `0` and an absent release sorts before any present one; callers
/// wanting wildcard semantics substitute the other side's value first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Evr {
    pub epoch: Option<String>,
    pub version: String,
    pub release: Option<String>,
}

impl Evr {
    pub fn new(epoch: Option<&str>, version: &str, release: Option<&str>) -> Self {
        Self {
            epoch: epoch.map(str::to_string),
            version: version.to_string(),
            release: release.map(str::to_string),
        }
    }

    /// Parse `[epoch:]version[-release]`. The release is split at the last `-`.
    pub fn parse(s: &str) -> Self {
        let (epoch, rest) = match s.split_once(':') {
            Some((e, rest)) => (Some(e.to_string()), rest),
            None => (None, s),
        };
        let (version, release) = match rest.rsplit_once('-') {
            Some((v, r)) => (v.to_string(), Some(r.to_string())),
            None => (rest.to_string(), None),
        };
        Self {
            epoch,
            version,
            release,
        }
    }

    /// Epoch with `None` and the empty string normalized to `"0"`.
    pub fn epoch_or_zero(&self) -> &str {
        match self.epoch.as_deref() {
            None | Some("") => "0",
            Some(e) => e,
        }
    }
}

impl fmt::Display for Evr {
    /// `epoch:` is omitted when it is absent or `0`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let epoch = self.epoch_or_zero();
        if epoch != "0" {
            write!(f, "{epoch}:")?;
        }
        f.write_str(&self.version)?;
        if let Some(ref release) = self.release {
            write!(f, "-{release}")?;
        }
        Ok(())
    }
}

/// Compare two EVR triples: epoch first, then version, then release.
pub fn compare(a: &Evr, b: &Evr) -> Ordering {
    rpmvercmp(a.epoch_or_zero(), b.epoch_or_zero())
        .then_with(|| rpmvercmp(&a.version, &b.version))
        .then_with(|| match (&a.release, &b.release) {
            (None, None) => Ordering::Equal,
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (Some(r1), Some(r2)) => rpmvercmp(r1, r2),
        })
}

/// A version comparison operator stored as the set of outcomes it accepts.
///
/// `<=` is `{<, =}`; the set `{<, >}` (produced by subtracting `=` from an
/// unconstrained selector) means "not equal".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Op {
    pub lt: bool,
    pub eq: bool,
    pub gt: bool,
}

impl Op {
    pub const LT: Op = Op::new(true, false, false);
    pub const LE: Op = Op::new(true, true, false);
    pub const EQ: Op = Op::new(false, true, false);
    pub const GE: Op = Op::new(false, true, true);
    pub const GT: Op = Op::new(false, false, true);
    pub const ALL: Op = Op::new(true, true, true);

    pub const fn new(lt: bool, eq: bool, gt: bool) -> Self {
        Self { lt, eq, gt }
    }

    /// Parse one of `<`, `<=`, `=`, `==`, `>=`, `>` (also accepts `=<`/`=>`).
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || s.len() > 2 {
            return None;
        }
        let mut op = Op::default();
        for c in s.chars() {
            match c {
                '<' => op.lt = true,
                '>' => op.gt = true,
                '=' => op.eq = true,
                _ => return None,
            }
        }
        if op.lt && op.gt {
            return None;
        }
        Some(op)
    }

    pub fn is_empty(&self) -> bool {
        !(self.lt || self.eq || self.gt)
    }

    /// Symbols of `self` not present in `other`.
    pub fn without(self, other: Op) -> Op {
        Op::new(
            self.lt && !other.lt,
            self.eq && !other.eq,
            self.gt && !other.gt,
        )
    }

    /// Symbols present in both.
    pub fn intersect(self, other: Op) -> Op {
        Op::new(self.lt && other.lt, self.eq && other.eq, self.gt && other.gt)
    }

    /// Whether a comparison outcome (`candidate` vs. anchor) is accepted.
    pub fn accepts(&self, outcome: Ordering) -> bool {
        match outcome {
            Ordering::Less => self.lt,
            Ordering::Equal => self.eq,
            Ordering::Greater => self.gt,
        }
    }
}

impl fmt::Display for Op {
    /// Canonical symbol order is `<`, `>`, `=`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lt {
            f.write_str("<")?;
        }
        if self.gt {
            f.write_str(">")?;
        }
        if self.eq {
            f.write_str("=")?;
        }
        Ok(())
    }
}
