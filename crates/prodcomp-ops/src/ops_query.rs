//! Operation: look packages up in the scanned pool.

use prodcomp_core::evr::{Evr, Op};
use prodcomp_core::package::{Package, VersionConstraint};
use prodcomp_util::errors::ComposeError;

use crate::ops_setup::{load_pool, SetupOptions};

/// Options for `prodcomp query`.
#[derive(Debug, Default, Clone)]
pub struct QueryOptions {
    pub setup: SetupOptions,
    pub name: String,
    pub arch: Option<String>,
    /// List every match instead of the best one.
    pub all: bool,
    /// `OP EVR`, e.g. `[">=", "1.14.71"]`.
    pub constraint: Vec<String>,
}

/// Parse `OP EVR` tokens into a constraint.
pub fn parse_constraint(tokens: &[String]) -> Result<Option<VersionConstraint>, ComposeError> {
    match tokens {
        [] => Ok(None),
        [op, evr] => {
            let op = Op::parse(op).ok_or_else(|| ComposeError::InvalidSelector {
                spec: tokens.join(" "),
            })?;
            Ok(Some(VersionConstraint::new(op, Evr::parse(evr))))
        }
        _ => Err(ComposeError::InvalidSelector {
            spec: tokens.join(" "),
        }),
    }
}

pub fn query(opts: &QueryOptions) -> miette::Result<()> {
    let constraint = parse_constraint(&opts.constraint)?;
    let pool = load_pool(&opts.setup)?;
    let arch = opts.arch.as_deref();

    let found: Vec<&Package> = if opts.all {
        pool.lookup_all(arch, &opts.name, constraint.as_ref())
    } else {
        pool.lookup_best(arch, &opts.name, constraint.as_ref())
            .into_iter()
            .collect()
    };

    if found.is_empty() {
        return Err(ComposeError::Generic {
            message: format!("No package matches {}", opts.name),
        }
        .into());
    }
    for pkg in found {
        println!("{pkg}  {}", pkg.origin.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn no_tokens_no_constraint() {
        assert!(parse_constraint(&[]).unwrap().is_none());
    }

    #[test]
    fn op_and_evr() {
        let c = parse_constraint(&tokens(&[">=", "1:1.14-2.1"])).unwrap().unwrap();
        assert_eq!(c.op, Op::GE);
        assert_eq!(c.evr.epoch.as_deref(), Some("1"));
        assert_eq!(c.evr.release.as_deref(), Some("2.1"));
    }

    #[test]
    fn bad_tokens() {
        assert!(parse_constraint(&tokens(&["~>", "1.0"])).is_err());
        assert!(parse_constraint(&tokens(&[">="])).is_err());
    }
}
