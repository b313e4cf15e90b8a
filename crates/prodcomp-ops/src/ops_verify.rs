//! Operation: validate a product declaration by resolving every set it uses.

use prodcomp_resolver::resolver::ResolutionContext;
use prodcomp_util::errors::ComposeError;
use prodcomp_util::progress;

use crate::ops_setup::{ComposeContext, SetupOptions};

/// Options for `prodcomp verify`.
#[derive(Debug, Default, Clone)]
pub struct VerifyOptions {
    pub setup: SetupOptions,
    /// Only check this flavor.
    pub flavor: Option<String>,
}

/// Resolve `content` and `unpack` sets for every flavor and architecture.
///
/// The pool is scanned only when a repository directory is configured; the
/// `__all__` set cannot be checked without one.
pub fn verify(opts: &VerifyOptions) -> miette::Result<()> {
    let ctx = ComposeContext::load_with_pool(&opts.setup)?;
    progress::status(
        "Verifying",
        &format!("{} ({})", ctx.manifest.name, ctx.manifest_path.display()),
    );

    let mut checked = 0usize;
    for flavor in ctx.flavors(opts.flavor.as_deref())? {
        let flavor = flavor.as_deref();
        let manifest = ctx.manifest_for(flavor)?;
        let label = flavor.unwrap_or("(default)");
        if manifest.architectures.is_empty() {
            return Err(ComposeError::Manifest {
                message: format!("No architecture defined for flavor {label}"),
            }
            .into());
        }

        let mut resolution = ResolutionContext::new(&manifest.packagesets, ctx.pool.as_ref());
        for arch in &manifest.architectures {
            for setname in manifest.content.iter().chain(&manifest.unpack) {
                let set = resolution.resolve(arch, flavor, setname).inspect_err(|e| {
                    if e.is_configuration() {
                        progress::status_warn("Invalid", &format!("{label}/{arch}: {setname}"));
                    }
                })?;
                tracing::debug!("{label}/{arch}: {set}");
                checked += 1;
            }
        }
        progress::status_info(
            "Flavor",
            &format!("{label}: {}", manifest.architectures.join(", ")),
        );
    }

    progress::status("Finished", &format!("{checked} package set(s) resolved"));
    Ok(())
}
