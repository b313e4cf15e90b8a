//! Operation: print the selectors of resolved package sets.

use prodcomp_resolver::resolver::ResolutionContext;

use crate::ops_setup::{ComposeContext, SetupOptions};

/// Options for `prodcomp resolve`.
#[derive(Debug, Default, Clone)]
pub struct ResolveOptions {
    pub setup: SetupOptions,
    pub flavor: Option<String>,
    /// Only this architecture; defaults to all of the flavor.
    pub arch: Option<String>,
    /// Set references to resolve; defaults to the `content` list.
    pub sets: Vec<String>,
}

pub fn resolve(opts: &ResolveOptions) -> miette::Result<()> {
    let ctx = ComposeContext::load_with_pool(&opts.setup)?;
    let flavor = opts.flavor.as_deref();
    let manifest = ctx.manifest_for(flavor)?;
    let archs = match &opts.arch {
        Some(arch) => vec![arch.clone()],
        None => manifest.architectures.clone(),
    };
    let sets = if opts.sets.is_empty() {
        manifest.content.clone()
    } else {
        opts.sets.clone()
    };

    let mut resolution = ResolutionContext::new(&manifest.packagesets, ctx.pool.as_ref());
    for arch in &archs {
        let set = resolution.resolve_union(&sets.join("+"), arch, flavor, &sets)?;
        println!("{arch}: {} ({} selectors)", set.name, set.len());
        for sel in &set {
            match &sel.supportstatus {
                Some(status) => println!("  {sel} [{status}]"),
                None => println!("  {sel}"),
            }
        }
    }
    Ok(())
}
