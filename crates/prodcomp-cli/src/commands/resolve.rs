//! Handler for `prodcomp resolve`.

use miette::Result;

use prodcomp_ops::ops_resolve::{self, ResolveOptions};
use prodcomp_ops::ops_setup::SetupOptions;

pub fn exec(
    setup: SetupOptions,
    flavor: Option<String>,
    arch: Option<String>,
    sets: Vec<String>,
) -> Result<()> {
    let opts = ResolveOptions {
        setup,
        flavor,
        arch,
        sets,
    };
    ops_resolve::resolve(&opts)
}
