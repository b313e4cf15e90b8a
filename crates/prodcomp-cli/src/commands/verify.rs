//! Handler for `prodcomp verify`.

use miette::Result;

use prodcomp_ops::ops_setup::SetupOptions;
use prodcomp_ops::ops_verify::{self, VerifyOptions};

pub fn exec(setup: SetupOptions, flavor: Option<String>) -> Result<()> {
    ops_verify::verify(&VerifyOptions { setup, flavor })
}
