//! Handler for `prodcomp plan`.

use miette::Result;

use prodcomp_ops::ops_plan::{self, PlanOptions};
use prodcomp_ops::ops_setup::SetupOptions;

pub fn exec(setup: SetupOptions, flavor: Option<String>, json: bool) -> Result<()> {
    ops_plan::plan(&PlanOptions {
        setup,
        flavor,
        json,
    })
}
