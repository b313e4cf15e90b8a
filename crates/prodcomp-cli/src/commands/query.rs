//! Handler for `prodcomp query`.

use miette::Result;

use prodcomp_ops::ops_query::{self, QueryOptions};
use prodcomp_ops::ops_setup::SetupOptions;

pub fn exec(
    setup: SetupOptions,
    name: String,
    arch: Option<String>,
    all: bool,
    constraint: Vec<String>,
) -> Result<()> {
    let opts = QueryOptions {
        setup,
        name,
        arch,
        all,
        constraint,
    };
    ops_query::query(&opts)
}
