//! Command dispatch and handler modules.

mod plan;
mod query;
mod resolve;
mod verify;

use miette::Result;

use prodcomp_ops::ops_setup::SetupOptions;

use crate::cli::{Cli, Command, InputArgs};

impl From<InputArgs> for SetupOptions {
    fn from(input: InputArgs) -> Self {
        SetupOptions {
            manifest: input.manifest,
            reposdir: input.reposdir,
        }
    }
}

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Verify { flavor, input } => verify::exec(input.into(), flavor),
        Command::Resolve {
            flavor,
            arch,
            input,
            sets,
        } => resolve::exec(input.into(), flavor, arch, sets),
        Command::Plan {
            flavor,
            json,
            input,
        } => plan::exec(input.into(), flavor, json),
        Command::Query {
            name,
            arch,
            all,
            input,
            constraint,
        } => query::exec(input.into(), name, arch, all, constraint),
    }
}
