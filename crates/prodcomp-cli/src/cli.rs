//! CLI argument definitions for prodcomp.
//!
//! Uses `clap` derive macros to define the full command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "prodcomp",
    version,
    about = "Select the packages of a product build from a repository pool",
    long_about = "prodcomp resolves the named package sets of a ProductCompose.toml \
                  declaration against scanned RPM repositories and reports which \
                  packages a product tree would contain."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Inputs shared by all commands.
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Path to ProductCompose.toml (default: search upwards from the current directory)
    #[arg(long, env = "PRODCOMP_MANIFEST")]
    pub manifest: Option<PathBuf>,
    /// Repository directory to scan for packages and update notices
    #[arg(long)]
    pub reposdir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check the declaration by resolving every package set it uses
    Verify {
        /// Only verify this flavor
        #[arg(long)]
        flavor: Option<String>,
        #[command(flatten)]
        input: InputArgs,
    },

    /// Print the selectors of resolved package sets
    Resolve {
        /// Flavor to resolve for
        #[arg(long)]
        flavor: Option<String>,
        /// Architecture (default: every architecture of the flavor)
        #[arg(short, long)]
        arch: Option<String>,
        #[command(flatten)]
        input: InputArgs,
        /// Set references, e.g. `main` or `base architecture=aarch64` (default: content)
        sets: Vec<String>,
    },

    /// Show which packages a build would place into the product tree
    Plan {
        /// Only plan this flavor
        #[arg(long)]
        flavor: Option<String>,
        /// Print JSON
        #[arg(long)]
        json: bool,
        #[command(flatten)]
        input: InputArgs,
    },

    /// Look a package up in the scanned pool
    Query {
        /// Package name
        name: String,
        /// Architecture (noarch packages match any binary architecture)
        #[arg(short, long)]
        arch: Option<String>,
        /// List every matching package instead of the best one
        #[arg(long)]
        all: bool,
        #[command(flatten)]
        input: InputArgs,
        /// Version constraint: OP [EPOCH:]VERSION[-RELEASE]
        #[arg(last = true, num_args = 0..=2)]
        constraint: Vec<String>,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
