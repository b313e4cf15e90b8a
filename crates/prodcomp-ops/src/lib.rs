//! High-level operations behind the `prodcomp` commands.

pub mod ops_plan;
pub mod ops_query;
pub mod ops_resolve;
pub mod ops_setup;
pub mod ops_verify;
