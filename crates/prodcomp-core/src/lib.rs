//! Core data types for prodcomp.
//!
//! This crate defines what a product composition works on: RPM version
//! ordering, package headers and descriptors, update notice documents, the
//! product declaration with its flavors, global configuration and support
//! status overrides.
//!
//! This crate is intentionally free of resolution logic; see `prodcomp-resolver`.

pub mod config;
pub mod evr;
pub mod flavor;
pub mod header;
pub mod manifest;
pub mod package;
pub mod supportstatus;
pub mod updateinfo;
