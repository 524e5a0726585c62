//! Kunai SVN-over-`WebDAV` server - core crate.
//!
//! Shared foundation for the workspace: error types, configuration
//! loading, protocol constants, and repository path utilities.

pub mod config;
pub mod constants;
pub mod error;
pub mod util;
