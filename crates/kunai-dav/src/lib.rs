//! Kunai SVN-over-`WebDAV` server - DeltaV protocol crate.
//!
//! This crate implements the resource-addressing half of the protocol:
//! classifying request URIs into typed resource descriptors, preparing
//! resources against the versioned filesystem, parsing conditional
//! request (`If:`) headers, and resolving lock tokens. The versioned
//! filesystem, activity store, and lock store are injected collaborator
//! traits defined in [`fs`] and [`dav::lock`].

pub mod dav;
pub mod error;
pub mod fs;

pub use error::{DavError, DavResult, ErrorCause};
