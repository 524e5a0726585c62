//! Kunai SVN-over-`WebDAV` server - path-based authorization.
//!
//! Parses the server's authorization file (an INI-like format with
//! `[groups]`, `[aliases]`, and per-repository path sections) into an
//! immutable [`Policy`] and answers access queries with inheritance up
//! the path tree and subtree propagation for recursive operations.

pub mod access;
pub mod engine;
pub mod error;
pub mod parse;
pub mod policy;

pub use access::Access;
pub use engine::PolicyStore;
pub use error::{AuthzError, AuthzResult};
pub use policy::Policy;
