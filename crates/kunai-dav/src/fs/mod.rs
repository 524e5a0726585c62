//! Collaborator interfaces for the versioned filesystem.
//!
//! The storage engine itself lives outside this crate; everything here
//! is consumed through these traits so the protocol layer can be tested
//! against in-memory fakes. All calls are synchronous and a failure is
//! always fatal to the current request (no internal retry).

mod activity;

pub use activity::FsActivityStore;

use thiserror::Error;

/// A repository revision number.
pub type Revision = u64;

/// Collaborator failures, wrapped into [`crate::DavError`] at the
/// protocol boundary.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No such revision: {0}")]
    NoSuchRevision(Revision),

    #[error("No such transaction: {0}")]
    NoSuchTransaction(String),

    #[error("No such node: {0}")]
    NoSuchNode(String),

    #[error("Invalid activity id: {0}")]
    InvalidActivityId(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type FsResult<T> = std::result::Result<T, FsError>;

/// Kind of a node in a revision or transaction tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// No node at the path.
    None,
    File,
    Dir,
}

/// An opened revision or transaction root.
///
/// Opaque to the protocol layer: handed back to the filesystem on every
/// node operation. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootHandle {
    Revision(Revision),
    Transaction(String),
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: NodeKind,
}

/// The versioned filesystem consumed by resource preparation and the
/// resource read operations.
pub trait VersionedFs {
    /// Youngest revision in the repository.
    fn latest_revision(&self) -> FsResult<Revision>;

    /// Opens a root for the given revision.
    fn open_revision_root(&self, rev: Revision) -> FsResult<RootHandle>;

    /// Classifies the node at `path` under `root`.
    fn node_kind(&self, root: &RootHandle, path: &str) -> FsResult<NodeKind>;

    /// Verifies that the named transaction exists and is open.
    fn open_transaction(&self, name: &str) -> FsResult<()>;

    /// Opens the root of an open transaction.
    fn transaction_root(&self, name: &str) -> FsResult<RootHandle>;

    /// Reads a transaction property.
    fn transaction_prop(&self, name: &str, prop: &str) -> FsResult<Option<String>>;

    /// Sets a transaction property.
    fn set_transaction_prop(&self, name: &str, prop: &str, value: &str) -> FsResult<()>;

    /// Reads a revision property.
    fn revision_prop(&self, rev: Revision, prop: &str) -> FsResult<Option<String>>;

    /// Full content of the file at `path`.
    fn file_content(&self, root: &RootHandle, path: &str) -> FsResult<Vec<u8>>;

    /// Entries of the directory at `path`.
    fn dir_entries(&self, root: &RootHandle, path: &str) -> FsResult<Vec<DirEntry>>;

    /// Revision in which the node at `path` was last changed.
    fn created_revision(&self, root: &RootHandle, path: &str) -> FsResult<Revision>;
}

/// The activity-to-transaction mapping.
///
/// One entry per activity; writes must be atomic so that concurrent
/// readers never observe a half-written transaction name.
pub trait ActivityStore {
    /// Transaction name bound to the activity, if any.
    fn transaction_name(&self, activity_id: &str) -> FsResult<Option<String>>;

    /// Binds an activity to a transaction name.
    fn store(&self, activity_id: &str, txn_name: &str) -> FsResult<()>;

    /// Removes an activity binding. Deleting an absent entry is not an
    /// error.
    fn delete(&self, activity_id: &str) -> FsResult<()>;
}
