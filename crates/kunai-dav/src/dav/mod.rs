//! DeltaV resource model.
//!
//! [`uri`] classifies request paths into typed descriptors, [`resource`]
//! binds a descriptor to repository state and dispatches per-type
//! preparation, [`if_header`] parses conditional-request headers, and
//! [`lock`] carries the lock model and lock-token resolution.

pub mod if_header;
pub mod lock;
pub mod resource;
pub mod uri;

pub use if_header::{IfList, IfState, StateTokenKind, parse_if_header};
pub use lock::{Depth, Lock, LockRecord, LockScope, LockStore, resolve_lock_token};
pub use resource::{ClientOptions, Resource};
pub use uri::{ResourceKind, ResourceType, ResourceUri};
