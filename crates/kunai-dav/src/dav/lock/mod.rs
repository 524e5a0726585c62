//! Lock model and lock-token resolution.
//!
//! Locks are created by the LOCK method handler (outside this crate)
//! and consulted here: conditional-request evaluation needs to map an
//! opaque lock token back to the lock it names. A lock record is
//! *direct* when it is stored exactly at the locked path; descendants
//! of a depth-infinity lock carry *indirect* records pointing up.

use chrono::{DateTime, Utc};
use kunai_core::util::path;

use crate::error::{DavError, DavResult};
use crate::fs::FsResult;

/// URI scheme of minted lock tokens.
pub const OPAQUE_LOCK_SCHEME: &str = "opaquelocktoken:";

/// `WebDAV` lock scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockScope {
    #[default]
    Exclusive,
    Shared,
}

impl LockScope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exclusive => "exclusive",
            Self::Shared => "shared",
        }
    }
}

/// `WebDAV` Depth header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// Depth: 0 - The resource itself only.
    Zero,
    /// Depth: 1 - The resource and its immediate children.
    One,
    /// Depth: infinity - The resource and all descendants.
    #[default]
    Infinity,
}

impl Depth {
    /// Parses from header value.
    #[must_use]
    pub fn from_header(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "0" => Some(Self::Zero),
            "1" => Some(Self::One),
            "infinity" => Some(Self::Infinity),
            _ => None,
        }
    }

    /// Returns the header value string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Zero => "0",
            Self::One => "1",
            Self::Infinity => "infinity",
        }
    }
}

impl std::fmt::Display for Depth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A held write lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lock {
    pub scope: LockScope,
    pub depth: Depth,
    /// Opaque lock token, `opaquelocktoken:` scheme.
    pub token: String,
    /// Owner string supplied in the LOCK body, if any.
    pub owner: Option<String>,
    /// Authenticated user that created the lock.
    pub auth_user: Option<String>,
    /// A lock-null resource: locked but never created.
    pub is_null: bool,
    /// Expiration time; `None` for infinite timeout.
    pub expires: Option<DateTime<Utc>>,
}

impl Lock {
    /// Mints a fresh opaque lock token.
    #[must_use]
    pub fn mint_token() -> String {
        format!("{OPAQUE_LOCK_SCHEME}{}", uuid::Uuid::new_v4())
    }

    /// Whether `token` carries the opaque lock token scheme.
    #[must_use]
    pub fn is_opaque_token(token: &str) -> bool {
        token.starts_with(OPAQUE_LOCK_SCHEME)
    }

    /// Whether the lock has expired as of `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires.is_some_and(|at| at <= now)
    }
}

/// A stored lock record: the lock plus whether this record sits at the
/// locked path itself (direct) or was inherited from an ancestor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub lock: Lock,
    pub direct: bool,
}

/// The lock store consumed by token resolution.
pub trait LockStore {
    /// The record for `token` at exactly `path`, if any.
    fn lookup(&self, path: &str, token: &str) -> FsResult<Option<LockRecord>>;
}

/// ## Summary
/// Resolves a lock token to the lock it names, starting at `path` and
/// walking parents until a direct record is found.
///
/// ## Errors
/// - 400 when the token has no record at `path` or any ancestor (the
///   token does not correspond to an existing lock).
/// - 500 when records exist but the walk reaches the root without ever
///   finding a direct one: an indirect record must always lead to a
///   direct ancestor, so the lock store is corrupt.
/// - 500 when the lock store itself fails.
#[tracing::instrument(skip(store))]
pub fn resolve_lock_token(store: &dyn LockStore, path: &str, token: &str) -> DavResult<Lock> {
    let mut current = path::standardize(path);
    let mut saw_record = false;

    loop {
        let record = store
            .lookup(&current, token)
            .map_err(|e| DavError::fs("could not consult lock store", &e))?;
        match record {
            Some(record) if record.direct => return Ok(record.lock),
            Some(_) => saw_record = true,
            None => {}
        }
        if current == "/" {
            break;
        }
        current = path::parent(&current).to_string();
    }

    if saw_record {
        tracing::warn!(token, "indirect lock records with no direct ancestor");
        Err(DavError::corrupt_lock_db())
    } else {
        Err(DavError::no_such_lock(token))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct MapLockStore {
        records: HashMap<(String, String), LockRecord>,
    }

    impl MapLockStore {
        fn new(entries: Vec<(&str, &str, bool)>) -> Self {
            let mut records = HashMap::new();
            for (path, token, direct) in entries {
                records.insert(
                    (path.to_string(), token.to_string()),
                    LockRecord {
                        lock: test_lock(token),
                        direct,
                    },
                );
            }
            Self { records }
        }
    }

    impl LockStore for MapLockStore {
        fn lookup(&self, path: &str, token: &str) -> FsResult<Option<LockRecord>> {
            Ok(self
                .records
                .get(&(path.to_string(), token.to_string()))
                .cloned())
        }
    }

    fn test_lock(token: &str) -> Lock {
        Lock {
            scope: LockScope::Exclusive,
            depth: Depth::Infinity,
            token: token.to_string(),
            owner: Some("alice".to_string()),
            auth_user: Some("alice".to_string()),
            is_null: false,
            expires: None,
        }
    }

    #[test]
    fn direct_record_at_resource_resolves() {
        let store = MapLockStore::new(vec![("/trunk/a.txt", "urn:lock1", true)]);
        let lock = resolve_lock_token(&store, "/trunk/a.txt", "urn:lock1").expect("resolves");
        assert_eq!(lock.token, "urn:lock1");
    }

    #[test]
    fn indirect_record_walks_to_direct_ancestor() {
        let store = MapLockStore::new(vec![
            ("/trunk/a.txt", "urn:lock1", false),
            ("/trunk", "urn:lock1", true),
        ]);
        let lock = resolve_lock_token(&store, "/trunk/a.txt", "urn:lock1").expect("resolves");
        assert_eq!(lock.token, "urn:lock1");
    }

    #[test]
    fn unknown_token_is_a_client_error() {
        let store = MapLockStore::new(vec![]);
        let err = resolve_lock_token(&store, "/trunk/a.txt", "urn:ghost").expect_err("fails");
        assert_eq!(err.status, 400);
    }

    #[test]
    fn indirect_chain_without_direct_record_is_corrupt() {
        let store = MapLockStore::new(vec![("/trunk/a.txt", "urn:lock1", false)]);
        let err = resolve_lock_token(&store, "/trunk/a.txt", "urn:lock1").expect_err("fails");
        assert_eq!(err.status, 500);
    }

    #[test]
    fn minted_tokens_are_opaque() {
        let token = Lock::mint_token();
        assert!(Lock::is_opaque_token(&token));
    }

    #[test]
    fn expiration() {
        let mut lock = test_lock("urn:l");
        assert!(!lock.is_expired(Utc::now()));
        lock.expires = Some(Utc::now() - chrono::TimeDelta::seconds(1));
        assert!(lock.is_expired(Utc::now()));
    }

    #[test]
    fn depth_from_header() {
        assert_eq!(Depth::from_header("0"), Some(Depth::Zero));
        assert_eq!(Depth::from_header("INFINITY"), Some(Depth::Infinity));
        assert_eq!(Depth::from_header("2"), None);
    }
}
