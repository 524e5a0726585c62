//! DAV error types.

use std::fmt;

use crate::fs::FsError;

/// Result type for DAV protocol operations.
pub type DavResult<T> = Result<T, DavError>;

/// The `DAV:` XML namespace, used for generic protocol error conditions.
pub const DAV_NS: &str = "DAV:";
/// Namespace for server-specific error conditions.
pub const SVN_NS: &str = "svn:";

/// One entry in an error's cause chain.
///
/// Mirrors the multi-error wire format: each cause carries the XML
/// namespace and element tag of the condition plus the HTTP status it
/// maps to. Rendering to XML is the response layer's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCause {
    /// Condition element namespace.
    pub namespace: String,
    /// Condition element tag.
    pub tag: String,
    /// HTTP status associated with this cause.
    pub status: u16,
}

/// A DAV error condition.
#[derive(Debug, Clone)]
pub struct DavError {
    /// HTTP status code.
    pub status: u16,
    /// Error description.
    pub message: String,
    /// Optional precondition/postcondition element name.
    pub condition: Option<String>,
    /// Ordered cause chain, outermost first.
    pub causes: Vec<ErrorCause>,
}

impl DavError {
    /// Creates a new DAV error.
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            condition: None,
            causes: Vec::new(),
        }
    }

    /// Creates a DAV error with a precondition.
    #[must_use]
    pub fn with_condition(
        status: u16,
        message: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            status,
            message: message.into(),
            condition: Some(condition.into()),
            causes: Vec::new(),
        }
    }

    /// Appends a cause to the chain.
    #[must_use]
    pub fn because(mut self, namespace: &str, tag: &str, status: u16) -> Self {
        self.causes.push(ErrorCause {
            namespace: namespace.to_string(),
            tag: tag.to_string(),
            status,
        });
        self
    }

    /// Prefixes the message with added context, keeping status and causes.
    #[must_use]
    pub fn context(mut self, context: &str) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }

    // Common WebDAV errors

    /// 400 Bad Request
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// 403 Forbidden
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    /// 404 Not Found
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// 405 Method Not Allowed
    #[must_use]
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(405, message)
    }

    /// 409 Conflict
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }

    /// 412 Precondition Failed
    #[must_use]
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::new(412, message)
    }

    /// 423 Locked
    #[must_use]
    pub fn locked(message: impl Into<String>) -> Self {
        Self::new(423, message)
    }

    /// 500 Internal Server Error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// 501 Not Implemented
    #[must_use]
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(501, message)
    }

    // Protocol conditions raised by this crate

    /// A request URI that does not match any documented form.
    #[must_use]
    pub fn malformed_uri(message: impl Into<String>) -> Self {
        Self::with_condition(400, message, "malformed-uri")
    }

    /// A working resource whose activity has no stored transaction.
    #[must_use]
    pub fn unknown_activity(activity_id: &str) -> Self {
        Self::with_condition(
            400,
            format!("unknown activity: {activity_id}"),
            "activity-not-found",
        )
    }

    /// A second author attempting to join an open transaction.
    #[must_use]
    pub fn multi_author() -> Self {
        Self::not_implemented("multi-author commits not supported")
    }

    /// A parent-resource request against a kind that has no parent.
    #[must_use]
    pub fn illegal_parent(kind: &str) -> Self {
        Self::internal(format!("{kind} resources have no parent resource"))
    }

    /// A lock token with no record in the lock store.
    #[must_use]
    pub fn no_such_lock(token: &str) -> Self {
        Self::with_condition(
            400,
            format!("locktoken '{token}' does not correspond to an existing lock"),
            "lock-token-matches-request-uri",
        )
    }

    /// An indirect lock chain that never reaches a direct record.
    #[must_use]
    pub fn corrupt_lock_db() -> Self {
        Self::internal("lock database is corrupt: indirect lock has no direct ancestor")
    }

    /// Wraps a collaborator failure with added context. Always fatal to
    /// the current request.
    #[must_use]
    pub fn fs(context: &str, err: &FsError) -> Self {
        Self::internal(format!("{context}: {err}")).because(SVN_NS, "fs-error", 500)
    }
}

impl fmt::Display for DavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl std::error::Error for DavError {}

impl From<FsError> for DavError {
    fn from(err: FsError) -> Self {
        Self::fs("filesystem operation failed", &err)
    }
}
