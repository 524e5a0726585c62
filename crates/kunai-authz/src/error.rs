use thiserror::Error;

/// Authorization configuration errors.
///
/// All of these are fatal at load time: a policy that fails to load is
/// rejected whole, and any previously active policy stays in force.
#[derive(Error, Debug)]
pub enum AuthzError {
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("Reference to undefined group '@{0}'")]
    UnknownGroup(String),

    #[error("Reference to undefined alias '&{0}'")]
    UnknownAlias(String),

    #[error("Circular dependency between groups involving '{0}'")]
    CircularGroup(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthzError {
    /// Creates a line-numbered syntax error.
    #[must_use]
    pub fn syntax(line: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            line,
            message: message.into(),
        }
    }
}

pub type AuthzResult<T> = std::result::Result<T, AuthzError>;
