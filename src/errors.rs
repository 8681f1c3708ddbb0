//! Core error taxonomy. Each kind maps to exactly one JSON-RPC
//! error code at the server boundary and to exactly one tool-result shape
//! at the tool-dispatch boundary; the mapping lives in `server::rpc_error`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("subprocess error: {0}")]
    Subprocess(String),

    #[error("subprocess timed out: {0}")]
    SubprocessTimeout(String),

    #[error("session recovery denied: {0}")]
    RecoveryDenied(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Stable short name, used in log fields and test assertions.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Auth(_) => "ErrAuth",
            CoreError::Validation(_) => "ErrValidation",
            CoreError::NotFound(_) => "ErrNotFound",
            CoreError::Conflict(_) => "ErrConflict",
            CoreError::Storage(_) => "ErrStorage",
            CoreError::Subprocess(_) => "ErrSubprocess",
            CoreError::SubprocessTimeout(_) => "ErrSubprocessTimeout",
            CoreError::RecoveryDenied(_) => "ErrRecoveryDenied",
            CoreError::Internal(_) => "ErrInternal",
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        // UNIQUE / PRIMARY KEY violations surface as conflicts; everything
        // else is a storage failure. rusqlite buries the SQLite extended
        // code inside `SqliteFailure`, so match on that rather than on the
        // top-level variant.
        if let rusqlite::Error::SqliteFailure(err, _) = &e {
            if err.code == rusqlite::ErrorCode::ConstraintViolation {
                return CoreError::Conflict(e.to_string());
            }
        }
        CoreError::Storage(e.to_string())
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(CoreError::Auth("x".into()).kind(), "ErrAuth");
        assert_eq!(CoreError::RecoveryDenied("x".into()).kind(), "ErrRecoveryDenied");
    }
}
