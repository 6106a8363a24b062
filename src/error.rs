//! Error types for kbase.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.
//! Every variant maps to a CLI exit code, an HTTP-equivalent status and, where
//! the condition is a business rule, a stable application error code.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for kbase operations.
#[derive(Error, Debug)]
pub enum KbError {
    /// User provided invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// A request payload failed validation.
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// The creation lock could not be acquired before the wait timeout.
    #[error("{0}")]
    LockTimeout(String),

    /// Lock acquisition was abandoned because the caller cancelled it.
    #[error("Lock acquisition cancelled for '{0}'")]
    Cancelled(String),

    /// A natural-key uniqueness rule was violated.
    #[error("{message}")]
    DuplicateKey { code: u32, message: String },

    /// The acting identity does not own the resource.
    #[error("{message}")]
    AccessDenied { code: u32, message: String },

    /// The resource does not exist or has been deleted.
    #[error("{message}")]
    NotFound { code: u32, message: String },

    /// The shared store (database or lock directory) failed.
    #[error("Store operation failed: {0}")]
    StoreError(String),
}

impl KbError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            KbError::UserError(_) | KbError::Cancelled(_) => exit_codes::USER_ERROR,
            KbError::ValidationError(_) | KbError::DuplicateKey { .. } => {
                exit_codes::VALIDATION_FAILURE
            }
            KbError::StoreError(_) => exit_codes::STORE_FAILURE,
            KbError::LockTimeout(_) => exit_codes::LOCK_FAILURE,
            KbError::AccessDenied { .. } => exit_codes::ACCESS_DENIED,
            KbError::NotFound { .. } => exit_codes::NOT_FOUND,
        }
    }

    /// HTTP status a request layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            KbError::UserError(_) => 400,
            KbError::AccessDenied { .. } => 403,
            KbError::NotFound { .. } => 404,
            KbError::DuplicateKey { .. } => 409,
            KbError::ValidationError(_) => 422,
            KbError::LockTimeout(_) => 429,
            KbError::Cancelled(_) => 499,
            KbError::StoreError(_) => 500,
        }
    }

    /// Stable application code for business errors, if any.
    pub fn app_code(&self) -> Option<u32> {
        match self {
            KbError::DuplicateKey { code, .. }
            | KbError::AccessDenied { code, .. }
            | KbError::NotFound { code, .. } => Some(*code),
            KbError::LockTimeout(_) => Some(codes::LOCK_TIMEOUT),
            _ => None,
        }
    }

    /// Whether the caller may reasonably retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, KbError::LockTimeout(_))
    }
}

impl From<rusqlite::Error> for KbError {
    fn from(value: rusqlite::Error) -> Self {
        KbError::StoreError(format!("sqlite: {}", value))
    }
}

/// Application error codes shared with API clients.
pub mod codes {
    pub const WIKI_REPO_NOT_FOUND: u32 = 1000;
    pub const WIKI_REPO_PATH_EXISTS: u32 = 1001;
    pub const WIKI_REPO_ACCESS_DENIED: u32 = 1002;
    pub const LOCK_TIMEOUT: u32 = 1003;

    pub const MODEL_PROVIDER_NOT_FOUND: u32 = 2000;
    pub const MODEL_PROVIDER_ACCESS_DENIED: u32 = 2001;
    pub const MODEL_PROVIDER_PLATFORM_EXISTS: u32 = 2002;
    pub const MODEL_NOT_FOUND: u32 = 2003;
    pub const MODEL_ACCESS_DENIED: u32 = 2004;
    pub const MODEL_CONFIG_NOT_FOUND: u32 = 2005;
    pub const MODEL_CONFIG_ACCESS_DENIED: u32 = 2006;
}

/// Result type alias for kbase operations.
pub type Result<T> = std::result::Result<T, KbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_error_has_correct_exit_code() {
        let err = KbError::UserError("bad argument".to_string());
        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn lock_timeout_is_retryable_and_maps_to_lock_failure() {
        let err = KbError::LockTimeout("creation in progress".to_string());
        assert_eq!(err.exit_code(), exit_codes::LOCK_FAILURE);
        assert_eq!(err.status_code(), 429);
        assert_eq!(err.app_code(), Some(codes::LOCK_TIMEOUT));
        assert!(err.is_retryable());
    }

    #[test]
    fn business_errors_carry_app_codes() {
        let err = KbError::DuplicateKey {
            code: codes::WIKI_REPO_PATH_EXISTS,
            message: "path already exists".to_string(),
        };
        assert_eq!(err.exit_code(), exit_codes::VALIDATION_FAILURE);
        assert_eq!(err.app_code(), Some(1001));
        assert!(!err.is_retryable());

        let err = KbError::AccessDenied {
            code: codes::WIKI_REPO_ACCESS_DENIED,
            message: "no access".to_string(),
        };
        assert_eq!(err.exit_code(), exit_codes::ACCESS_DENIED);
        assert_eq!(err.status_code(), 403);

        let err = KbError::NotFound {
            code: codes::MODEL_PROVIDER_NOT_FOUND,
            message: "missing".to_string(),
        };
        assert_eq!(err.exit_code(), exit_codes::NOT_FOUND);
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn store_error_has_no_app_code() {
        let err = KbError::StoreError("disk full".to_string());
        assert_eq!(err.exit_code(), exit_codes::STORE_FAILURE);
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.app_code(), None);
    }

    #[test]
    fn error_messages_are_descriptive() {
        let err = KbError::ValidationError("name must not be empty".to_string());
        assert_eq!(err.to_string(), "Validation failed: name must not be empty");

        let err = KbError::Cancelled("wiki-repo:create:docs".to_string());
        assert_eq!(
            err.to_string(),
            "Lock acquisition cancelled for 'wiki-repo:create:docs'"
        );
    }
}
