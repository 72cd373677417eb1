//! Errors returned by the reception engine and the PVZ directory.

use thiserror::Error;

use pvz_core::DomainError;

use crate::store::StoreError;

/// Broad classification callers branch on.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The domain rejected the request. Expected; never retried here.
    Domain,
    /// Storage failed. Retry policy belongs to the caller.
    Infrastructure,
    /// The operation's deadline passed; its transaction was abandoned.
    Cancellation,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage failure in {operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("deadline exceeded during {operation}")]
    DeadlineExceeded { operation: &'static str },

    /// Password hashing or token signing failed.
    #[error("credential failure in {operation}: {message}")]
    Credentials {
        operation: &'static str,
        message: String,
    },
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Domain(_) => ErrorKind::Domain,
            ServiceError::Store { .. } | ServiceError::Credentials { .. } => {
                ErrorKind::Infrastructure
            }
            ServiceError::DeadlineExceeded { .. } => ErrorKind::Cancellation,
        }
    }

    /// Adapter for `map_err` that tags a store failure with its operation.
    pub fn store(operation: &'static str) -> impl FnOnce(StoreError) -> ServiceError {
        move |source| ServiceError::Store { operation, source }
    }

    pub fn credentials(operation: &'static str) -> impl FnOnce(String) -> ServiceError {
        move |message| ServiceError::Credentials { operation, message }
    }

    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            _ => None,
        }
    }
}
