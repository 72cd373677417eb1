//! Domain error model.

use thiserror::Error;

use crate::id::{PvzId, ReceptionId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// These are expected, caller-recoverable rejections. Every lifecycle variant
/// carries the PVZ it was raised for so the caller can act on it without
/// parsing the message. Storage and cancellation failures are not modelled
/// here; they live with the infrastructure that produces them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A reception is already `in_progress` for this PVZ.
    #[error("pvz {pvz_id} already has a reception in progress")]
    ReceptionAlreadyOpen { pvz_id: PvzId },

    /// The PVZ has no `in_progress` reception to act on.
    #[error("pvz {pvz_id} has no reception in progress")]
    NoReceptionInProgress { pvz_id: PvzId },

    /// The open reception has no products left to retract.
    #[error("reception {reception_id} of pvz {pvz_id} has no products")]
    NoProductsInReception {
        pvz_id: PvzId,
        reception_id: ReceptionId,
    },

    /// The PVZ does not exist.
    #[error("pvz {pvz_id} not found")]
    PvzNotFound { pvz_id: PvzId },

    /// An account with this email already exists.
    #[error("email {email} is already registered")]
    EmailTaken { email: String },

    /// Unknown email or wrong password. Deliberately does not say which.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// The PVZ the error was raised for, if it concerns one.
    pub fn pvz_id(&self) -> Option<PvzId> {
        match self {
            Self::ReceptionAlreadyOpen { pvz_id }
            | Self::NoReceptionInProgress { pvz_id }
            | Self::NoProductsInReception { pvz_id, .. }
            | Self::PvzNotFound { pvz_id } => Some(*pvz_id),
            Self::EmailTaken { .. }
            | Self::InvalidCredentials
            | Self::Validation(_)
            | Self::InvalidId(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_errors_expose_their_pvz() {
        let pvz_id = PvzId::new();
        let err = DomainError::NoProductsInReception {
            pvz_id,
            reception_id: ReceptionId::new(),
        };
        assert_eq!(err.pvz_id(), Some(pvz_id));
        assert_eq!(DomainError::validation("limit").pvz_id(), None);
        assert_eq!(DomainError::InvalidCredentials.pvz_id(), None);
    }

    #[test]
    fn messages_name_the_pvz() {
        let pvz_id = PvzId::new();
        let msg = DomainError::ReceptionAlreadyOpen { pvz_id }.to_string();
        assert!(msg.contains(&pvz_id.to_string()));
    }
}
