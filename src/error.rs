// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! Crate-wide error taxonomy.
//!
//! Every core operation returns a typed [`CoreError`]; the boundary layer
//! maps each [`ErrorKind`] 1:1 to an externally visible code. Business
//! failures (`NotFound`, `BadRequest`, `Forbidden`) carry caller-safe
//! messages. `Storage` and `Cipher` are internal faults: they indicate
//! corrupted state or a broken storage contract, and their display form
//! never contains a card number.

use thiserror::Error;

use crate::crypto::CipherError;
use crate::storage::StoreError;

/// Stable failure classification for the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Entity absent.
    NotFound,
    /// Business-rule violation.
    BadRequest,
    /// Authorization denial.
    Forbidden,
    /// Cipher or storage corruption; not business-recoverable.
    Internal,
}

/// Error returned by every core operation.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{entity} not found with id: {id}")]
    NotFound { entity: &'static str, id: u64 },

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("storage failure: {0}")]
    Storage(StoreError),

    #[error("card number cipher failure")]
    Cipher(#[from] CipherError),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: u64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::BadRequest(_) => ErrorKind::BadRequest,
            CoreError::Forbidden(_) => ErrorKind::Forbidden,
            CoreError::Storage(_) | CoreError::Cipher(_) => ErrorKind::Internal,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        match e {
            // Constraint violations detected inside a storage transaction are
            // business failures, not faults: duplicate card number on create,
            // user deletion while cards remain.
            StoreError::AlreadyExists(msg) | StoreError::Constraint(msg) => {
                CoreError::BadRequest(msg)
            }
            other => CoreError::Storage(other),
        }
    }
}

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_one_to_one() {
        assert_eq!(CoreError::not_found("Card", 7).kind(), ErrorKind::NotFound);
        assert_eq!(
            CoreError::bad_request("Insufficient funds").kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(
            CoreError::forbidden("Only admins can delete cards").kind(),
            ErrorKind::Forbidden
        );
        assert_eq!(
            CoreError::Cipher(CipherError::Corrupted).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn not_found_names_entity_and_id() {
        let e = CoreError::not_found("Card", 42);
        assert_eq!(e.to_string(), "Card not found with id: 42");
    }

    #[test]
    fn store_constraint_surfaces_as_bad_request() {
        let e: CoreError =
            StoreError::AlreadyExists("Card with this number already exists".into()).into();
        assert_eq!(e.kind(), ErrorKind::BadRequest);
        assert_eq!(e.to_string(), "Card with this number already exists");
    }

    #[test]
    fn cipher_failure_is_opaque() {
        let e = CoreError::Cipher(CipherError::Corrupted);
        assert_eq!(e.to_string(), "card number cipher failure");
    }
}
