//! Error types for gateway operations.

use thiserror::Error;

use super::{GatewayPaymentId, GatewayState, RepositoryError, ValidationError};
use crate::acquirer::AcquirerError;
use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid payment request: {0}")]
    Validation(#[from] ValidationError),

    #[error("acquirer call failed: {0}")]
    Acquirer(#[from] AcquirerError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("payment {id} is {state}, not awaiting a challenge response")]
    NotAwaitingChallenge {
        id: GatewayPaymentId,
        state: GatewayState,
    },
}

impl GatewayError {
    /// Acquirer failures surface as `Dependency`; match on
    /// [`GatewayError::Acquirer`] for the underlying kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::Validation(e) => e.kind(),
            GatewayError::Acquirer(_) => ErrorKind::Dependency,
            GatewayError::Repository(e) => e.kind(),
            GatewayError::NotAwaitingChallenge { .. } => ErrorKind::Validation,
        }
    }
}
