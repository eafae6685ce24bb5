//! Error types for acquirer operations.

use thiserror::Error;

use super::PaymentId;
use crate::error::ErrorKind;
use crate::state::{PaymentState, TransitionError};
use crate::store::StoreError;

/// The acquirer operation that was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Authorise,
    SubmitChallenge,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquirerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("{operation:?}: payment {id} is {state}")]
    UnexpectedState {
        operation: Operation,
        id: PaymentId,
        state: PaymentState,
    },
}

impl AcquirerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AcquirerError::Store(e) => e.kind(),
            AcquirerError::InvalidTransition(e) => e.kind(),
            AcquirerError::UnexpectedState { .. } => ErrorKind::Validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Version;

    #[test]
    fn kinds() {
        let mismatch = AcquirerError::from(StoreError::VersionMismatch {
            id: "x".into(),
            expected: Version::new(),
            actual: Version::new(),
        });
        assert_eq!(mismatch.kind(), ErrorKind::VersionMismatch);

        let transition = AcquirerError::from(TransitionError {
            from: Some(PaymentState::New),
            to: PaymentState::Confirmed,
        });
        assert_eq!(transition.kind(), ErrorKind::InvalidTransition);

        let unexpected = AcquirerError::UnexpectedState {
            operation: Operation::Authorise,
            id: PaymentId::new(),
            state: PaymentState::Confirmed,
        };
        assert_eq!(unexpected.kind(), ErrorKind::Validation);
        assert!(unexpected.to_string().starts_with("Authorise: payment "));
        assert!(unexpected.to_string().ends_with(" is confirmed"));
    }
}
