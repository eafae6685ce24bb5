//! Gateway persistence boundary.

use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use super::{GatewayPayment, GatewayPaymentId};
use crate::error::ErrorKind;
use crate::store::{StoreError, VersionedStore};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("gateway payment {0} not found")]
    NotFound(GatewayPaymentId),

    #[error("gateway payment {0} was modified concurrently")]
    Conflict(GatewayPaymentId),

    #[error("gateway payment {0} already exists")]
    Duplicate(GatewayPaymentId),
}

impl RepositoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepositoryError::NotFound(_) => ErrorKind::NotFound,
            RepositoryError::Conflict(_) => ErrorKind::VersionMismatch,
            RepositoryError::Duplicate(_) => ErrorKind::Validation,
        }
    }

    fn from_store(id: GatewayPaymentId, e: StoreError) -> Self {
        match e {
            StoreError::NotFound { .. } => RepositoryError::NotFound(id),
            StoreError::VersionMismatch { .. } => RepositoryError::Conflict(id),
        }
    }
}

/// Storage for gateway payments.
///
/// Only single-record atomicity is required. [`PaymentRepository::tx`] scopes
/// a multi-step operation; it does not undo writes made before a failure.
pub trait PaymentRepository: Send + Sync {
    fn create(&self, payment: GatewayPayment) -> Result<GatewayPaymentId, RepositoryError>;

    fn get(&self, id: &GatewayPaymentId) -> Result<GatewayPayment, RepositoryError>;

    fn list_all(&self) -> Result<Vec<GatewayPaymentId>, RepositoryError>;

    fn update<F>(&self, id: &GatewayPaymentId, mutate: F) -> Result<GatewayPayment, RepositoryError>
    where
        F: FnOnce(&mut GatewayPayment);

    fn tx<T, F>(&self, op: F) -> T
    where
        F: FnOnce() -> T;
}

/// Repository keeping gateway payments in a [`VersionedStore`].
///
/// `tx` serialises scoped operations against each other; writes inside a
/// scope are visible immediately and survive a failure later in the scope.
#[derive(Default)]
pub struct InMemoryPaymentRepository {
    payments: VersionedStore<GatewayPayment>,
    tx_gate: Mutex<()>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaymentRepository for InMemoryPaymentRepository {
    fn create(&self, payment: GatewayPayment) -> Result<GatewayPaymentId, RepositoryError> {
        let id = payment.id;
        let version = payment.version;
        let stored = self.payments.create_or_get(payment);
        if stored.version != version {
            return Err(RepositoryError::Duplicate(id));
        }
        Ok(id)
    }

    fn get(&self, id: &GatewayPaymentId) -> Result<GatewayPayment, RepositoryError> {
        self.payments
            .get(id)
            .map_err(|e| RepositoryError::from_store(*id, e))
    }

    fn list_all(&self) -> Result<Vec<GatewayPaymentId>, RepositoryError> {
        Ok(self
            .payments
            .list(|_| true)
            .into_iter()
            .map(|payment| payment.id)
            .collect())
    }

    fn update<F>(&self, id: &GatewayPaymentId, mutate: F) -> Result<GatewayPayment, RepositoryError>
    where
        F: FnOnce(&mut GatewayPayment),
    {
        let current = self.get(id)?;
        self.payments
            .update(id, current.version, |payment| {
                mutate(payment);
                Ok::<(), StoreError>(())
            })
            .map_err(|e| RepositoryError::from_store(*id, e))
    }

    fn tx<T, F>(&self, op: F) -> T
    where
        F: FnOnce() -> T,
    {
        let _guard = self.tx_gate.lock().unwrap_or_else(PoisonError::into_inner);
        op()
    }
}
