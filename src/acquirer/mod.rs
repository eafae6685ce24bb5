//! Simulated acquiring bank.
//!
//! The bank owns its own payment records and drives them through
//! authorisation, 3-D Secure challenge, capture and reversal. Every mutating
//! operation is a single compare-and-swap update guarded by the version the
//! caller last observed; conflicts are returned to the caller, never retried here.

use crate::Amount;
use crate::config::Config;
use crate::model::CardDetails;
use crate::state::PaymentState;
use crate::store::{Version, VersionedStore};

pub mod cards;
pub mod reconcile;

mod error;
pub use error::{AcquirerError, Operation};

mod notify;
pub use notify::{Notifier, PaymentUpdated};

mod payment;
pub use payment::{AcquirerPayment, PaymentId};

/// Read-only projection of an acquirer payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentResource {
    pub id: PaymentId,
    pub state: PaymentState,
    pub version: Version,
}

impl From<&AcquirerPayment> for PaymentResource {
    fn from(payment: &AcquirerPayment) -> Self {
        Self {
            id: payment.id,
            state: payment.state(),
            version: payment.version,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub id: PaymentId,
    pub amount: Amount,
    pub currency: String,
    pub hook_url: Option<String>,
}

/// Result of submitting card details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorisation {
    pub payment: PaymentResource,
    /// Where the customer completes the challenge, when one was issued.
    pub challenge_url: Option<String>,
}

/// The bank-side payment lifecycle, as seen by the gateway.
pub trait Acquirer: Send + Sync {
    fn get_payment(&self, id: &PaymentId) -> Result<PaymentResource, AcquirerError>;

    /// Create a payment in `new`, or return the existing one with the same id.
    fn create_payment(&self, request: CreatePayment) -> Result<PaymentResource, AcquirerError>;

    fn authorise_payment(
        &self,
        id: &PaymentId,
        version: Version,
        card: CardDetails,
    ) -> Result<Authorisation, AcquirerError>;

    fn submit_challenge_response(
        &self,
        id: &PaymentId,
        version: Version,
        token: &str,
    ) -> Result<PaymentResource, AcquirerError>;

    fn confirm_payment(
        &self,
        id: &PaymentId,
        version: Version,
    ) -> Result<PaymentResource, AcquirerError>;

    /// Cancel, reverse, refund or reject depending on the current state.
    fn cancel_payment(
        &self,
        id: &PaymentId,
        version: Version,
    ) -> Result<PaymentResource, AcquirerError>;
}

/// In-memory acquirer backed by the card decision table.
pub struct AcquiringBank {
    payments: VersionedStore<AcquirerPayment>,
    notifier: Notifier,
    expected_challenge_response: String,
    challenge_url: String,
}

impl AcquiringBank {
    pub fn new(config: &Config, notifier: Notifier) -> Self {
        Self {
            payments: VersionedStore::new(),
            notifier,
            expected_challenge_response: config.expected_challenge_response.clone(),
            challenge_url: config.challenge_url(),
        }
    }

    /// Full record, including card data and timestamps.
    pub fn payment(&self, id: &PaymentId) -> Result<AcquirerPayment, AcquirerError> {
        Ok(self.payments.get(id)?)
    }

    /// Snapshot of every payment currently in `state`.
    pub fn payments_in(&self, state: PaymentState) -> Vec<AcquirerPayment> {
        self.payments.list(|payment| payment.state() == state)
    }

    fn update<F>(
        &self,
        id: &PaymentId,
        version: Version,
        mutate: F,
    ) -> Result<PaymentResource, AcquirerError>
    where
        F: FnOnce(&mut AcquirerPayment) -> Result<(), AcquirerError>,
    {
        let payment = self.payments.update(id, version, mutate)?;
        self.notifier.notify(PaymentUpdated {
            id: payment.id,
            prev_state: payment.prev_state(),
            new_state: payment.state(),
            hook_url: payment.hook_url.clone(),
        });
        Ok(PaymentResource::from(&payment))
    }
}

impl Acquirer for AcquiringBank {
    fn get_payment(&self, id: &PaymentId) -> Result<PaymentResource, AcquirerError> {
        let payment = self.payments.get(id)?;
        Ok(PaymentResource::from(&payment))
    }

    fn create_payment(&self, request: CreatePayment) -> Result<PaymentResource, AcquirerError> {
        let payment = AcquirerPayment::new(
            request.id,
            request.amount,
            request.currency,
            request.hook_url,
        );
        let stored = self.payments.create_or_get(payment);
        Ok(PaymentResource::from(&stored))
    }

    fn authorise_payment(
        &self,
        id: &PaymentId,
        version: Version,
        card: CardDetails,
    ) -> Result<Authorisation, AcquirerError> {
        let mut challenged = false;
        let payment = self.update(id, version, |payment| {
            if payment.state() != PaymentState::New {
                return Err(AcquirerError::UnexpectedState {
                    operation: Operation::Authorise,
                    id: payment.id,
                    state: payment.state(),
                });
            }

            payment.card = Some(card);

            if payment.requires_challenge() {
                payment.set_state(PaymentState::ThreeDsRequired)?;
                payment.expected_challenge_response =
                    Some(self.expected_challenge_response.clone());
                challenged = true;
            } else {
                payment.set_state(PaymentState::Authorising)?;
                payment.authorise_or_reject()?;
            }
            Ok(())
        })?;

        Ok(Authorisation {
            payment,
            challenge_url: challenged.then(|| self.challenge_url.clone()),
        })
    }

    fn submit_challenge_response(
        &self,
        id: &PaymentId,
        version: Version,
        token: &str,
    ) -> Result<PaymentResource, AcquirerError> {
        self.update(id, version, |payment| {
            if payment.state() != PaymentState::ThreeDsRequired {
                return Err(AcquirerError::UnexpectedState {
                    operation: Operation::SubmitChallenge,
                    id: payment.id,
                    state: payment.state(),
                });
            }

            if payment.expected_challenge_response.as_deref() != Some(token) {
                payment.set_state(PaymentState::Rejected)?;
            } else {
                payment.set_state(PaymentState::Authorising)?;
                payment.authorise_or_reject()?;
            }
            Ok(())
        })
    }

    fn confirm_payment(
        &self,
        id: &PaymentId,
        version: Version,
    ) -> Result<PaymentResource, AcquirerError> {
        self.update(id, version, |payment| {
            payment.set_state(PaymentState::Confirmed)?;
            Ok(())
        })
    }

    fn cancel_payment(
        &self,
        id: &PaymentId,
        version: Version,
    ) -> Result<PaymentResource, AcquirerError> {
        self.update(id, version, |payment| {
            let target = match payment.state() {
                PaymentState::New => PaymentState::Cancelled,
                PaymentState::ThreeDsRequired => PaymentState::Rejected,
                PaymentState::Authorised => PaymentState::Reversed,
                PaymentState::Confirmed => PaymentState::Refunded,
                state => {
                    return Err(AcquirerError::UnexpectedState {
                        operation: Operation::Cancel,
                        id: payment.id,
                        state,
                    });
                }
            };
            payment.set_state(target)?;
            Ok(())
        })
    }
}
