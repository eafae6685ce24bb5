use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cards;
use crate::Amount;
use crate::model::CardDetails;
use crate::state::{Lifecycle, PaymentState, TransitionError};
use crate::store::{Record, Version};

/// Identifier of a payment at the acquirer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    pub fn new() -> Self {
        PaymentId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for PaymentId {
    fn from(id: Uuid) -> Self {
        PaymentId(id)
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A payment as recorded by the acquiring bank.
///
/// Only [`super::AcquiringBank`] mutates these, always through the store's
/// compare-and-swap update.
#[derive(Debug, Clone)]
pub struct AcquirerPayment {
    pub id: PaymentId,
    pub version: Version,
    lifecycle: Lifecycle,

    pub amount: Amount,
    pub currency: String,
    pub hook_url: Option<String>,

    /// Set when authorisation is attempted.
    pub card: Option<CardDetails>,
    /// Set when a challenge is issued.
    pub expected_challenge_response: Option<String>,

    pub updated_at: DateTime<Utc>,
}

impl AcquirerPayment {
    /// A fresh record in `new`.
    pub fn new(id: PaymentId, amount: Amount, currency: String, hook_url: Option<String>) -> Self {
        Self {
            id,
            version: Version::new(),
            lifecycle: Lifecycle::created(),
            amount,
            currency,
            hook_url,
            card: None,
            expected_challenge_response: None,
            updated_at: Utc::now(),
        }
    }

    pub fn state(&self) -> PaymentState {
        // records are created in `new` and never lose their state
        self.lifecycle.state().unwrap_or(PaymentState::New)
    }

    pub fn prev_state(&self) -> Option<PaymentState> {
        self.lifecycle.prev_state()
    }

    pub fn set_state(&mut self, to: PaymentState) -> Result<(), TransitionError> {
        self.lifecycle.set_state(to)
    }

    pub fn card_number(&self) -> Option<&str> {
        self.card.as_ref().map(|card| card.number.as_str())
    }

    pub fn requires_challenge(&self) -> bool {
        self.card_number().is_some_and(cards::requires_challenge)
    }

    pub fn is_refund_eligible(&self) -> bool {
        self.card_number().is_some_and(cards::refund_eligible)
    }

    /// Resolve an `authorising` payment to `authorised` or `rejected`.
    pub fn authorise_or_reject(&mut self) -> Result<(), TransitionError> {
        if self.card_number().is_some_and(cards::authorisation_succeeds) {
            self.set_state(PaymentState::Authorised)
        } else {
            self.set_state(PaymentState::Rejected)
        }
    }
}

impl Record for AcquirerPayment {
    type Id = PaymentId;

    fn id(&self) -> &PaymentId {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn stamp(&mut self, version: Version, at: DateTime<Utc>) {
        self.version = version;
        self.updated_at = at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_with_card(number: &str) -> AcquirerPayment {
        let mut payment =
            AcquirerPayment::new(PaymentId::new(), Amount::from_minor(100), "GBP".into(), None);
        payment.card = Some(CardDetails {
            number: number.into(),
            ..CardDetails::default()
        });
        payment
    }

    #[test]
    fn new_payment_starts_in_new() {
        let payment =
            AcquirerPayment::new(PaymentId::new(), Amount::from_minor(100), "GBP".into(), None);
        assert_eq!(payment.state(), PaymentState::New);
        assert_eq!(payment.prev_state(), None);
        assert!(payment.card.is_none());
    }

    #[test]
    fn authorise_or_reject_follows_card_table() {
        let mut ok = payment_with_card("4242424242424242");
        ok.set_state(PaymentState::Authorising).unwrap();
        ok.authorise_or_reject().unwrap();
        assert_eq!(ok.state(), PaymentState::Authorised);
        assert_eq!(ok.prev_state(), Some(PaymentState::Authorising));

        let mut declined = payment_with_card("4111111111111111");
        declined.set_state(PaymentState::Authorising).unwrap();
        declined.authorise_or_reject().unwrap();
        assert_eq!(declined.state(), PaymentState::Rejected);
    }

    #[test]
    fn authorise_or_reject_outside_authorising_is_invalid() {
        let mut payment = payment_with_card("4242424242424242");
        let err = payment.authorise_or_reject().unwrap_err();
        assert_eq!(err.from, Some(PaymentState::New));
        assert_eq!(err.to, PaymentState::Authorised);
    }

    #[test]
    fn no_card_means_no_challenge_and_no_refund() {
        let payment =
            AcquirerPayment::new(PaymentId::new(), Amount::from_minor(100), "GBP".into(), None);
        assert!(!payment.requires_challenge());
        assert!(!payment.is_refund_eligible());
    }
}
