//! Field rules checked before a payment request reaches the core.

use chrono::{Datelike, NaiveDate};
use thiserror::Error;

use crate::Amount;
use crate::error::ErrorKind;
use crate::model::CardDetails;

/// A merchant's request to charge a card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRequest {
    pub amount: Amount,
    pub currency: String,
    pub card: CardDetails,
    /// Where the acquirer reports state changes, if anywhere.
    pub hook_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("amount {0} is outside {min}..={max}", min = Amount::MIN, max = Amount::MAX)]
    AmountOutOfRange(Amount),

    #[error("currency '{0}' is not a three-letter code")]
    InvalidCurrency(String),

    #[error("card number must be 16 digits with a valid check digit")]
    InvalidCardNumber,

    #[error("expiry date '{0}' is not in MMYY form")]
    InvalidExpiry(String),

    #[error("card expired in {0}")]
    CardExpired(String),

    #[error("card holder must be 1 to 999 characters")]
    InvalidCardHolder,

    #[error("cvv must be 3 or 4 digits")]
    InvalidCvv,
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

impl PaymentRequest {
    /// Check every field; `today` decides whether the card has expired.
    pub fn validate(&self, today: NaiveDate) -> Result<(), ValidationError> {
        if !self.amount.is_chargeable() {
            return Err(ValidationError::AmountOutOfRange(self.amount));
        }

        if self.currency.len() != 3 || !self.currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCurrency(self.currency.clone()));
        }

        let number = &self.card.number;
        if number.len() != 16 || !is_digits(number) || !luhn(number) {
            return Err(ValidationError::InvalidCardNumber);
        }

        let (month, year) = parse_expiry(&self.card.expiry_date)
            .ok_or_else(|| ValidationError::InvalidExpiry(self.card.expiry_date.clone()))?;
        // valid through the last day of the expiry month
        if (year, month) < (today.year(), today.month()) {
            return Err(ValidationError::CardExpired(self.card.expiry_date.clone()));
        }

        let holder_len = self.card.holder.chars().count();
        if !(1..=999).contains(&holder_len) {
            return Err(ValidationError::InvalidCardHolder);
        }

        let cvv = &self.card.cvv;
        if !(3..=4).contains(&cvv.len()) || !is_digits(cvv) {
            return Err(ValidationError::InvalidCvv);
        }

        Ok(())
    }
}

fn is_digits(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_digit())
}

/// `MMYY` to (month, full year).
fn parse_expiry(expiry: &str) -> Option<(u32, i32)> {
    if expiry.len() != 4 || !is_digits(expiry) {
        return None;
    }
    let month: u32 = expiry[..2].parse().ok()?;
    let year: i32 = expiry[2..].parse().ok()?;
    (1..=12).contains(&month).then_some((month, 2000 + year))
}

fn luhn(digits: &str) -> bool {
    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}
