use std::fmt;

use serde::{Deserialize, Serialize};

/// Monetary amount in integer minor currency units (pence, cents, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    /// Smallest amount a merchant may charge.
    pub const MIN: Amount = Amount(1);
    /// Largest amount a merchant may charge.
    pub const MAX: Amount = Amount(99_999_999);

    pub fn from_minor(value: i64) -> Self {
        Amount(value)
    }

    /// Whether the amount lies within the merchant-chargeable range.
    pub fn is_chargeable(self) -> bool {
        (Self::MIN..=Self::MAX).contains(&self)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chargeable_bounds_are_inclusive() {
        assert!(Amount::from_minor(1).is_chargeable());
        assert!(Amount::from_minor(99_999_999).is_chargeable());
        assert!(!Amount::from_minor(0).is_chargeable());
        assert!(!Amount::from_minor(-5).is_chargeable());
        assert!(!Amount::from_minor(100_000_000).is_chargeable());
    }

    #[test]
    fn display_is_minor_units() {
        assert_eq!(Amount::from_minor(1050).to_string(), "1050");
    }
}
