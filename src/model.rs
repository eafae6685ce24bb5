//! Types shared by the gateway and the acquirer.

use serde::{Deserialize, Serialize};

/// Raw card data as supplied by the customer.
///
/// No cryptographic handling: the simulated network keys its behaviour on the
/// plain card number.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: String,
    /// Expiry in `MMYY` form.
    pub expiry_date: String,
    pub holder: String,
    pub cvv: String,
}

impl CardDetails {
    /// Card number with everything but the last four digits masked.
    pub fn masked_number(&self) -> String {
        let hidden = self.number.chars().count().saturating_sub(4);
        self.number
            .chars()
            .enumerate()
            .map(|(i, c)| if i < hidden { '*' } else { c })
            .collect()
    }

    pub fn masked_cvv(&self) -> String {
        "*".repeat(self.cvv.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(number: &str) -> CardDetails {
        CardDetails {
            number: number.to_string(),
            expiry_date: "1230".to_string(),
            holder: "John Doe".to_string(),
            cvv: "123".to_string(),
        }
    }

    #[test]
    fn masks_all_but_last_four() {
        assert_eq!(card("4242424242424242").masked_number(), "************4242");
    }

    #[test]
    fn short_numbers_are_left_visible() {
        assert_eq!(card("42").masked_number(), "42");
    }

    #[test]
    fn cvv_is_fully_masked() {
        assert_eq!(card("4242424242424242").masked_cvv(), "***");
    }
}
