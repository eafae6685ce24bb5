//! Simulated card-network decisions, keyed by card number.

/// Challenged, and authorised once the challenge is passed.
const CHALLENGE_SUCCESS: &[&str] = &["4000000000003220", "4000000000003063"];

/// Challenged, and declined even after a correct challenge response.
const CHALLENGE_FAILURE: &[&str] = &["4000008400001280", "4000000000003097"];

/// Authorised without a challenge.
const NO_CHALLENGE_SUCCESS: &[&str] = &[
    "4242424242424242",
    "5555555555554444",
    "4000000000007726",
    "4000000000005126",
];

/// Confirmed payments on these cards are refunded by the bank.
const REFUND: &[&str] = &["4000000000007726", "4000000000005126"];

pub fn requires_challenge(card_number: &str) -> bool {
    CHALLENGE_SUCCESS.contains(&card_number) || CHALLENGE_FAILURE.contains(&card_number)
}

pub fn authorisation_succeeds(card_number: &str) -> bool {
    CHALLENGE_SUCCESS.contains(&card_number) || NO_CHALLENGE_SUCCESS.contains(&card_number)
}

pub fn refund_eligible(card_number: &str) -> bool {
    REFUND.contains(&card_number)
}
