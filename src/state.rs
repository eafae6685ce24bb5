//! Payment lifecycle states and the table of legal transitions.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorKind;

/// Lifecycle state of a payment at the acquirer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Created, card details not yet submitted.
    New,
    /// Card network decision in progress.
    Authorising,
    /// Waiting for the customer to complete a 3-D Secure challenge.
    #[serde(rename = "3ds_required")]
    ThreeDsRequired,
    /// Authorised, funds not yet captured.
    Authorised,
    /// Captured.
    Confirmed,
    /// Cancelled before authorisation. Terminal.
    Cancelled,
    /// Cancelled after authorisation. Terminal.
    Reversed,
    /// Refunded after capture. Terminal.
    Refunded,
    /// Authorisation or challenge failed. Terminal.
    Rejected,
}

impl PaymentState {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentState::New => "new",
            PaymentState::Authorising => "authorising",
            PaymentState::ThreeDsRequired => "3ds_required",
            PaymentState::Authorised => "authorised",
            PaymentState::Confirmed => "confirmed",
            PaymentState::Cancelled => "cancelled",
            PaymentState::Reversed => "reversed",
            PaymentState::Refunded => "refunded",
            PaymentState::Rejected => "rejected",
        }
    }

    /// States reachable in one step from `self`.
    pub fn successors(self) -> &'static [PaymentState] {
        use PaymentState::*;
        match self {
            New => &[Authorising, ThreeDsRequired, Cancelled],
            Authorising => &[Authorised, Rejected],
            ThreeDsRequired => &[Authorising, Rejected],
            Authorised => &[Confirmed, Reversed],
            Confirmed => &[Refunded],
            Cancelled | Reversed | Refunded | Rejected => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }
}

impl fmt::Display for PaymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `to` may follow `from`. An unset state may only become `New`.
pub fn is_valid_transition(from: Option<PaymentState>, to: PaymentState) -> bool {
    match from {
        None => to == PaymentState::New,
        Some(from) => from.successors().contains(&to),
    }
}

/// Attempted state change that is not in the transition table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid payment transition: {} -> {}", display_state(.from), .to)]
pub struct TransitionError {
    pub from: Option<PaymentState>,
    pub to: PaymentState,
}

impl TransitionError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidTransition
    }
}

fn display_state(state: &Option<PaymentState>) -> &'static str {
    state.map_or("<unset>", PaymentState::as_str)
}

/// Current and previous state of a record.
///
/// The only way to move a record through its lifecycle; every mutation site
/// goes through [`Lifecycle::set_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lifecycle {
    state: Option<PaymentState>,
    prev_state: Option<PaymentState>,
}

impl Lifecycle {
    /// A lifecycle that has taken its first step, `<unset> -> new`.
    pub fn created() -> Self {
        Self {
            state: Some(PaymentState::New),
            prev_state: None,
        }
    }

    pub fn state(&self) -> Option<PaymentState> {
        self.state
    }

    pub fn prev_state(&self) -> Option<PaymentState> {
        self.prev_state
    }

    pub fn set_state(&mut self, to: PaymentState) -> Result<(), TransitionError> {
        if !is_valid_transition(self.state, to) {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        self.prev_state = self.state;
        self.state = Some(to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PaymentState::*;

    fn at(state: PaymentState) -> Lifecycle {
        Lifecycle {
            state: Some(state),
            prev_state: None,
        }
    }

    const ALL: [PaymentState; 9] = [
        New,
        Authorising,
        ThreeDsRequired,
        Authorised,
        Confirmed,
        Cancelled,
        Reversed,
        Refunded,
        Rejected,
    ];

    const TABLE: &[(PaymentState, PaymentState)] = &[
        (New, Authorising),
        (New, ThreeDsRequired),
        (New, Cancelled),
        (Authorising, Authorised),
        (Authorising, Rejected),
        (ThreeDsRequired, Authorising),
        (ThreeDsRequired, Rejected),
        (Authorised, Confirmed),
        (Authorised, Reversed),
        (Confirmed, Refunded),
    ];

    #[test]
    fn unset_state_only_becomes_new() {
        for to in ALL {
            let mut lifecycle = Lifecycle::default();
            let result = lifecycle.set_state(to);
            assert_eq!(result.is_ok(), to == New, "<unset> -> {to}");
        }
    }

    #[test]
    fn every_pair_follows_the_table() {
        for from in ALL {
            for to in ALL {
                let mut lifecycle = at(from);
                let allowed = TABLE.contains(&(from, to));
                match lifecycle.set_state(to) {
                    Ok(()) => {
                        assert!(allowed, "{from} -> {to} should be rejected");
                        assert_eq!(lifecycle.state(), Some(to));
                        assert_eq!(lifecycle.prev_state(), Some(from));
                    }
                    Err(e) => {
                        assert!(!allowed, "{from} -> {to} should be accepted");
                        assert_eq!(e, TransitionError { from: Some(from), to });
                        // rejected transitions leave the lifecycle untouched
                        assert_eq!(lifecycle, at(from));
                    }
                }
            }
        }
    }

    #[test]
    fn created_matches_first_transition() {
        let mut lifecycle = Lifecycle::default();
        lifecycle.set_state(New).unwrap();
        assert_eq!(lifecycle, Lifecycle::created());
    }

    #[test]
    fn terminal_states() {
        let terminal: Vec<_> = ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![Cancelled, Reversed, Refunded, Rejected]);
    }

    #[test]
    fn error_message_names_both_states() {
        let err = at(Rejected).set_state(Authorised).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid payment transition: rejected -> authorised"
        );
        let err = Lifecycle::default().set_state(Confirmed).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid payment transition: <unset> -> confirmed"
        );
    }
}
