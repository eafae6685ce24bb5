//! Best-effort "payment updated" notifications.

use tokio::sync::mpsc;
use tracing::info;

use super::PaymentId;
use crate::state::PaymentState;

/// Emitted once per successful state change of an acquirer payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUpdated {
    pub id: PaymentId,
    pub prev_state: Option<PaymentState>,
    pub new_state: PaymentState,
    pub hook_url: Option<String>,
}

/// Fire-and-forget sender. Delivery is not acknowledged or retried.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    sender: Option<mpsc::UnboundedSender<PaymentUpdated>>,
}

impl Notifier {
    /// A notifier that only logs.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// A notifier paired with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PaymentUpdated>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    pub fn notify(&self, event: PaymentUpdated) {
        info!(
            payment = %event.id,
            from = ?event.prev_state,
            to = %event.new_state,
            "payment updated"
        );
        if let Some(sender) = &self.sender {
            // a dropped receiver just means nobody is listening
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> PaymentUpdated {
        PaymentUpdated {
            id: PaymentId::new(),
            prev_state: Some(PaymentState::New),
            new_state: PaymentState::Authorising,
            hook_url: None,
        }
    }

    #[tokio::test]
    async fn channel_delivers_events() {
        let (notifier, mut receiver) = Notifier::channel();
        let sent = event();
        notifier.notify(sent.clone());
        assert_eq!(receiver.recv().await, Some(sent));
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (notifier, receiver) = Notifier::channel();
        drop(receiver);
        notifier.notify(event());
    }

    #[test]
    fn disabled_notifier_accepts_events() {
        Notifier::disabled().notify(event());
    }
}
