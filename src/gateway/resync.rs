//! Gateway-side reconciliation.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{Gateway, PaymentRepository};
use crate::acquirer::Acquirer;
use crate::worker::{Sweep, SweepReport};

/// Periodically re-enters the saga for every gateway payment.
///
/// Resumes payments whose last run aborted and mirrors what the acquirer did
/// on its own (timeouts, refunds, confirmations after a challenge).
pub struct Resync<A, R> {
    gateway: Arc<Gateway<A, R>>,
}

impl<A, R> Resync<A, R> {
    pub fn new(gateway: Arc<Gateway<A, R>>) -> Self {
        Self { gateway }
    }
}

impl<A, R> Sweep for Resync<A, R>
where
    A: Acquirer + 'static,
    R: PaymentRepository + 'static,
{
    fn name(&self) -> &'static str {
        "gateway_resync"
    }

    fn sweep(&self, _now: DateTime<Utc>) -> SweepReport {
        self.gateway.resync()
    }
}
