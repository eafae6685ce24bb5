//! Bank-side background workers.
//!
//! Both act unilaterally on the bank's own records, outside any request:
//! stale challenges are cancelled and refund-eligible captures are refunded.
//! A record that changed between listing and acting is skipped until the
//! next sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, warn};

use super::{Acquirer, AcquirerError, AcquirerPayment, AcquiringBank};
use crate::error::ErrorKind;
use crate::state::PaymentState;
use crate::worker::{Sweep, SweepReport};

/// An acquirer whose own records can be listed by state.
pub trait PaymentLedger: Acquirer {
    fn payments_in(&self, state: PaymentState) -> Vec<AcquirerPayment>;
}

impl PaymentLedger for AcquiringBank {
    fn payments_in(&self, state: PaymentState) -> Vec<AcquirerPayment> {
        AcquiringBank::payments_in(self, state)
    }
}

/// Cancels challenges left unanswered for longer than the configured TTL.
pub struct TimeoutReaper<B = AcquiringBank> {
    bank: Arc<B>,
    ttl: Duration,
}

impl<B> TimeoutReaper<B> {
    pub fn new(bank: Arc<B>, ttl: Duration) -> Self {
        Self { bank, ttl }
    }

    fn is_stale(&self, payment: &AcquirerPayment, now: DateTime<Utc>) -> bool {
        TimeDelta::from_std(self.ttl)
            .ok()
            .and_then(|ttl| payment.updated_at.checked_add_signed(ttl))
            .is_some_and(|deadline| deadline < now)
    }
}

impl<B: PaymentLedger + 'static> Sweep for TimeoutReaper<B> {
    fn name(&self) -> &'static str {
        "timeout_reaper"
    }

    fn sweep(&self, now: DateTime<Utc>) -> SweepReport {
        let payments = self.bank.payments_in(PaymentState::ThreeDsRequired);
        let mut report = SweepReport {
            scanned: payments.len(),
            ..SweepReport::default()
        };

        for payment in payments.iter().filter(|p| self.is_stale(p, now)) {
            let result = self.bank.cancel_payment(&payment.id, payment.version);
            record(&mut report, "challenge timed out", payment, result);
        }
        report
    }
}

/// Refunds confirmed payments whose card the bank flags for refund.
pub struct RefundSweeper<B = AcquiringBank> {
    bank: Arc<B>,
}

impl<B> RefundSweeper<B> {
    pub fn new(bank: Arc<B>) -> Self {
        Self { bank }
    }
}

impl<B: PaymentLedger + 'static> Sweep for RefundSweeper<B> {
    fn name(&self) -> &'static str {
        "refund_sweeper"
    }

    fn sweep(&self, _now: DateTime<Utc>) -> SweepReport {
        let payments = self.bank.payments_in(PaymentState::Confirmed);
        let mut report = SweepReport {
            scanned: payments.len(),
            ..SweepReport::default()
        };

        for payment in payments.iter().filter(|p| p.is_refund_eligible()) {
            let result = self.bank.cancel_payment(&payment.id, payment.version);
            record(&mut report, "refund issued", payment, result);
        }
        report
    }
}

fn record<T>(
    report: &mut SweepReport,
    action: &str,
    payment: &AcquirerPayment,
    result: Result<T, AcquirerError>,
) {
    match result {
        Ok(_) => {
            report.applied += 1;
            info!(payment = %payment.id, "{action}");
        }
        Err(e) if e.kind() == ErrorKind::VersionMismatch => {
            report.skipped += 1;
            info!(payment = %payment.id, reason = %e, "changed since listing, skipped");
        }
        Err(e) => {
            report.failed += 1;
            warn!(payment = %payment.id, reason = %e, "{action} failed");
        }
    }
}
