//! Merchant-facing payment gateway.
//!
//! The gateway records each merchant payment, then drives it through the
//! acquirer with a [`Transitioner`]. Saga failures are not returned to the
//! creator: the payment stays at its last committed step and the resync worker
//! picks it up again.

use std::sync::Arc;

use chrono::Utc;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use crate::acquirer::Acquirer;
use crate::state::PaymentState;
use crate::worker::SweepReport;

mod error;
pub use error::GatewayError;

mod payment;
pub use payment::{AcquiringMirror, GatewayPayment, GatewayPaymentId, GatewayState, PaymentView};

mod repository;
pub use repository::{InMemoryPaymentRepository, PaymentRepository, RepositoryError};

pub mod resync;
pub use resync::Resync;

mod saga;
pub use saga::Transitioner;

mod validation;
pub use validation::{PaymentRequest, ValidationError};

/// A payment request, optionally with the token the customer will answer a
/// 3-D Secure challenge with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub request: PaymentRequest,
    pub challenge_response: Option<String>,
}

pub struct Gateway<A, R> {
    acquirer: Arc<A>,
    repository: Arc<R>,
    transitioner: Transitioner<A, R>,
}

/// Public API
impl<A: Acquirer, R: PaymentRepository> Gateway<A, R> {
    pub fn new(acquirer: Arc<A>, repository: Arc<R>) -> Self {
        let transitioner = Transitioner::new(Arc::clone(&acquirer), Arc::clone(&repository));
        Self {
            acquirer,
            repository,
            transitioner,
        }
    }

    /// Process submissions until the stream ends
    pub async fn run(&self, mut stream: impl Stream<Item = Submission> + Unpin) {
        while let Some(submission) = stream.next().await {
            // a failed submission must not stop the gateway
            let _ = self.submit(submission);
        }
    }

    /// Create a payment and, if it gets challenged, answer with the submitted token.
    pub fn submit(&self, submission: Submission) -> Result<GatewayPayment, GatewayError> {
        let payment = self.create_payment(submission.request);
        Self::log_result("create", &payment);
        let payment = payment?;

        match submission.challenge_response {
            Some(token) if payment.state() == GatewayState::ActionRequired => {
                let result = self.submit_challenge_response(&payment.id, &token);
                Self::log_result("challenge response", &result);
                result
            }
            _ => Ok(payment),
        }
    }

    /// Validate and record a payment, then run the saga once.
    ///
    /// Recording, the saga run and the final read share one repository scope.
    pub fn create_payment(&self, request: PaymentRequest) -> Result<GatewayPayment, GatewayError> {
        request.validate(Utc::now().date_naive())?;

        let mut payment = GatewayPayment::new(request.amount, request.currency, request.card);
        payment.hook_url = request.hook_url;

        self.repository.tx(|| {
            let id = self.repository.create(payment)?;
            if let Err(e) = self.transitioner.run(&id) {
                warn!(payment = %id, reason = %e, "transition aborted, left for resync");
            }
            Ok(self.repository.get(&id)?)
        })
    }

    /// Deliver the customer's 3-D Secure token and continue the saga.
    pub fn submit_challenge_response(
        &self,
        id: &GatewayPaymentId,
        token: &str,
    ) -> Result<GatewayPayment, GatewayError> {
        let payment = self.repository.get(id)?;
        let mirror = match payment.acquiring() {
            Some(mirror) if mirror.state == PaymentState::ThreeDsRequired => *mirror,
            _ => {
                return Err(GatewayError::NotAwaitingChallenge {
                    id: *id,
                    state: payment.state(),
                });
            }
        };

        self.acquirer
            .submit_challenge_response(&mirror.id, mirror.version, token)?;

        // first pass mirrors the outcome, a second one confirms if authorised
        let payment = self.transitioner.transition(id)?;
        if payment.acquiring_state() == Some(PaymentState::Authorised) {
            return self.transitioner.transition(id);
        }
        Ok(payment)
    }

    pub fn get_payment(&self, id: &GatewayPaymentId) -> Result<GatewayPayment, GatewayError> {
        Ok(self.repository.get(id)?)
    }

    /// Snapshot of every gateway payment.
    pub fn payments(&self) -> Result<Vec<GatewayPayment>, GatewayError> {
        self.repository
            .list_all()?
            .iter()
            .map(|id| self.get_payment(id))
            .collect()
    }

    /// Re-run the saga for every payment, skipping over failures.
    pub fn resync(&self) -> SweepReport {
        let ids = match self.repository.list_all() {
            Ok(ids) => ids,
            Err(e) => {
                warn!(reason = %e, "failed to list payments for resync");
                return SweepReport::default();
            }
        };

        let mut report = SweepReport {
            scanned: ids.len(),
            ..SweepReport::default()
        };
        for id in &ids {
            match self.transitioner.transition(id) {
                Ok(_) => report.applied += 1,
                Err(e) if Self::is_retryable(&e) => {
                    info!(payment = %id, reason = %e, "resync skipped");
                    report.skipped += 1;
                }
                Err(e) => {
                    warn!(payment = %id, reason = %e, "resync failed");
                    report.failed += 1;
                }
            }
        }
        report
    }
}

/// Private API
impl<A: Acquirer, R: PaymentRepository> Gateway<A, R> {
    /// Whether the next resync pass can be expected to succeed.
    fn is_retryable(e: &GatewayError) -> bool {
        match e {
            GatewayError::Acquirer(inner) => inner.kind().is_retryable(),
            other => other.kind().is_retryable(),
        }
    }

    /// Small helper to log submission results
    fn log_result(step: &str, result: &Result<GatewayPayment, GatewayError>) {
        match result {
            Ok(payment) => {
                info!(
                    payment = %payment.id,
                    amount = %payment.amount,
                    currency = %payment.currency,
                    state = %payment.state(),
                    "{step} done"
                );
            }
            Err(e) => {
                warn!(kind = %e.kind(), "{step} failed: {e}");
            }
        }
    }
}
