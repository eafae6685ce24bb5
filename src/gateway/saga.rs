//! Drives a gateway payment through the acquirer's protocol.
//!
//! Each invocation loops: re-read the gateway payment, take one acquirer step
//! chosen by the mirrored acquirer state, persist the new mirror. It stops once
//! the acquirer is terminal or waiting on the customer (`3ds_required`).
//!
//! Steps are committed one at a time. A failed step aborts the invocation
//! and keeps whatever was already persisted; nothing on the acquirer side
//! is rolled back. Running the saga again resumes from the mirror.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{GatewayError, GatewayPayment, GatewayPaymentId, PaymentRepository};
use crate::acquirer::{Acquirer, CreatePayment, PaymentResource};
use crate::error::ErrorKind;
use crate::state::PaymentState;

pub struct Transitioner<A, R> {
    acquirer: Arc<A>,
    repository: Arc<R>,
}

impl<A: Acquirer, R: PaymentRepository> Transitioner<A, R> {
    pub fn new(acquirer: Arc<A>, repository: Arc<R>) -> Self {
        Self {
            acquirer,
            repository,
        }
    }

    /// Run the saga for `id` inside one repository transaction scope.
    pub fn transition(&self, id: &GatewayPaymentId) -> Result<GatewayPayment, GatewayError> {
        self.repository.tx(|| self.run(id))
    }

    /// Run the saga for `id`; the caller holds the transaction scope.
    pub(super) fn run(&self, id: &GatewayPaymentId) -> Result<GatewayPayment, GatewayError> {
        loop {
            let payment = self.repository.get(id)?;
            match payment.acquiring_state() {
                None => self.initialise(&payment)?,
                Some(PaymentState::Authorised) => self.confirm(&payment)?,
                Some(_) => return self.sync(payment),
            }
        }
    }

    /// Create the acquirer payment and submit the card.
    ///
    /// The acquirer id is derived from the gateway id, so a rerun after a lost
    /// mirror write picks up the record created last time.
    fn initialise(&self, payment: &GatewayPayment) -> Result<(), GatewayError> {
        let created = self.acquirer.create_payment(CreatePayment {
            id: payment.id.acquiring_id(),
            amount: payment.amount,
            currency: payment.currency.clone(),
            hook_url: payment.hook_url.clone(),
        })?;

        let resource = if created.state == PaymentState::New {
            self.acquirer
                .authorise_payment(&created.id, created.version, payment.card.clone())?
                .payment
        } else {
            debug!(payment = %payment.id, state = %created.state, "acquirer payment already exists");
            created
        };

        self.write_mirror(payment, resource)
    }

    fn confirm(&self, payment: &GatewayPayment) -> Result<(), GatewayError> {
        let Some(mirror) = payment.acquiring() else {
            return Ok(());
        };

        match self.acquirer.confirm_payment(&mirror.id, mirror.version) {
            Ok(resource) => self.write_mirror(payment, resource),
            Err(e) if e.kind() == ErrorKind::VersionMismatch => {
                // the acquirer moved on without us: refresh the mirror so the
                // next run branches on the real state, then report the conflict
                warn!(payment = %payment.id, reason = %e, "confirm lost a race");
                self.sync(payment.clone())?;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Mirror the acquirer's current state if it changed. Always ends the loop.
    fn sync(&self, payment: GatewayPayment) -> Result<GatewayPayment, GatewayError> {
        let Some(mirror) = payment.acquiring() else {
            return Ok(payment);
        };

        let resource = self.acquirer.get_payment(&mirror.id)?;
        if !payment.is_stale(&resource) {
            return Ok(payment);
        }

        let updated = self
            .repository
            .update(&payment.id, |p| p.mirror(resource))?;
        info!(
            payment = %updated.id,
            acquiring = %resource.state,
            state = %updated.state(),
            "payment synced"
        );
        Ok(updated)
    }

    fn write_mirror(
        &self,
        payment: &GatewayPayment,
        resource: PaymentResource,
    ) -> Result<(), GatewayError> {
        let updated = self
            .repository
            .update(&payment.id, |p| p.mirror(resource))?;
        info!(
            payment = %updated.id,
            acquiring = %resource.state,
            state = %updated.state(),
            "payment transitioned"
        );
        Ok(())
    }
}

impl<A, R> Clone for Transitioner<A, R> {
    fn clone(&self) -> Self {
        Self {
            acquirer: Arc::clone(&self.acquirer),
            repository: Arc::clone(&self.repository),
        }
    }
}
