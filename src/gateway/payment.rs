use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Amount;
use crate::acquirer::{PaymentId, PaymentResource};
use crate::model::CardDetails;
use crate::state::PaymentState;
use crate::store::{Record, Version};

/// Namespace for deriving acquirer ids from gateway ids.
const ACQUIRING_NAMESPACE: Uuid = Uuid::from_u128(0x5d1c_2a4e_8f3b_4c07_9a61_e2b7_40d9_c318);

/// Identifier of a payment at the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayPaymentId(Uuid);

impl GatewayPaymentId {
    pub fn new() -> Self {
        GatewayPaymentId(Uuid::new_v4())
    }

    /// The acquirer id this payment is initialised with.
    ///
    /// Deterministic, so re-running initialisation finds the same acquirer record.
    pub fn acquiring_id(&self) -> PaymentId {
        PaymentId::from(Uuid::new_v5(&ACQUIRING_NAMESPACE, self.0.as_bytes()))
    }
}

impl Default for GatewayPaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GatewayPaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Merchant-visible payment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayState {
    Processing,
    ActionRequired,
    Paid,
    Cancelled,
    Refunded,
    Rejected,
}

impl GatewayState {
    /// Coarse view of an acquirer state.
    pub fn project(state: PaymentState) -> Self {
        match state {
            PaymentState::New | PaymentState::Authorising | PaymentState::Authorised => {
                GatewayState::Processing
            }
            PaymentState::ThreeDsRequired => GatewayState::ActionRequired,
            PaymentState::Confirmed => GatewayState::Paid,
            PaymentState::Cancelled | PaymentState::Reversed => GatewayState::Cancelled,
            PaymentState::Refunded => GatewayState::Refunded,
            PaymentState::Rejected => GatewayState::Rejected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GatewayState::Processing => "processing",
            GatewayState::ActionRequired => "action_required",
            GatewayState::Paid => "paid",
            GatewayState::Cancelled => "cancelled",
            GatewayState::Refunded => "refunded",
            GatewayState::Rejected => "rejected",
        }
    }
}

impl fmt::Display for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last observed state of the acquirer record backing a gateway payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquiringMirror {
    pub id: PaymentId,
    pub state: PaymentState,
    pub version: Version,
}

impl From<PaymentResource> for AcquiringMirror {
    fn from(resource: PaymentResource) -> Self {
        Self {
            id: resource.id,
            state: resource.state,
            version: resource.version,
        }
    }
}

/// A merchant payment as recorded by the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayPayment {
    pub id: GatewayPaymentId,
    pub version: Version,

    pub amount: Amount,
    pub currency: String,
    pub card: CardDetails,
    pub hook_url: Option<String>,

    state: GatewayState,
    /// `None` until the acquirer payment has been created and authorised.
    acquiring: Option<AcquiringMirror>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl GatewayPayment {
    pub fn new(amount: Amount, currency: String, card: CardDetails) -> Self {
        let now = Utc::now();
        Self {
            id: GatewayPaymentId::new(),
            version: Version::new(),
            amount,
            currency,
            card,
            hook_url: None,
            state: GatewayState::Processing,
            acquiring: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> GatewayState {
        self.state
    }

    pub fn acquiring(&self) -> Option<&AcquiringMirror> {
        self.acquiring.as_ref()
    }

    pub fn acquiring_state(&self) -> Option<PaymentState> {
        self.acquiring.map(|mirror| mirror.state)
    }

    /// Whether `resource` is newer than what the mirror holds.
    pub fn is_stale(&self, resource: &PaymentResource) -> bool {
        self.acquiring
            .is_none_or(|mirror| mirror.version != resource.version)
    }

    /// Record the acquirer's state and derive the gateway state from it.
    pub fn mirror(&mut self, resource: PaymentResource) {
        self.acquiring = Some(AcquiringMirror::from(resource));
        self.state = GatewayState::project(resource.state);
    }

    pub fn view(&self) -> PaymentView {
        PaymentView {
            id: self.id,
            state: self.state,
            amount: self.amount,
            currency: self.currency.clone(),
            card_number: self.card.masked_number(),
            expiry_date: self.card.expiry_date.clone(),
            card_holder: self.card.holder.clone(),
            cvv: self.card.masked_cvv(),
            acquiring_state: self.acquiring_state(),
        }
    }
}

impl Record for GatewayPayment {
    type Id = GatewayPaymentId;

    fn id(&self) -> &GatewayPaymentId {
        &self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn stamp(&mut self, version: Version, at: DateTime<Utc>) {
        self.version = version;
        self.updated_at = at;
    }
}

/// Outward representation with card data masked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentView {
    pub id: GatewayPaymentId,
    pub state: GatewayState,
    pub amount: Amount,
    pub currency: String,
    pub card_number: String,
    pub expiry_date: String,
    pub card_holder: String,
    pub cvv: String,
    pub acquiring_state: Option<PaymentState>,
}
