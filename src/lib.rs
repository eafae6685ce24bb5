pub mod acquirer;
pub mod amount;
pub mod config;
pub mod csv;
pub mod error;
pub mod gateway;
pub mod model;
pub mod state;
pub mod store;
pub mod worker;

pub use acquirer::{Acquirer, AcquiringBank};
pub use amount::Amount;
pub use config::Config;
pub use error::ErrorKind;
pub use gateway::{Gateway, GatewayPayment, GatewayState, InMemoryPaymentRepository};
pub use state::PaymentState;
