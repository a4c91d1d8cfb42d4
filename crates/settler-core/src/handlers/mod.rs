//! Request handlers for the two legs of the payment protocol.

mod payment;
mod settlement;

pub use payment::{PaymentError, PaymentHandler};
pub use settlement::{CallbackDisposition, SettlementHandler, SettlementHandlerError};
