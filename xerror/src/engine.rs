use err_derive::Error;
use serde::Serialize;

use crate::gateway::GatewayError;

#[derive(Debug, Error, Serialize)]
pub enum ReconciliationError {
    #[error(display = "Gateway error: {}", _0)]
    Gateway(#[error(source)] GatewayError),
    #[error(display = "No payment record with code {}.", _0)]
    PaymentNotFound(String),
    #[error(display = "No order {} for payment record.", _0)]
    OrderNotFound(String),
    #[error(display = "Payment config for shop {} not found.", _0)]
    ConfigNotFound(i32),
    #[error(display = "Malformed stored payload: {}", _0)]
    MalformedPayload(String),
    #[error(display = "Database error: {}", _0)]
    Db(String),
}

impl From<diesel::result::Error> for ReconciliationError {
    fn from(err: diesel::result::Error) -> Self {
        ReconciliationError::Db(err.to_string())
    }
}
