pub mod client;
pub mod payment_request;
pub mod xml;
