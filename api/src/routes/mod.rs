pub mod checkout;
pub mod notification;
pub mod payment;
