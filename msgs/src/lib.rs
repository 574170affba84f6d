use serde::{Deserialize, Serialize};

pub mod events;

use events::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    PaymentStatusChanged(PaymentStatusChanged),
}
