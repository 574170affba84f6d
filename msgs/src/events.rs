use core_types::*;

use serde::{Deserialize, Serialize};

/// Emitted once per reconciled notification so downstream notification
/// rules can react to any status transition, including redeliveries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentStatusChanged {
    pub order_id: OrderId,
    pub customer_email: String,
    pub customer_phone: String,
    pub language: String,
    pub old_status: TransactionStatus,
    pub new_status: TransactionStatus,
}
