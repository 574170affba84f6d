use diesel::{r2d2::ConnectionManager, PgConnection};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type DbPool = r2d2::Pool<ConnectionManager<PgConnection>>;
pub type ShopId = i32;
pub type OrderId = Uuid;

pub const PAYMENT_DATA_KEY: &str = "pagseguro";

/// Gateway transaction lifecycle states. The numeric code is the wire
/// representation used in transaction documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    WaitingPayment,
    InAnalysis,
    Paid,
    Available,
    InDispute,
    Refunded,
    Canceled,
    Debited,
    TempRetention,
}

impl TransactionStatus {
    pub fn from_code(code: i32) -> Result<Self, String> {
        match code {
            1 => Ok(Self::WaitingPayment),
            2 => Ok(Self::InAnalysis),
            3 => Ok(Self::Paid),
            4 => Ok(Self::Available),
            5 => Ok(Self::InDispute),
            6 => Ok(Self::Refunded),
            7 => Ok(Self::Canceled),
            8 => Ok(Self::Debited),
            9 => Ok(Self::TempRetention),
            unknown => Err(format!("unknown transaction status code: {}", unknown)),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::WaitingPayment => 1,
            Self::InAnalysis => 2,
            Self::Paid => 3,
            Self::Available => 4,
            Self::InDispute => 5,
            Self::Refunded => 6,
            Self::Canceled => 7,
            Self::Debited => 8,
            Self::TempRetention => 9,
        }
    }

    /// Projection shown to the buyer. Display only, never used for control
    /// flow.
    pub fn customer_status(&self) -> CustomerStatus {
        match self {
            Self::WaitingPayment => CustomerStatus::WaitingPayment,
            Self::InAnalysis => CustomerStatus::InAnalysis,
            Self::Paid | Self::Available => CustomerStatus::Paid,
            Self::InDispute | Self::TempRetention => CustomerStatus::InDispute,
            Self::Refunded | Self::Debited => CustomerStatus::Refunded,
            Self::Canceled => CustomerStatus::Canceled,
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self {
            Self::WaitingPayment => "WaitingPayment",
            Self::InAnalysis => "InAnalysis",
            Self::Paid => "Paid",
            Self::Available => "Available",
            Self::InDispute => "InDispute",
            Self::Refunded => "Refunded",
            Self::Canceled => "Canceled",
            Self::Debited => "Debited",
            Self::TempRetention => "TempRetention",
        };

        write!(f, "{sign}")
    }
}

/// Buyer-visible vocabulary, collapsed from [`TransactionStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustomerStatus {
    WaitingPayment,
    InAnalysis,
    Paid,
    InDispute,
    Refunded,
    Canceled,
}

impl fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self {
            Self::WaitingPayment => "WaitingPayment",
            Self::InAnalysis => "InAnalysis",
            Self::Paid => "Paid",
            Self::InDispute => "InDispute",
            Self::Refunded => "Refunded",
            Self::Canceled => "Canceled",
        };

        write!(f, "{sign}")
    }
}

/// Payment methods the merchant can enable. The serialized identifier is
/// what the checkout phase submits and what the gateway expects in the
/// payment document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "boleto")]
    Boleto,
    #[serde(rename = "eft")]
    OnlineDebit,
}

impl PaymentMethod {
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Boleto => "boleto",
            Self::OnlineDebit => "eft",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(method: &str) -> Result<PaymentMethod, Self::Err> {
        match method {
            "boleto" => Ok(PaymentMethod::Boleto),
            "eft" => Ok(PaymentMethod::OnlineDebit),
            _ => Err("unknown payment method".to_string()),
        }
    }
}

/// Banks supported for the online debit method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bank {
    #[serde(rename = "bradesco")]
    Bradesco,
    #[serde(rename = "itau")]
    Itau,
    #[serde(rename = "bancodobrasil")]
    BancoDoBrasil,
    #[serde(rename = "banrisul")]
    Banrisul,
    #[serde(rename = "hsbc")]
    Hsbc,
}

impl Bank {
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Bradesco => "bradesco",
            Self::Itau => "itau",
            Self::BancoDoBrasil => "bancodobrasil",
            Self::Banrisul => "banrisul",
            Self::Hsbc => "hsbc",
        }
    }

    /// Maps the numeric bank option submitted by the checkout form to a
    /// supported bank.
    pub fn from_option_code(code: &str) -> Option<Self> {
        match code {
            "301" => Some(Self::Bradesco),
            "302" => Some(Self::Itau),
            "304" => Some(Self::BancoDoBrasil),
            "306" => Some(Self::Banrisul),
            "307" => Some(Self::Hsbc),
            _ => None,
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Processing,
    Canceled,
    Complete,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self {
            Self::Processing => "processing",
            Self::Canceled => "canceled",
            Self::Complete => "complete",
        };

        write!(f, "{sign}")
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(status: &str) -> Result<OrderStatus, Self::Err> {
        match status {
            "processing" => Ok(OrderStatus::Processing),
            "canceled" => Ok(OrderStatus::Canceled),
            "complete" => Ok(OrderStatus::Complete),
            _ => Err("unknown order status".to_string()),
        }
    }
}

/// The order's payment-method data bag, stored under the
/// [`PAYMENT_DATA_KEY`] key of `orders.payment_data`. The first three
/// fields are captured verbatim by the checkout phase; `code` and
/// `payment_link` are merged in once a synchronous pay succeeds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentData {
    pub payment_method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<Bank>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_option: Option<String>,
    pub sender_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_link: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_status_codes_round_trip() {
        for code in 1..=9 {
            let status = TransactionStatus::from_code(code).unwrap();
            assert_eq!(status.code(), code);
        }
        assert!(TransactionStatus::from_code(0).is_err());
        assert!(TransactionStatus::from_code(10).is_err());
    }

    #[test]
    fn customer_projection_collapses_backoffice_states() {
        assert_eq!(TransactionStatus::Available.customer_status(), CustomerStatus::Paid);
        assert_eq!(TransactionStatus::Debited.customer_status(), CustomerStatus::Refunded);
        assert_eq!(
            TransactionStatus::TempRetention.customer_status(),
            CustomerStatus::InDispute
        );
        assert_eq!(TransactionStatus::Paid.customer_status(), CustomerStatus::Paid);
        assert_eq!(TransactionStatus::Canceled.customer_status(), CustomerStatus::Canceled);
    }

    #[test]
    fn bank_option_codes() {
        assert_eq!(Bank::from_option_code("301"), Some(Bank::Bradesco));
        assert_eq!(Bank::from_option_code("302"), Some(Bank::Itau));
        assert_eq!(Bank::from_option_code("304"), Some(Bank::BancoDoBrasil));
        assert_eq!(Bank::from_option_code("306"), Some(Bank::Banrisul));
        assert_eq!(Bank::from_option_code("307"), Some(Bank::Hsbc));
        assert_eq!(Bank::from_option_code("999"), None);
    }

    #[test]
    fn payment_method_identifiers() {
        assert_eq!("boleto".parse::<PaymentMethod>().unwrap(), PaymentMethod::Boleto);
        assert_eq!("eft".parse::<PaymentMethod>().unwrap(), PaymentMethod::OnlineDebit);
        assert!("credit_card".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn payment_data_bag_serializes_wire_identifiers() {
        let data = PaymentData {
            payment_method: PaymentMethod::OnlineDebit,
            bank_name: Some(Bank::BancoDoBrasil),
            bank_option: Some("304".to_string()),
            sender_hash: "J7E98Y37WEIRUHDIAI9U8RYE7UQE".to_string(),
            code: None,
            payment_link: None,
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value["payment_method"], "eft");
        assert_eq!(value["bank_name"], "bancodobrasil");
        assert!(value.get("code").is_none());
    }
}
