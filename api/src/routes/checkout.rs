use actix_web::web::{Form, Path};
use actix_web::{get, post, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;

use core_types::{Bank, OrderId, PaymentData, PaymentMethod, ShopId};
use models::orders::Order;
use xerror::api::*;

use crate::{WebDbPool, WebEngine};

/// Payment-phase form posted by the checkout UI. Everything is optional
/// at the wire level; validation decides what is actually acceptable.
#[derive(Deserialize)]
pub struct PaymentPhaseForm {
    #[serde(rename = "paymentMethod")]
    pub payment_method: Option<String>,
    #[serde(rename = "bankOption")]
    pub bank_option: Option<String>,
    #[serde(rename = "senderHash")]
    pub sender_hash: Option<String>,
}

/// Validates the payment phase form into a storable payment-data bag.
/// The bank option is only consulted for online debit; boleto ignores
/// whatever the form carries for it.
pub fn validate_payment_phase(form: &PaymentPhaseForm) -> Result<PaymentData, ValidationError> {
    let payment_method = form
        .payment_method
        .as_deref()
        .and_then(|method| PaymentMethod::from_str(method).ok())
        .ok_or(ValidationError::InvalidPaymentMethod)?;

    let (bank_name, bank_option) = match payment_method {
        PaymentMethod::OnlineDebit => {
            let option = form.bank_option.clone().unwrap_or_default();
            let bank = Bank::from_option_code(&option).ok_or(ValidationError::InvalidBankOption)?;
            (Some(bank), Some(option))
        }
        PaymentMethod::Boleto => (None, None),
    };

    let sender_hash = form
        .sender_hash
        .clone()
        .filter(|hash| !hash.is_empty())
        .ok_or(ValidationError::InvalidSenderHash)?;

    Ok(PaymentData {
        payment_method,
        bank_name,
        bank_option,
        sender_hash,
        code: None,
        payment_link: None,
    })
}

#[post("/checkout/{order_id}/payment")]
pub async fn submit_payment_phase(
    pool: WebDbPool,
    order_id: Path<OrderId>,
    form: Form<PaymentPhaseForm>,
) -> Result<HttpResponse, ApiError> {
    let bag = validate_payment_phase(&form).map_err(ApiError::Validation)?;

    let conn = pool.get().map_err(|_| ApiError::Db(DbError::DbConnectionError))?;
    let order = Order::get(&conn, order_id.into_inner()).map_err(|_| ApiError::Db(DbError::OrderDoesNotExist))?;
    order
        .set_payment_data_bag(&conn, &bag)
        .map_err(|_| ApiError::Db(DbError::CouldNotUpdateData))?;

    Ok(HttpResponse::Ok().finish())
}

#[get("/shop/{shop_id}/pagseguro/session")]
pub async fn open_session(payment_engine: WebEngine, shop_id: Path<ShopId>) -> HttpResponse {
    match payment_engine.open_session(shop_id.into_inner()).await {
        Ok(session_id) => HttpResponse::Ok().json(json!({ "session_id": session_id })),
        Err(err) => {
            slog::error!(payment_engine.logger, "Failed to open a gateway session"; "error" => %err);
            HttpResponse::InternalServerError().json(json!({"error": "gateway session unavailable"}))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(method: Option<&str>, bank: Option<&str>, hash: Option<&str>) -> PaymentPhaseForm {
        PaymentPhaseForm {
            payment_method: method.map(str::to_string),
            bank_option: bank.map(str::to_string),
            sender_hash: hash.map(str::to_string),
        }
    }

    #[test]
    fn boleto_needs_no_bank_option() {
        let bag = validate_payment_phase(&form(Some("boleto"), None, Some("HASH"))).unwrap();
        assert_eq!(bag.payment_method, PaymentMethod::Boleto);
        assert_eq!(bag.bank_name, None);
        assert_eq!(bag.bank_option, None);
        assert_eq!(bag.sender_hash, "HASH");
    }

    #[test]
    fn online_debit_resolves_the_bank() {
        let bag = validate_payment_phase(&form(Some("eft"), Some("304"), Some("HASH"))).unwrap();
        assert_eq!(bag.payment_method, PaymentMethod::OnlineDebit);
        assert_eq!(bag.bank_name, Some(Bank::BancoDoBrasil));
        assert_eq!(bag.bank_option.as_deref(), Some("304"));
    }

    #[test]
    fn unknown_method_is_rejected() {
        assert_eq!(
            validate_payment_phase(&form(Some("credit_card"), None, Some("HASH"))),
            Err(ValidationError::InvalidPaymentMethod)
        );
        assert_eq!(
            validate_payment_phase(&form(None, None, Some("HASH"))),
            Err(ValidationError::InvalidPaymentMethod)
        );
    }

    #[test]
    fn online_debit_with_a_bad_bank_is_rejected() {
        assert_eq!(
            validate_payment_phase(&form(Some("eft"), Some("999"), Some("HASH"))),
            Err(ValidationError::InvalidBankOption)
        );
        assert_eq!(
            validate_payment_phase(&form(Some("eft"), None, Some("HASH"))),
            Err(ValidationError::InvalidBankOption)
        );
    }

    #[test]
    fn missing_or_empty_sender_hash_is_rejected() {
        assert_eq!(
            validate_payment_phase(&form(Some("boleto"), None, None)),
            Err(ValidationError::InvalidSenderHash)
        );
        assert_eq!(
            validate_payment_phase(&form(Some("boleto"), None, Some(""))),
            Err(ValidationError::InvalidSenderHash)
        );
    }
}
