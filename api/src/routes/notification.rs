use actix_web::web::{Bytes, Path};
use actix_web::{post, HttpResponse};
use serde::Deserialize;

use core_types::ShopId;

use crate::WebEngine;

/// The checkout widget posts notifications cross-origin from the
/// sandbox; production deliveries come server-side and ignore CORS.
pub const NOTIFICATION_ALLOW_ORIGIN: &str = "https://sandbox.pagseguro.uol.com.br";

#[derive(Deserialize)]
pub struct NotificationForm {
    #[serde(rename = "notificationCode")]
    pub notification_code: Option<String>,
    #[serde(rename = "notificationType")]
    pub notification_type: Option<String>,
}

/// Decoded by hand rather than through the `Form` extractor so that a
/// malformed body cannot short-circuit the handler with a 400.
fn decode_notification(body: &[u8]) -> Result<NotificationForm, serde_urlencoded::de::Error> {
    serde_urlencoded::from_bytes(body)
}

/// Webhook receiver. The gateway keeps retrying deliveries that do not
/// get a 200 back, so this endpoint acknowledges everything, malformed
/// bodies included, and keeps failures in the log.
#[post("/shop/{shop_id}/pagseguro/notify")]
pub async fn notification(payment_engine: WebEngine, shop_id: Path<ShopId>, body: Bytes) -> HttpResponse {
    let shop_id = shop_id.into_inner();
    match decode_notification(&body) {
        Ok(form) => match form.notification_code.as_deref() {
            Some(notification_code) if !notification_code.is_empty() => {
                if let Err(err) = payment_engine.handle_notification(shop_id, notification_code).await {
                    slog::error!(payment_engine.logger, "Notification handling failed";
                        "shop_id" => shop_id,
                        "notification_code" => notification_code,
                        "notification_type" => form.notification_type.clone().unwrap_or_default(),
                        "error" => %err,
                    );
                }
            }
            _ => {
                slog::error!(payment_engine.logger, "Notification without a notificationCode"; "shop_id" => shop_id);
            }
        },
        Err(err) => {
            slog::error!(payment_engine.logger, "Undecodable notification body";
                "shop_id" => shop_id,
                "error" => %err,
            );
        }
    }

    HttpResponse::Ok()
        .insert_header(("Access-Control-Allow-Origin", NOTIFICATION_ALLOW_ORIGIN))
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_code_and_type_from_a_delivery() {
        let form = decode_notification(
            b"notificationCode=766B9C-AD4B044B04DA-77742F5FA653-E1AB24&notificationType=transaction",
        )
        .unwrap();
        assert_eq!(
            form.notification_code.as_deref(),
            Some("766B9C-AD4B044B04DA-77742F5FA653-E1AB24")
        );
        assert_eq!(form.notification_type.as_deref(), Some("transaction"));
    }

    #[test]
    fn missing_code_decodes_without_failing() {
        let form = decode_notification(b"notificationType=transaction").unwrap();
        assert_eq!(form.notification_code, None);
    }

    #[test]
    fn junk_body_decodes_to_an_empty_form_instead_of_rejecting() {
        let form = decode_notification(b"%zz&&=broken").unwrap();
        assert_eq!(form.notification_code, None);
        assert_eq!(form.notification_type, None);
    }

    #[test]
    fn duplicate_fields_are_a_decode_error_the_handler_still_acks() {
        assert!(decode_notification(b"notificationCode=a&notificationCode=b").is_err());
    }
}
