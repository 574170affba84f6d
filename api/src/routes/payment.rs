use actix_web::http::header;
use actix_web::web::Path;
use actix_web::{get, post, HttpResponse};

use core_types::OrderId;
use engine::payment_engine::ProcessPaymentResponse;

use crate::{WebEngine, WebSettings};

/// Landing endpoint the gateway redirects the buyer to after an
/// off-site payment. The buyer continues back into the checkout
/// payment phase, where the refreshed order state decides what next.
#[get("/checkout/pagseguro/return")]
pub async fn payment_return(settings: WebSettings) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, settings.checkout_payment_url.clone()))
        .finish()
}

#[post("/checkout/{order_id}/process")]
pub async fn process_payment(
    payment_engine: WebEngine,
    settings: WebSettings,
    order_id: Path<OrderId>,
) -> HttpResponse {
    let location = match payment_engine.process_payment(order_id.into_inner()).await {
        ProcessPaymentResponse::Return => settings.checkout_return_url.clone(),
        ProcessPaymentResponse::Cancel { internal_error: false } => settings.checkout_cancel_url.clone(),
        ProcessPaymentResponse::Cancel { internal_error: true } => {
            format!("{}?problem=Internal+error", settings.checkout_cancel_url)
        }
    };
    HttpResponse::Found().insert_header((header::LOCATION, location)).finish()
}

/// Manual resync of one payment record against the gateway.
#[post("/pagseguro/payments/{payment_id}/refresh")]
pub async fn refresh_payment(payment_engine: WebEngine, payment_id: Path<i32>) -> HttpResponse {
    match payment_engine.refresh_payment(payment_id.into_inner()).await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(err) => HttpResponse::BadRequest().body(err.to_string()),
    }
}
