use actix_web::web::Data;
use actix_web::{web, App, HttpServer};
use diesel::{r2d2::ConnectionManager, PgConnection};
use serde::{Deserialize, Serialize};
use std::env;

use tokio::sync::mpsc;

use core_types::DbPool;
use engine::payment_engine::{PaymentEngine, PaymentEngineSettings};
use msgs::Message;

pub mod routes;

#[derive(Serialize, Deserialize, Clone)]
pub struct ApiSettings {
    psql_url: String,
    /// Checkout payment-phase page; the gateway return landing sends the
    /// buyer back here.
    pub checkout_payment_url: String,
    /// Where the buyer lands after a successful gateway submission.
    pub checkout_return_url: String,
    /// Where the buyer lands when the submission fails.
    pub checkout_cancel_url: String,
    pub payment_engine: PaymentEngineSettings,
}

pub type WebDbPool = web::Data<DbPool>;
pub type WebEngine = web::Data<PaymentEngine>;
pub type WebSettings = web::Data<ApiSettings>;

pub async fn start(settings: ApiSettings) -> std::io::Result<()> {
    let endpoint = env::var("ENDPOINT").unwrap_or("127.0.0.1:8080".to_string());
    let pool = r2d2::Pool::builder()
        .build(ConnectionManager::<PgConnection>::new(settings.psql_url.clone()))
        .expect("Failed to create pool.");

    {
        let conn = pool.get().expect("Failed to get DB connection to initialize models");
        models::init(&conn).expect("Failed to initialize models");
    }

    let (tx, rx) = mpsc::channel(1024);

    let payment_engine = PaymentEngine::new(pool.clone(), tx, settings.payment_engine.clone());
    let event_logger = payment_engine.logger.clone();
    tokio::task::spawn(event_listener(rx, event_logger));

    let engine_data = Data::new(payment_engine);

    HttpServer::new(move || {
        App::new()
            .app_data(Data::new(pool.clone()))
            .app_data(engine_data.clone())
            .app_data(Data::new(settings.clone()))
            .service(routes::checkout::submit_payment_phase)
            .service(routes::checkout::open_session)
            .service(routes::payment::payment_return)
            .service(routes::payment::process_payment)
            .service(routes::payment::refresh_payment)
            .service(routes::notification::notification)
    })
    .bind(endpoint)?
    .run()
    .await
}

/// Drains reconciliation events. Customer messaging hangs off this
/// listener; for now every event lands in the log.
async fn event_listener(mut events: mpsc::Receiver<Message>, logger: slog::Logger) {
    while let Some(message) = events.recv().await {
        match message {
            Message::PaymentStatusChanged(event) => {
                slog::info!(logger, "PaymentStatusChanged";
                    "order_id" => %event.order_id,
                    "old_status" => %event.old_status,
                    "new_status" => %event.new_status,
                    "customer_email" => event.customer_email.clone(),
                    "language" => event.language.clone(),
                );
            }
        }
    }
}
