use std::time::Duration;

use diesel::result::Error as DieselError;
use diesel::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use core_types::{DbPool, ShopId, TransactionStatus};
use models::conversions::big_to_decimal;
use models::order_lines::OrderLine;
use models::orders::Order;
use models::payment_configs::PaymentConfig;
use models::payments::Payment;
use msgs::events::PaymentStatusChanged;
use msgs::Message;
use pagseguro_connector::client::{GatewayConfig, PagSeguroClient, PaymentResult};
use pagseguro_connector::payment_request::{self, AddressSnapshot, LineSnapshot, OrderSnapshot};
use pagseguro_connector::xml;
use utils::xlogging::*;
use xerror::engine::ReconciliationError;
use xerror::gateway::GatewayError;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PaymentEngineSettings {
    pub gateway_timeout_secs: u64,
    pub logging_settings: LoggingSettings,
}

/// Where the checkout process phase should send the buyer next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessPaymentResponse {
    Return,
    Cancel { internal_error: bool },
}

/// Order side effect a reconciled status transition calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    CancelOrder,
    CreatePayment,
    None,
}

/// Maps a status transition to its order side effect. Pure so the
/// transition table is testable without a database. Repeated deliveries
/// of the same status plan nothing, which is what makes reconciliation
/// idempotent.
pub fn plan_side_effect(
    old_status: TransactionStatus,
    new_status: TransactionStatus,
    can_set_canceled: bool,
    can_create_payment: bool,
) -> SideEffect {
    if new_status == old_status {
        return SideEffect::None;
    }
    if new_status == TransactionStatus::Canceled && can_set_canceled {
        return SideEffect::CancelOrder;
    }
    if new_status == TransactionStatus::Paid && can_create_payment {
        return SideEffect::CreatePayment;
    }
    SideEffect::None
}

/// Builds the status event for one reconciled notification. A record
/// that never carried a status has no transition to report; everything
/// else produces an event, including redeliveries where the status did
/// not change. Pure companion of [`plan_side_effect`].
pub fn plan_status_event(
    order: &Order,
    old_status: Option<TransactionStatus>,
    new_status: TransactionStatus,
) -> Option<PaymentStatusChanged> {
    let old_status = old_status?;
    Some(PaymentStatusChanged {
        order_id: order.id,
        customer_email: order.email.clone(),
        customer_phone: order.phone.clone(),
        language: order.language.clone(),
        old_status,
        new_status,
    })
}

/// Reads the transaction status out of a parsed gateway document.
/// A document without a status field is fine for stored payloads
/// (checkout responses carry no status) and yields `None`.
pub fn document_status(data: &serde_json::Value) -> Result<Option<TransactionStatus>, ReconciliationError> {
    let raw = match xml::text_at(data, &["transaction", "status"]) {
        Some(raw) => raw,
        None => return Ok(None),
    };
    let code = raw
        .parse::<i32>()
        .map_err(|_| ReconciliationError::MalformedPayload(format!("non-numeric transaction status: {}", raw)))?;
    TransactionStatus::from_code(code)
        .map(Some)
        .map_err(ReconciliationError::MalformedPayload)
}

pub struct PaymentEngine {
    pub conn_pool: DbPool,
    pub events: mpsc::Sender<Message>,
    pub logger: slog::Logger,
    pub settings: PaymentEngineSettings,
}

impl PaymentEngine {
    pub fn new(conn_pool: DbPool, events: mpsc::Sender<Message>, settings: PaymentEngineSettings) -> Self {
        let logger = init_log(&settings.logging_settings);
        Self {
            conn_pool,
            events,
            logger,
            settings,
        }
    }

    fn conn(
        &self,
    ) -> Result<r2d2::PooledConnection<diesel::r2d2::ConnectionManager<diesel::PgConnection>>, ReconciliationError>
    {
        self.conn_pool
            .get()
            .map_err(|err| ReconciliationError::Db(err.to_string()))
    }

    /// Builds a gateway client from the shop's stored credentials.
    fn gateway_client(
        &self,
        conn: &diesel::PgConnection,
        shop_id: ShopId,
    ) -> Result<PagSeguroClient, ReconciliationError> {
        let config =
            PaymentConfig::get_by_shop(conn, shop_id).map_err(|_| ReconciliationError::ConfigNotFound(shop_id))?;
        Ok(PagSeguroClient::new(
            GatewayConfig::new(&config.email, &config.token, config.sandbox),
            Duration::from_secs(self.settings.gateway_timeout_secs),
        ))
    }

    /// Opens a gateway session for the checkout UI of the given shop.
    pub async fn open_session(&self, shop_id: ShopId) -> Result<String, ReconciliationError> {
        let conn = self.conn()?;
        let client = self.gateway_client(&conn, shop_id)?;
        Ok(client.get_session_id().await?)
    }

    /// Submits the order's payment to the gateway and decides where the
    /// buyer goes next. Gateway-reported request errors send the buyer
    /// back to checkout without the internal-error marker; anything
    /// unexpected is logged and marked internal.
    pub async fn process_payment(&self, order_id: Uuid) -> ProcessPaymentResponse {
        match self.try_process_payment(order_id).await {
            Ok(response) => response,
            Err(err) => {
                slog::error!(self.logger, "Payment processing failed";
                    "order_id" => %order_id,
                    "error" => %err,
                );
                ProcessPaymentResponse::Cancel { internal_error: true }
            }
        }
    }

    async fn try_process_payment(&self, order_id: Uuid) -> Result<ProcessPaymentResponse, ReconciliationError> {
        let conn = self.conn()?;
        let order =
            Order::get(&conn, order_id).map_err(|_| ReconciliationError::OrderNotFound(order_id.to_string()))?;
        let payment_data = order.payment_data_bag().ok_or_else(|| {
            ReconciliationError::MalformedPayload("order has no payment data from the checkout phase".to_string())
        })?;
        let lines = OrderLine::get_by_order(&conn, order_id)?;
        let snapshot = order_snapshot(&order, &lines)?;
        let client = self.gateway_client(&conn, order.shop_id)?;

        let payment = payment_request::build_payment(&snapshot, &payment_data);
        match client.pay(&payment).await? {
            PaymentResult::Failure(failure) => {
                slog::error!(self.logger, "Gateway rejected payment request";
                    "order_id" => %order_id,
                    "errors" => serde_json::to_string(&failure.errors).unwrap_or_default(),
                );
                Ok(ProcessPaymentResponse::Cancel { internal_error: false })
            }
            PaymentResult::Success(success) => {
                let mut record = Payment::get_or_create(&conn, order.id, &success.code)?;
                record.save_data(&conn, success.data.clone())?;

                let mut bag = payment_data;
                bag.code = Some(success.code.clone());
                bag.payment_link = success.payment_link.clone();
                order.set_payment_data_bag(&conn, &bag)?;

                slog::info!(self.logger, "Payment submitted";
                    "order_id" => %order_id,
                    "transaction_code" => success.code,
                );
                Ok(ProcessPaymentResponse::Return)
            }
        }
    }

    /// Replaces a payment record's stored payload with the transaction
    /// document the gateway holds right now.
    pub async fn refresh_payment(&self, payment_id: i32) -> Result<(), ReconciliationError> {
        let conn = self.conn()?;
        let mut payment =
            Payment::get(&conn, payment_id).map_err(|_| ReconciliationError::PaymentNotFound(payment_id.to_string()))?;
        let order = Order::get(&conn, payment.order_id)
            .map_err(|_| ReconciliationError::OrderNotFound(payment.order_id.to_string()))?;
        let client = self.gateway_client(&conn, order.shop_id)?;
        let document = client.get_transaction_info(&payment.code).await?;
        payment.save_data(&conn, document)?;
        Ok(())
    }

    /// Reconciles one webhook notification: fetches the authoritative
    /// document behind the notification code, then compares, stores and
    /// applies order side effects inside a single transaction holding a
    /// row lock on the payment record. A status event goes out after
    /// commit whenever the stored payload already carried a status.
    pub async fn handle_notification(
        &self,
        shop_id: ShopId,
        notification_code: &str,
    ) -> Result<(), ReconciliationError> {
        let conn = self.conn()?;
        let client = self.gateway_client(&conn, shop_id)?;
        let document = client.get_notification_info(notification_code).await?;

        let transaction_code = xml::text_at(&document, &["transaction", "code"])
            .ok_or_else(|| GatewayError::Parse("notification document without a transaction code".to_string()))?
            .to_string();
        let new_status = document_status(&document)?
            .ok_or_else(|| GatewayError::Parse("notification document without a status".to_string()))?;

        let event = conn.transaction::<Option<PaymentStatusChanged>, ReconciliationError, _>(|| {
            let mut payment = match Payment::get_by_code_for_update(&conn, &transaction_code) {
                Ok(payment) => payment,
                Err(DieselError::NotFound) => {
                    return Err(ReconciliationError::PaymentNotFound(transaction_code.clone()))
                }
                Err(err) => return Err(err.into()),
            };
            let order = Order::get(&conn, payment.order_id)
                .map_err(|_| ReconciliationError::OrderNotFound(payment.order_id.to_string()))?;

            let old_status = match payment.data.as_ref() {
                Some(data) => document_status(data)?,
                None => None,
            };

            payment.save_data(&conn, document.clone())?;

            // A record that never carried a status has nothing to
            // transition from; store the payload and stop.
            if let Some(old_status) = old_status {
                match plan_side_effect(old_status, new_status, order.can_set_canceled(), order.can_create_payment())
                {
                    SideEffect::CancelOrder => {
                        order.set_canceled(&conn)?;
                    }
                    SideEffect::CreatePayment => {
                        order.create_payment(&conn, order.get_total_unpaid_amount(), &payment.code)?;
                    }
                    SideEffect::None => {}
                }
            }

            Ok(plan_status_event(&order, old_status, new_status))
        })?;

        if let Some(event) = event {
            slog::info!(self.logger, "Payment status reconciled";
                "order_id" => %event.order_id,
                "old_status" => %event.old_status,
                "new_status" => %event.new_status,
            );
            if self.events.send(Message::PaymentStatusChanged(event)).await.is_err() {
                slog::error!(self.logger, "Event listener is gone, status event dropped");
            }
        }
        Ok(())
    }
}

fn order_snapshot(order: &Order, lines: &[OrderLine]) -> Result<OrderSnapshot, ReconciliationError> {
    let taxful_total_price = decimal_field(&order.taxful_total_price, "order total")?;
    let lines = lines
        .iter()
        .map(|line| {
            Ok(LineSnapshot {
                sku: line.sku.clone(),
                text: line.text.clone(),
                quantity: line.quantity,
                taxful_price: decimal_field(&line.taxful_price, "order line price")?,
            })
        })
        .collect::<Result<Vec<_>, ReconciliationError>>()?;

    Ok(OrderSnapshot {
        reference: order.reference.clone(),
        customer_name: order.customer_name.clone(),
        email: order.email.clone(),
        phone: order.phone.clone(),
        taxful_total_price,
        lines,
        shipping_address: AddressSnapshot {
            street: order.shipping_street.clone(),
            city: order.shipping_city.clone(),
            state: order.shipping_state.clone(),
            country: order.shipping_country.clone(),
            postal_code: order.shipping_postal_code.clone(),
        },
        cpf: order.customer_cpf.clone(),
        cnpj: order.customer_cnpj.clone(),
    })
}

fn decimal_field(value: &bigdecimal::BigDecimal, what: &str) -> Result<Decimal, ReconciliationError> {
    big_to_decimal(value).ok_or_else(|| ReconciliationError::MalformedPayload(format!("unrepresentable {}", what)))
}
