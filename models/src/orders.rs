use crate::schema::{order_payments, orders};

use bigdecimal::{BigDecimal, Zero};
use chrono::NaiveDateTime;
use core_types::{OrderStatus, PAYMENT_DATA_KEY};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Local mirror of an order. Order management itself is external; this row
/// carries what request building and reconciliation side effects need.
#[derive(Queryable, Identifiable, Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub shop_id: i32,
    pub reference: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub language: String,
    pub customer_cpf: Option<String>,
    pub customer_cnpj: Option<String>,
    pub shipping_street: String,
    pub shipping_city: String,
    pub shipping_state: Option<String>,
    pub shipping_country: String,
    pub shipping_postal_code: String,
    pub status: String,
    pub taxful_total_price: BigDecimal,
    pub paid_total: BigDecimal,
    pub payment_data: Option<serde_json::Value>,
    pub created_at: NaiveDateTime,
}

impl Order {
    pub fn get(conn: &diesel::PgConnection, id: Uuid) -> Result<Self, DieselError> {
        orders::dsl::orders.find(id).first::<Self>(conn)
    }

    pub fn status(&self) -> OrderStatus {
        OrderStatus::from_str(&self.status).unwrap_or(OrderStatus::Processing)
    }

    pub fn can_set_canceled(&self) -> bool {
        self.status() == OrderStatus::Processing && self.paid_total.is_zero()
    }

    pub fn set_canceled(&self, conn: &diesel::PgConnection) -> Result<usize, DieselError> {
        diesel::update(orders::dsl::orders.find(self.id))
            .set(orders::status.eq(OrderStatus::Canceled.to_string()))
            .execute(conn)
    }

    pub fn can_create_payment(&self) -> bool {
        self.status() != OrderStatus::Canceled && self.paid_total < self.taxful_total_price
    }

    pub fn get_total_unpaid_amount(&self) -> BigDecimal {
        &self.taxful_total_price - &self.paid_total
    }

    /// Records a payment against the order and marks it complete once the
    /// full total is covered. Callers run this inside the surrounding
    /// transaction.
    pub fn create_payment(
        &self,
        conn: &diesel::PgConnection,
        amount: BigDecimal,
        payment_identifier: &str,
    ) -> Result<(), DieselError> {
        let insertable = InsertableOrderPayment {
            order_id: self.id,
            amount: amount.clone(),
            payment_identifier: payment_identifier.to_string(),
        };
        diesel::insert_into(order_payments::table)
            .values(&insertable)
            .execute(conn)?;

        let new_paid_total = &self.paid_total + &amount;
        let new_status = if new_paid_total >= self.taxful_total_price {
            OrderStatus::Complete
        } else {
            self.status()
        };
        diesel::update(orders::dsl::orders.find(self.id))
            .set((
                orders::paid_total.eq(new_paid_total),
                orders::status.eq(new_status.to_string()),
            ))
            .execute(conn)?;
        Ok(())
    }

    /// The payment-method data bag stored under the gateway key.
    pub fn payment_data_bag(&self) -> Option<core_types::PaymentData> {
        let data = self.payment_data.as_ref()?;
        serde_json::from_value(data.get(PAYMENT_DATA_KEY)?.clone()).ok()
    }

    pub fn set_payment_data_bag(
        &self,
        conn: &diesel::PgConnection,
        bag: &core_types::PaymentData,
    ) -> Result<usize, DieselError> {
        let mut data = self.payment_data.clone().unwrap_or_else(|| serde_json::json!({}));
        if let Some(map) = data.as_object_mut() {
            map.insert(
                PAYMENT_DATA_KEY.to_string(),
                serde_json::to_value(bag).unwrap_or(serde_json::Value::Null),
            );
        }
        diesel::update(orders::dsl::orders.find(self.id))
            .set(orders::payment_data.eq(Some(data)))
            .execute(conn)
    }
}

#[derive(Queryable, Identifiable, Debug, Clone, Serialize, Deserialize)]
pub struct OrderPayment {
    pub id: i32,
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub payment_identifier: String,
    pub created_at: NaiveDateTime,
}

impl OrderPayment {
    pub fn get_by_order(conn: &diesel::PgConnection, order_id: Uuid) -> Result<Vec<Self>, DieselError> {
        order_payments::dsl::order_payments
            .filter(order_payments::order_id.eq(order_id))
            .load::<Self>(conn)
    }
}

#[derive(Insertable, Debug)]
#[table_name = "order_payments"]
pub struct InsertableOrderPayment {
    pub order_id: Uuid,
    pub amount: BigDecimal,
    pub payment_identifier: String,
}

#[derive(Insertable, Debug, Deserialize)]
#[table_name = "orders"]
pub struct InsertableOrder {
    pub id: Uuid,
    pub shop_id: i32,
    pub reference: String,
    pub customer_name: String,
    pub email: String,
    pub phone: String,
    pub language: String,
    pub customer_cpf: Option<String>,
    pub customer_cnpj: Option<String>,
    pub shipping_street: String,
    pub shipping_city: String,
    pub shipping_state: Option<String>,
    pub shipping_country: String,
    pub shipping_postal_code: String,
    pub status: String,
    pub taxful_total_price: BigDecimal,
    pub paid_total: BigDecimal,
    pub payment_data: Option<serde_json::Value>,
}

impl InsertableOrder {
    pub fn insert(&self, conn: &diesel::PgConnection) -> Result<Order, DieselError> {
        diesel::insert_into(orders::table).values(self).get_result(conn)
    }
}
