use crate::schema::payment_configs;

use diesel::prelude::*;
use diesel::result::Error as DieselError;
use serde::{Deserialize, Serialize};

/// Gateway account identity for one shop. Exactly one row per shop
/// (unique index); written by the admin, read-only to the core.
#[derive(Queryable, Identifiable, Debug, Clone, Serialize, Deserialize)]
pub struct PaymentConfig {
    pub id: i32,
    pub shop_id: i32,
    pub email: String,
    pub token: String,
    pub sandbox: bool,
}

impl PaymentConfig {
    pub fn get_by_shop(conn: &diesel::PgConnection, shop_id: i32) -> Result<Self, DieselError> {
        payment_configs::dsl::payment_configs
            .filter(payment_configs::shop_id.eq(shop_id))
            .first::<Self>(conn)
    }
}

#[derive(Insertable, Debug, Deserialize)]
#[table_name = "payment_configs"]
pub struct InsertablePaymentConfig {
    pub shop_id: i32,
    pub email: String,
    pub token: String,
    pub sandbox: bool,
}

impl InsertablePaymentConfig {
    pub fn insert(&self, conn: &diesel::PgConnection) -> Result<PaymentConfig, DieselError> {
        diesel::insert_into(payment_configs::table)
            .values(self)
            .get_result(conn)
    }
}
