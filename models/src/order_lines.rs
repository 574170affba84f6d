use crate::schema::order_lines;

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Queryable, Identifiable, Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i32,
    pub order_id: Uuid,
    pub sku: String,
    pub text: String,
    pub quantity: i32,
    pub taxful_price: BigDecimal,
}

impl OrderLine {
    pub fn get_by_order(conn: &diesel::PgConnection, order_id: Uuid) -> Result<Vec<Self>, DieselError> {
        order_lines::dsl::order_lines
            .filter(order_lines::order_id.eq(order_id))
            .load::<Self>(conn)
    }
}

#[derive(Insertable, Debug, Deserialize)]
#[table_name = "order_lines"]
pub struct InsertableOrderLine {
    pub order_id: Uuid,
    pub sku: String,
    pub text: String,
    pub quantity: i32,
    pub taxful_price: BigDecimal,
}

impl InsertableOrderLine {
    pub fn insert(&self, conn: &diesel::PgConnection) -> Result<OrderLine, DieselError> {
        diesel::insert_into(order_lines::table).values(self).get_result(conn)
    }
}
