use crate::schema::payments;

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local mirror of one gateway transaction: the opaque transaction code
/// plus the last raw payload fetched from the gateway. Created on the
/// first successful synchronous pay, refreshed by every notification and
/// by manual refresh, never deleted by the core.
#[derive(Queryable, Identifiable, Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i32,
    pub order_id: Uuid,
    pub code: String,
    pub data: Option<serde_json::Value>,
    pub last_update: NaiveDateTime,
}

impl Payment {
    /// Idempotent create-or-fetch keyed on (order, code). A repeated call
    /// with the same arguments returns the existing row.
    pub fn get_or_create(conn: &diesel::PgConnection, order_id: Uuid, code: &str) -> Result<Self, DieselError> {
        match payments::dsl::payments
            .filter(payments::order_id.eq(order_id))
            .filter(payments::code.eq(code))
            .first::<Self>(conn)
        {
            Ok(payment) => Ok(payment),
            Err(DieselError::NotFound) => {
                let insertable = InsertablePayment {
                    order_id,
                    code: code.to_string(),
                    data: None,
                    last_update: Utc::now().naive_utc(),
                };
                diesel::insert_into(payments::table).values(&insertable).get_result(conn)
            }
            Err(err) => Err(err),
        }
    }

    pub fn get(conn: &diesel::PgConnection, id: i32) -> Result<Self, DieselError> {
        payments::dsl::payments.find(id).first::<Self>(conn)
    }

    pub fn get_by_code(conn: &diesel::PgConnection, code: &str) -> Result<Self, DieselError> {
        payments::dsl::payments
            .filter(payments::code.eq(code))
            .order(payments::last_update.desc())
            .first::<Self>(conn)
    }

    /// Same lookup, but with the row locked for the surrounding
    /// transaction so concurrent notifications for one order serialize.
    pub fn get_by_code_for_update(conn: &diesel::PgConnection, code: &str) -> Result<Self, DieselError> {
        payments::dsl::payments
            .filter(payments::code.eq(code))
            .order(payments::last_update.desc())
            .for_update()
            .first::<Self>(conn)
    }

    /// Overwrites the raw payload and bumps `last_update`.
    pub fn save_data(&mut self, conn: &diesel::PgConnection, data: serde_json::Value) -> Result<usize, DieselError> {
        let now = Utc::now().naive_utc();
        let updated = diesel::update(payments::dsl::payments.find(self.id))
            .set((payments::data.eq(Some(data.clone())), payments::last_update.eq(now)))
            .execute(conn)?;
        self.data = Some(data);
        self.last_update = now;
        Ok(updated)
    }
}

#[derive(Insertable, Debug, Deserialize)]
#[table_name = "payments"]
pub struct InsertablePayment {
    pub order_id: Uuid,
    pub code: String,
    pub data: Option<serde_json::Value>,
    pub last_update: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::InsertableOrder;
    use bigdecimal::BigDecimal;
    use diesel::Connection;

    fn order_row() -> InsertableOrder {
        InsertableOrder {
            id: Uuid::new_v4(),
            shop_id: 1,
            reference: "REF1234".to_string(),
            customer_name: "Dog Hello".to_string(),
            email: "comprador@uol.com.br".to_string(),
            phone: "47 98821-2231".to_string(),
            language: "pt-br".to_string(),
            customer_cpf: None,
            customer_cnpj: None,
            shipping_street: "Woof Ave.".to_string(),
            shipping_city: "Dog Fort".to_string(),
            shipping_state: None,
            shipping_country: "BRA".to_string(),
            shipping_postal_code: "89999-999".to_string(),
            status: "processing".to_string(),
            taxful_total_price: BigDecimal::from(9),
            paid_total: BigDecimal::from(0),
            payment_data: None,
        }
    }

    // Needs Postgres; point TEST_DATABASE_URL at one and run with --ignored.
    #[test]
    #[ignore]
    fn get_or_create_is_idempotent_per_order_and_code() {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL");
        let conn = diesel::PgConnection::establish(&url).expect("test database connection");
        crate::init(&conn).expect("migrations");

        conn.test_transaction::<_, DieselError, _>(|| {
            let order = order_row().insert(&conn)?;

            let first = Payment::get_or_create(&conn, order.id, "CODE-1")?;
            let second = Payment::get_or_create(&conn, order.id, "CODE-1")?;
            assert_eq!(first.id, second.id);

            let other = Payment::get_or_create(&conn, order.id, "CODE-2")?;
            assert_ne!(other.id, first.id);
            Ok(())
        });
    }
}
