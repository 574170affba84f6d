#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;

pub mod conversions;
mod error;
pub mod order_lines;
pub mod orders;
pub mod payment_configs;
pub mod payments;
mod schema;

embed_migrations!("./migrations");

/// Our init function must be called once at the startup of any program using this crate.
/// It brings the schema up to date before anything touches the pool.
pub fn init(conn: &diesel::PgConnection) -> Result<(), error::GeneralError> {
    Ok(embedded_migrations::run(conn)?)
}
