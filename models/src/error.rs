use err_derive::Error;

#[derive(Debug, Error)]
pub enum GeneralError {
    #[error(display = "Migration error: {}", _0)]
    Migration(#[error(source)] diesel_migrations::RunMigrationsError),
}
