use err_derive::Error;
use serde::Serialize;

use actix_web::{error, http::StatusCode, HttpResponse};

/// User-correctable checkout input defects. Rendered as 400 with a plain
/// text reason, never logged as exceptional.
#[derive(Debug, Error, Serialize, PartialEq, Eq)]
pub enum ValidationError {
    #[error(display = "Invalid payment method")]
    InvalidPaymentMethod,
    #[error(display = "Invalid bank option")]
    InvalidBankOption,
    #[error(display = "Invalid sender hash")]
    InvalidSenderHash,
}

#[derive(Debug, Error, Serialize)]
pub enum DbError {
    #[error(display = "Unable to get connection to Db.")]
    DbConnectionError,
    #[error(display = "Order does not exist.")]
    OrderDoesNotExist,
    #[error(display = "Couldn't update data.")]
    CouldNotUpdateData,
}

#[derive(Debug, Error, Serialize)]
pub enum ApiError {
    #[error(display = "Validation error.")]
    Validation(ValidationError),
    #[error(display = "Db error.")]
    Db(DbError),
}

impl error::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::Validation(validation) => match validation {
                ValidationError::InvalidPaymentMethod => HttpResponse::BadRequest().body("Invalid payment method"),
                ValidationError::InvalidBankOption => HttpResponse::BadRequest().body("Invalid bank option"),
                ValidationError::InvalidSenderHash => HttpResponse::BadRequest().body("Invalid sender hash"),
            },
            ApiError::Db(db) => match db {
                DbError::DbConnectionError => HttpResponse::InternalServerError().json("Couldn't connect to Db."),
                DbError::OrderDoesNotExist => HttpResponse::NotFound().json("Order does not exist."),
                DbError::CouldNotUpdateData => HttpResponse::InternalServerError().json("Could not update data."),
            },
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Db(db) => match db {
                DbError::DbConnectionError => StatusCode::INTERNAL_SERVER_ERROR,
                DbError::OrderDoesNotExist => StatusCode::NOT_FOUND,
                DbError::CouldNotUpdateData => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}
