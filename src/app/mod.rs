pub mod session;

use std::fmt::Display;
use actix_web::{ResponseError, HttpResponse, error::BlockingError, http::StatusCode};
use diesel::result::DatabaseErrorKind;
use diesel::r2d2::PoolError;
use log::{error, warn};
use crate::database::db_utils::PgPool;

pub use session::DbSession;

/** Shared by every worker, built once at startup and dropped at shutdown */
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/** Holds the errors we will use during request processing */
#[derive(Debug, PartialEq, Eq)]
pub enum AppError {
    InternalServerError,
    ServiceUnavailable,
    NotFound,
    Conflict,
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InternalServerError => f.write_str("Internal server error"),
            AppError::ServiceUnavailable => f.write_str("Service unavailable"),
            AppError::NotFound => f.write_str("Not found"),
            AppError::Conflict => f.write_str("Conflict"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict => StatusCode::CONFLICT,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::new(self.status_code())
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => AppError::NotFound,
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
            | diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                AppError::Conflict
            }
            err => {
                error!("Database error: {}", err);
                AppError::InternalServerError
            }
        }
    }
}

impl From<PoolError> for AppError {
    fn from(err: PoolError) -> Self {
        warn!("No database connection available: {}", err);
        AppError::ServiceUnavailable
    }
}

impl From<BlockingError> for AppError {
    fn from(_: BlockingError) -> Self {
        AppError::InternalServerError
    }
}

impl std::error::Error for AppError {}
