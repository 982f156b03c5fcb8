//! Service-wide error type with its HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use uuid::Uuid;

use crate::checkout::CheckoutError;
use crate::domain::aggregates::{OrderError, OrderStatus};
use crate::domain::value_objects::OrderNumberError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("missing X-User-Id or X-Session-Id header")]
    MissingOwner,

    #[error("product {0} is not available")]
    ProductUnavailable(Uuid),

    #[error("insufficient stock for product {0}")]
    InsufficientStock(Uuid),

    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    #[error("record was modified concurrently, retry the operation")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MissingOwner => StatusCode::UNAUTHORIZED,
            AppError::ProductUnavailable(_)
            | AppError::InsufficientStock(_)
            | AppError::InvalidStatusTransition { .. }
            | AppError::Conflict => StatusCode::CONFLICT,
            AppError::EmptyCart => StatusCode::BAD_REQUEST,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<CheckoutError> for AppError {
    fn from(e: CheckoutError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<OrderNumberError> for AppError {
    fn from(e: OrderNumberError) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::InvalidTransition { from, to } => {
                AppError::InvalidStatusTransition { from, to }
            }
            OrderError::NoItems => AppError::EmptyCart,
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rule_errors_map_to_conflict() {
        assert_eq!(
            AppError::InsufficientStock(Uuid::new_v4()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::InvalidStatusTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Delivered
            }
            .status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn validation_maps_to_unprocessable() {
        let err: AppError = CheckoutError::InvalidEmail.into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn bad_order_number_maps_to_unprocessable() {
        let err: AppError = OrderNumberError::BadFormat.into();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
