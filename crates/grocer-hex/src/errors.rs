use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use grocer_types::domain::quantity::QuantityError;
use grocer_types::ports::RepoError;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::application::deadline::CallError;

/// Failures of cart mutations and loads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(#[from] QuantityError),

    #[error("unknown product {0}")]
    UnknownProduct(String),

    #[error("persistence call timed out after {0:?}")]
    Timeout(Duration),

    #[error("persistence error: {0}")]
    Persistence(RepoError),
}

impl From<CallError> for CartError {
    fn from(e: CallError) -> Self {
        match e {
            CallError::Timeout(limit) => CartError::Timeout(limit),
            CallError::Repo(e) => CartError::Persistence(e),
        }
    }
}

/// Failures of the checkout transaction. None of them is retried here;
/// a retry is a fresh submission by the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("not authenticated")]
    NotAuthenticated,

    #[error("cart is empty")]
    EmptyCart,

    #[error("invalid shipping details: {0}")]
    InvalidShipping(String),

    #[error("invalid payment details: {0}")]
    InvalidPayment(String),

    #[error("cannot {action} while {state}")]
    OutOfOrder {
        action: &'static str,
        state: &'static str,
    },

    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    #[error("order {0} was already placed with this idempotency key")]
    DuplicateSubmission(Uuid),

    #[error("failed to load profile: {0}")]
    ProfileLoadFailed(CallError),

    #[error("invalid profile: {0}")]
    InvalidProfile(String),

    #[error("failed to save profile: {0}")]
    ProfileUpdateFailed(CallError),

    #[error("failed to create order: {0}")]
    OrderCreationFailed(CallError),

    #[error("failed to create order items: {source}")]
    OrderItemsCreationFailed { source: CallError, compensated: bool },

    #[error("order {0} not found")]
    OrderNotFound(Uuid),

    #[error("failed to load orders: {0}")]
    OrderLookupFailed(CallError),
}

impl CheckoutError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            CheckoutError::ProfileLoadFailed(CallError::Timeout(_))
                | CheckoutError::ProfileUpdateFailed(CallError::Timeout(_))
                | CheckoutError::OrderCreationFailed(CallError::Timeout(_))
                | CheckoutError::OrderItemsCreationFailed {
                    source: CallError::Timeout(_),
                    ..
                }
                | CheckoutError::OrderLookupFailed(CallError::Timeout(_))
        )
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Payment required: {0}")]
    PaymentRequired(String),

    #[error("Upstream timeout: {0}")]
    Timeout(String),

    #[error("Upstream failure: {0}")]
    BadGateway(String),

    #[error("Internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<CartError> for AppError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::InvalidQuantity(_) => AppError::BadRequest(e.to_string()),
            CartError::UnknownProduct(_) => AppError::NotFound(e.to_string()),
            CartError::Timeout(_) => AppError::Timeout(e.to_string()),
            CartError::Persistence(_) => AppError::Internal(anyhow::anyhow!(e.to_string())),
        }
    }
}

impl From<CheckoutError> for AppError {
    fn from(e: CheckoutError) -> Self {
        if e.is_timeout() {
            return AppError::Timeout(e.to_string());
        }
        match e {
            CheckoutError::NotAuthenticated => AppError::Unauthorized(e.to_string()),
            CheckoutError::EmptyCart
            | CheckoutError::InvalidShipping(_)
            | CheckoutError::InvalidPayment(_)
            | CheckoutError::InvalidProfile(_)
            | CheckoutError::OutOfOrder { .. } => AppError::BadRequest(e.to_string()),
            CheckoutError::PaymentDeclined(_) => AppError::PaymentRequired(e.to_string()),
            CheckoutError::DuplicateSubmission(_) => AppError::Conflict(e.to_string()),
            CheckoutError::OrderNotFound(_) => AppError::NotFound(e.to_string()),
            CheckoutError::ProfileLoadFailed(_)
            | CheckoutError::ProfileUpdateFailed(_)
            | CheckoutError::OrderCreationFailed(_)
            | CheckoutError::OrderItemsCreationFailed { .. }
            | CheckoutError::OrderLookupFailed(_) => AppError::BadGateway(e.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, msg) = match &self {
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            AppError::PaymentRequired(m) => (StatusCode::PAYMENT_REQUIRED, m.clone()),
            AppError::Timeout(m) => (StatusCode::GATEWAY_TIMEOUT, m.clone()),
            AppError::BadGateway(m) => (StatusCode::BAD_GATEWAY, m.clone()),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".into())
            }
        };

        let body = serde_json::to_string(&ErrorBody { error: msg })
            .unwrap_or_else(|_| "{\"error\":\"internal serialization\"}".into());
        (code, [("content-type", "application/json")], body).into_response()
    }
}
