//! HTTP surface: router, shared state and the owner extractor.
//!
//! Token verification belongs to the external issuer; by the time a
//! request reaches this service the gateway has resolved it to an
//! `X-User-Id` (authenticated) or `X-Session-Id` (anonymous) header.

pub mod cart;
pub mod checkout;
pub mod orders;
pub mod products;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::config::Config;
use crate::domain::value_objects::Owner;
use crate::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub nats: Option<async_nats::Client>,
    pub config: Arc<Config>,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
}

#[async_trait]
impl<S> FromRequestParts<S> for Owner
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(value) = parts.headers.get("x-user-id") {
            let id = value
                .to_str()
                .ok()
                .and_then(|s| Uuid::parse_str(s.trim()).ok())
                .ok_or_else(|| AppError::Validation("invalid X-User-Id header".into()))?;
            return Ok(Owner::User(id));
        }
        if let Some(value) = parts.headers.get("x-session-id") {
            let session = value
                .to_str()
                .map_err(|_| AppError::Validation("invalid X-Session-Id header".into()))?
                .trim();
            if !session.is_empty() {
                return Ok(Owner::Session(session.to_string()));
            }
        }
        Err(AppError::MissingOwner)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/products", get(products::list_products))
        .route("/api/v1/products/:id", get(products::get_product))
        .route(
            "/api/v1/cart",
            get(cart::get_cart).post(cart::add_to_cart).delete(cart::clear_cart),
        )
        .route(
            "/api/v1/cart/items/:product_id",
            put(cart::update_quantity).delete(cart::remove_item),
        )
        .route("/api/v1/cart/sync", post(cart::sync_cart))
        .route("/api/v1/checkout", post(checkout::submit_checkout))
        .route("/api/v1/orders", get(orders::list_orders))
        .route("/api/v1/orders/:id", get(orders::get_order))
        .route(
            "/api/v1/orders/by-number/:order_number",
            get(orders::get_order_by_number),
        )
        .route("/api/v1/orders/:id/status", put(orders::update_status))
        .route("/api/v1/orders/:id/tracking", put(orders::set_tracking))
        .route("/api/v1/order-statuses", get(orders::list_statuses))
        .route("/api/v1/notifications/retry", post(orders::retry_notifications))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "storefront-orders"}))
}
