//! Order read and admin endpoints.
//!
//! Status transitions and tracking updates are operator actions; access
//! control for them sits at the gateway, like the rest of auth.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::{OrderStatus, Tracking};
use crate::domain::value_objects::OrderNumber;
use crate::error::Result;
use crate::http::{AppState, PaginatedResponse};
use crate::service::order::{OrderRow, OrderWithItems};
use crate::service::{NotificationOutbox, OrderService};

pub type OrderResponse = OrderWithItems;

fn service(s: &AppState) -> OrderService {
    OrderService::new(
        s.db.clone(),
        s.nats.clone(),
        s.config.currency.clone(),
        s.config.whatsapp_number.clone(),
    )
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Restrict to one customer's orders (the storefront passes its own
    /// user id; the back-office omits it).
    pub user_id: Option<Uuid>,
}

pub async fn list_orders(
    State(s): State<AppState>,
    Query(p): Query<ListParams>,
) -> Result<Json<PaginatedResponse<OrderRow>>> {
    let page = p.page.unwrap_or(1).max(1);
    let per_page = p.per_page.unwrap_or(20).min(100);
    let (orders, total) = service(&s).list(p.user_id, page, per_page).await?;
    Ok(Json(PaginatedResponse { data: orders, total, page }))
}

pub async fn get_order(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>> {
    Ok(Json(service(&s).get(id).await?))
}

/// Lookup by the `ORD-XXXXXXXX` number printed on receipts; a malformed
/// number is a validation error, not a miss.
pub async fn get_order_by_number(
    State(s): State<AppState>,
    Path(number): Path<String>,
) -> Result<Json<OrderResponse>> {
    let number = OrderNumber::parse(&number)?;
    Ok(Json(service(&s).get_by_number(&number).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
    /// Omit to keep the stored notes; send a blank string to clear them.
    pub notes: Option<String>,
}

pub async fn update_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>> {
    Ok(Json(service(&s).update_status(id, r.status, r.notes).await?))
}

#[derive(Debug, Deserialize)]
pub struct TrackingRequest {
    pub tracking_id: String,
    pub carrier_company: Option<String>,
    pub tracking_url: Option<String>,
}

pub async fn set_tracking(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(r): Json<TrackingRequest>,
) -> Result<Json<OrderResponse>> {
    let tracking = Tracking {
        tracking_id: r.tracking_id,
        carrier_company: r.carrier_company,
        tracking_url: r.tracking_url,
    };
    Ok(Json(service(&s).set_tracking(id, tracking).await?))
}

#[derive(Debug, Serialize)]
pub struct StatusInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub color: &'static str,
}

/// Fixed status vocabulary for admin status selectors.
pub async fn list_statuses() -> Json<Vec<StatusInfo>> {
    Json(
        OrderStatus::ALL
            .into_iter()
            .map(|status| StatusInfo {
                id: status.as_str(),
                name: status.display_name(),
                color: status.color(),
            })
            .collect(),
    )
}

#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub requeued: u64,
}

pub async fn retry_notifications(State(s): State<AppState>) -> Result<Json<RetryResponse>> {
    let requeued = NotificationOutbox::new(s.db.clone()).retry_failed().await?;
    Ok(Json(RetryResponse { requeued }))
}
