//! Cart endpoints. The owner comes from the request headers; all
//! operations act on that owner's cart only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::Cart;
use crate::domain::value_objects::Owner;
use crate::error::Result;
use crate::http::AppState;
use crate::service::{CartService, LocalCartItem};

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<CartLineResponse>,
    pub total_units: u32,
    pub subtotal: Decimal,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct CartLineResponse {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

impl CartResponse {
    fn from_cart(cart: &Cart) -> Self {
        Self {
            items: cart
                .items()
                .iter()
                .map(|i| CartLineResponse {
                    product_id: i.product_id,
                    variant_id: i.variant_id,
                    name: i.name.clone(),
                    quantity: i.quantity.value(),
                    unit_price: i.unit_price.amount(),
                    line_total: i.line_total().amount(),
                })
                .collect(),
            total_units: cart.total_units(),
            subtotal: cart.subtotal().amount(),
            currency: cart.subtotal().currency().to_string(),
        }
    }
}

fn service(s: &AppState, owner: Owner) -> CartService {
    CartService::new(s.db.clone(), owner, s.config.currency.clone())
}

pub async fn get_cart(State(s): State<AppState>, owner: Owner) -> Result<Json<CartResponse>> {
    let cart = service(&s, owner).get().await?;
    Ok(Json(CartResponse::from_cart(&cart)))
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

pub async fn add_to_cart(
    State(s): State<AppState>,
    owner: Owner,
    Json(r): Json<AddToCartRequest>,
) -> Result<(StatusCode, Json<CartResponse>)> {
    let cart = service(&s, owner)
        .add(r.product_id, r.variant_id, r.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(CartResponse::from_cart(&cart))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantityRequest {
    pub variant_id: Option<Uuid>,
    /// Zero or negative removes the line.
    pub quantity: i32,
}

pub async fn update_quantity(
    State(s): State<AppState>,
    owner: Owner,
    Path(product_id): Path<Uuid>,
    Json(r): Json<UpdateQuantityRequest>,
) -> Result<Json<CartResponse>> {
    let cart = service(&s, owner)
        .update_quantity(product_id, r.variant_id, r.quantity)
        .await?;
    Ok(Json(CartResponse::from_cart(&cart)))
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub variant_id: Option<Uuid>,
}

pub async fn remove_item(
    State(s): State<AppState>,
    owner: Owner,
    Path(product_id): Path<Uuid>,
    body: Option<Json<RemoveItemRequest>>,
) -> Result<Json<CartResponse>> {
    let variant_id = body.and_then(|Json(r)| r.variant_id);
    let cart = service(&s, owner).remove(product_id, variant_id).await?;
    Ok(Json(CartResponse::from_cart(&cart)))
}

pub async fn clear_cart(State(s): State<AppState>, owner: Owner) -> Result<StatusCode> {
    service(&s, owner).clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SyncCartRequest {
    /// One key per sync attempt; retries with the same key are no-ops.
    pub idempotency_key: Uuid,
    pub items: Vec<LocalCartItem>,
}

pub async fn sync_cart(
    State(s): State<AppState>,
    owner: Owner,
    Json(r): Json<SyncCartRequest>,
) -> Result<Json<CartResponse>> {
    let cart = service(&s, owner)
        .sync_on_login(r.idempotency_key, r.items)
        .await?;
    Ok(Json(CartResponse::from_cart(&cart)))
}
