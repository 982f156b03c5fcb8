//! Checkout submission. The request carries selections only — delivery
//! type, payment method, contact fields. Amounts are recomputed
//! server-side; anything the client says about prices is ignored.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use validator::{Validate, ValidationError};

use crate::checkout::{phone_is_valid, CheckoutFlow, ContactInfo, UserType};
use crate::domain::aggregates::{DeliveryType, PaymentMethod};
use crate::domain::value_objects::Owner;
use crate::error::Result;
use crate::http::orders::OrderResponse;
use crate::http::AppState;
use crate::service::OrderService;

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub customer_name: String,
    #[validate(email)]
    pub customer_email: String,
    #[validate(custom = "validate_phone")]
    pub customer_phone: String,
    pub delivery_type: DeliveryType,
    pub delivery_address: Option<String>,
    pub payment_method: PaymentMethod,
}

fn validate_phone(phone: &str) -> std::result::Result<(), ValidationError> {
    if phone_is_valid(phone) {
        Ok(())
    } else {
        Err(ValidationError::new("phone"))
    }
}

pub async fn submit_checkout(
    State(s): State<AppState>,
    owner: Owner,
    Json(r): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>)> {
    r.validate()?;

    // Drive the submission through the step machine so the gating rules
    // (including the delivery/address dependency) hold server-side too.
    let mut flow = if owner.is_authenticated() {
        CheckoutFlow::for_account()
    } else {
        let mut flow = CheckoutFlow::new();
        flow.select_user_type(UserType::Guest);
        flow.advance()?;
        flow
    };
    flow.select_delivery_type(r.delivery_type);
    flow.advance()?;
    flow.set_contact(ContactInfo {
        name: r.customer_name,
        email: r.customer_email,
        phone: r.customer_phone,
        address: r.delivery_address,
    });
    flow.advance()?;
    flow.select_payment_method(r.payment_method);
    flow.advance()?;
    let selections = flow.selections()?;

    let orders = OrderService::new(
        s.db.clone(),
        s.nats.clone(),
        s.config.currency.clone(),
        s.config.whatsapp_number.clone(),
    );
    let order = orders.create(&owner, &selections).await?;
    flow.complete()?;

    let created = orders.get(order.id()).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
