//! Order Aggregate
//!
//! The core of an order (line-item snapshot, amounts, customer fields,
//! created_at) is fixed at creation. Only the status envelope — status,
//! history, notes, tracking fields, updated_at — changes afterwards, and
//! only through [`Order::apply_transition`] / [`Order::set_tracking`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::value_objects::{Money, OrderNumber, Owner};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Operator-facing label for the status vocabulary endpoint.
    pub fn display_name(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Refunded => "Refunded",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "#f59e0b",
            OrderStatus::Confirmed => "#3b82f6",
            OrderStatus::Processing => "#8b5cf6",
            OrderStatus::Shipped => "#06b6d4",
            OrderStatus::Delivered => "#22c55e",
            OrderStatus::Cancelled => "#ef4444",
            OrderStatus::Refunded => "#6b7280",
        }
    }

    /// Allowed transitions. Cancelled and refunded are terminal.
    pub fn can_transition_to(&self, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, to),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Processing)
                | (Confirmed, Cancelled)
                | (Processing, Shipped)
                | (Processing, Cancelled)
                | (Shipped, Delivered)
                | (Delivered, Refunded)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    Pickup,
    Delivery,
}

impl DeliveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::Pickup => "pickup",
            DeliveryType::Delivery => "delivery",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
        }
    }
}

/// One append-only history record; stored as a jsonb array element.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub status: OrderStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(status: OrderStatus, notes: Option<String>) -> Self {
        Self { status, notes, created_at: Utc::now() }
    }
}

/// Price/name snapshot taken from the catalog at creation time. Later
/// catalog edits never touch placed orders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

#[derive(Clone, Debug)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderAmounts {
    pub subtotal: Money,
    pub tax_amount: Money,
    pub shipping_amount: Money,
    pub discount_amount: Money,
    pub total_amount: Money,
}

impl OrderAmounts {
    /// Checks `total == subtotal + tax + shipping - discount`.
    pub fn is_consistent(&self) -> bool {
        self.subtotal
            .add(&self.tax_amount)
            .and_then(|s| s.add(&self.shipping_amount))
            .and_then(|s| s.subtract(&self.discount_amount))
            .map(|expected| expected == self.total_amount)
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug)]
pub struct Order {
    id: Uuid,
    order_number: OrderNumber,
    user_id: Option<Uuid>,
    customer: CustomerInfo,
    delivery_type: DeliveryType,
    delivery_address: Option<String>,
    payment_method: PaymentMethod,
    items: Vec<OrderLine>,
    amounts: OrderAmounts,
    status: OrderStatus,
    notes: Option<String>,
    tracking: Option<Tracking>,
    history: Vec<HistoryEntry>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tracking {
    pub tracking_id: String,
    pub carrier_company: Option<String>,
    pub tracking_url: Option<String>,
}

impl Order {
    /// Creates a pending order with one creation history entry. Rejects
    /// empty item lists and amounts that break the total invariant.
    pub fn create(
        order_number: OrderNumber,
        owner: &Owner,
        customer: CustomerInfo,
        delivery_type: DeliveryType,
        delivery_address: Option<String>,
        payment_method: PaymentMethod,
        items: Vec<OrderLine>,
        amounts: OrderAmounts,
    ) -> Result<Self, OrderError> {
        if items.is_empty() {
            return Err(OrderError::NoItems);
        }
        if !amounts.is_consistent() {
            return Err(OrderError::InconsistentAmounts);
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(),
            order_number,
            user_id: owner.user_id(),
            customer,
            delivery_type,
            delivery_address,
            payment_method,
            items,
            amounts,
            status: OrderStatus::Pending,
            notes: None,
            tracking: None,
            history: vec![HistoryEntry::new(OrderStatus::Pending, Some("order created".into()))],
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &OrderNumber { &self.order_number }
    pub fn user_id(&self) -> Option<Uuid> { self.user_id }
    pub fn customer(&self) -> &CustomerInfo { &self.customer }
    pub fn delivery_type(&self) -> DeliveryType { self.delivery_type }
    pub fn delivery_address(&self) -> Option<&str> { self.delivery_address.as_deref() }
    pub fn payment_method(&self) -> PaymentMethod { self.payment_method }
    pub fn items(&self) -> &[OrderLine] { &self.items }
    pub fn amounts(&self) -> &OrderAmounts { &self.amounts }
    pub fn status(&self) -> OrderStatus { self.status }
    pub fn notes(&self) -> Option<&str> { self.notes.as_deref() }
    pub fn tracking(&self) -> Option<&Tracking> { self.tracking.as_ref() }
    pub fn history(&self) -> &[HistoryEntry] { &self.history }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Moves to `to` if the transition table allows it, appending exactly
    /// one history entry.
    pub fn apply_transition(
        &mut self,
        to: OrderStatus,
        notes: Option<String>,
    ) -> Result<&HistoryEntry, OrderError> {
        if !self.status.can_transition_to(to) {
            return Err(OrderError::InvalidTransition { from: self.status, to });
        }
        self.status = to;
        self.history.push(HistoryEntry::new(to, notes));
        self.updated_at = Utc::now();
        Ok(self.history.last().expect("just pushed"))
    }

    /// Tracking fields are settable independently of status.
    pub fn set_tracking(&mut self, tracking: Tracking) {
        self.tracking = Some(tracking);
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OrderError {
    #[error("order has no items")]
    NoItems,
    #[error("order amounts do not satisfy the total invariant")]
    InconsistentAmounts,
    #[error("unknown order status: {0}")]
    UnknownStatus(String),
    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn money(v: i64) -> Money {
        Money::new(Decimal::new(v, 0), "MXN")
    }

    fn amounts(subtotal: i64, shipping: i64, discount: i64, total: i64) -> OrderAmounts {
        OrderAmounts {
            subtotal: money(subtotal),
            tax_amount: money(0),
            shipping_amount: money(shipping),
            discount_amount: money(discount),
            total_amount: money(total),
        }
    }

    fn sample_order() -> Order {
        Order::create(
            OrderNumber::generate(),
            &Owner::Session("s1".into()),
            CustomerInfo {
                name: "Ana".into(),
                email: "ana@example.com".into(),
                phone: "5512345678".into(),
            },
            DeliveryType::Pickup,
            None,
            PaymentMethod::Cash,
            vec![OrderLine {
                product_id: Uuid::new_v4(),
                variant_id: None,
                product_name: "Widget".into(),
                quantity: 2,
                unit_price: money(100),
            }],
            amounts(200, 0, 0, 200),
        )
        .unwrap()
    }

    #[test]
    fn create_rejects_broken_total() {
        let err = Order::create(
            OrderNumber::generate(),
            &Owner::Session("s1".into()),
            CustomerInfo { name: "Ana".into(), email: "a@b.c".into(), phone: "5512345678".into() },
            DeliveryType::Pickup,
            None,
            PaymentMethod::Cash,
            vec![OrderLine {
                product_id: Uuid::new_v4(),
                variant_id: None,
                product_name: "Widget".into(),
                quantity: 1,
                unit_price: money(100),
            }],
            amounts(200, 0, 0, 150),
        );
        assert!(matches!(err, Err(OrderError::InconsistentAmounts)));
    }

    #[test]
    fn create_rejects_empty_cart() {
        let err = Order::create(
            OrderNumber::generate(),
            &Owner::Session("s1".into()),
            CustomerInfo { name: "Ana".into(), email: "a@b.c".into(), phone: "5512345678".into() },
            DeliveryType::Pickup,
            None,
            PaymentMethod::Cash,
            vec![],
            amounts(0, 0, 0, 0),
        );
        assert!(matches!(err, Err(OrderError::NoItems)));
    }

    #[test]
    fn history_grows_by_one_per_transition() {
        let mut order = sample_order();
        assert_eq!(order.history().len(), 1);
        order.apply_transition(OrderStatus::Confirmed, None).unwrap();
        assert_eq!(order.history().len(), 2);
        assert_eq!(order.history().last().unwrap().status, OrderStatus::Confirmed);
        order.apply_transition(OrderStatus::Processing, Some("packing".into())).unwrap();
        assert_eq!(order.history().len(), 3);
    }

    #[test]
    fn disallowed_transition_is_rejected_and_changes_nothing() {
        let mut order = sample_order();
        let before = order.history().len();
        let err = order.apply_transition(OrderStatus::Delivered, None);
        assert!(matches!(err, Err(OrderError::InvalidTransition { .. })));
        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.history().len(), before);
    }

    #[test]
    fn terminal_states_allow_no_exit() {
        for terminal in [OrderStatus::Cancelled, OrderStatus::Refunded] {
            for to in OrderStatus::ALL {
                assert!(!terminal.can_transition_to(to));
            }
        }
    }

    #[test]
    fn core_fields_survive_transitions() {
        let mut order = sample_order();
        let items = order.items().to_vec();
        let total = order.amounts().total_amount.clone();
        let created = order.created_at();
        order.apply_transition(OrderStatus::Confirmed, None).unwrap();
        order.set_tracking(Tracking {
            tracking_id: "TRK1".into(),
            carrier_company: Some("Estafeta".into()),
            tracking_url: None,
        });
        assert_eq!(order.items(), items.as_slice());
        assert_eq!(order.amounts().total_amount, total);
        assert_eq!(order.created_at(), created);
        assert_eq!(order.tracking().unwrap().tracking_id, "TRK1");
        assert!(order.notes().is_none());
    }

    #[test]
    fn status_string_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("unknown".parse::<OrderStatus>().is_err());
    }
}
