//! Order persistence service.
//!
//! Order creation is one transaction: stock is checked-and-decremented by
//! conditional UPDATEs, prices are snapshotted from the rows those
//! UPDATEs return, totals come from the pricing policy, and the cart is
//! cleared — all of it commits or none of it does. Status updates are
//! compare-and-swap on the current status, so concurrent admin writes
//! cannot silently overwrite each other or drop history entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::checkout::pricing::PricingPolicy;
use crate::checkout::CheckoutSelections;
use crate::domain::aggregates::{
    CustomerInfo, HistoryEntry, Order, OrderLine, OrderStatus, Tracking,
};
use crate::domain::events::{self, OrderEvent};
use crate::domain::value_objects::{Money, OrderNumber, Owner};
use crate::error::{AppError, Result};
use crate::service::{notification, page_offset};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub delivery_type: String,
    pub delivery_address: Option<String>,
    pub payment_method: String,
    pub currency: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub shipping_amount: Decimal,
    pub discount_amount: Decimal,
    pub total_amount: Decimal,
    pub status: String,
    pub notes: Option<String>,
    pub tracking_id: Option<String>,
    pub carrier_company: Option<String>,
    pub tracking_url: Option<String>,
    pub history: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: OrderRow,
    pub items: Vec<OrderItemRow>,
}

/// Interpretation of the `notes` field on a status update: an omitted
/// field keeps the stored value, a blank string clears it, anything else
/// replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesUpdate {
    Keep,
    Clear,
    Set(String),
}

impl NotesUpdate {
    pub fn from_field(notes: Option<String>) -> Self {
        match notes {
            None => NotesUpdate::Keep,
            Some(s) if s.trim().is_empty() => NotesUpdate::Clear,
            Some(s) => NotesUpdate::Set(s),
        }
    }

    fn as_set(&self) -> Option<&str> {
        match self {
            NotesUpdate::Set(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PendingLine {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
}

pub struct OrderService {
    db: PgPool,
    nats: Option<async_nats::Client>,
    currency: String,
    whatsapp_number: String,
    pricing: PricingPolicy,
}

impl OrderService {
    pub fn new(
        db: PgPool,
        nats: Option<async_nats::Client>,
        currency: impl Into<String>,
        whatsapp_number: impl Into<String>,
    ) -> Self {
        Self {
            db,
            nats,
            currency: currency.into(),
            whatsapp_number: whatsapp_number.into(),
            pricing: PricingPolicy::default(),
        }
    }

    /// Places an order from the owner's cart and the checkout selections.
    ///
    /// On failure the transaction rolls back and the cart is untouched, so
    /// the caller can retry without re-entering items. On success the cart
    /// is cleared, a WhatsApp notification is queued, and an
    /// `orders.created` event is published best-effort after commit.
    pub async fn create(&self, owner: &Owner, selections: &CheckoutSelections) -> Result<Order> {
        let mut tx = self.db.begin().await?;

        let cart_lines = sqlx::query_as::<_, PendingLine>(
            "SELECT product_id, variant_id, quantity FROM cart_items \
             WHERE owner_kind = $1 AND owner_id = $2 ORDER BY created_at",
        )
        .bind(owner.kind())
        .bind(owner.key())
        .fetch_all(&mut *tx)
        .await?;
        if cart_lines.is_empty() {
            return Err(AppError::EmptyCart);
        }

        // Reserve stock line by line. The conditional UPDATE both checks
        // and decrements, so two concurrent checkouts cannot oversell:
        // the loser sees zero rows and the whole order rolls back.
        let mut items = Vec::with_capacity(cart_lines.len());
        for line in &cart_lines {
            let hit: Option<(String, Decimal)> = sqlx::query_as(
                "UPDATE products \
                 SET stock_quantity = stock_quantity - $2, updated_at = NOW() \
                 WHERE id = $1 AND is_active AND stock_quantity >= $2 \
                 RETURNING name, price",
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .fetch_optional(&mut *tx)
            .await?;
            let (name, price) = match hit {
                Some(row) => row,
                None => {
                    let active: Option<(bool,)> =
                        sqlx::query_as("SELECT is_active FROM products WHERE id = $1")
                            .bind(line.product_id)
                            .fetch_optional(&mut *tx)
                            .await?;
                    return Err(match active {
                        Some((true,)) => AppError::InsufficientStock(line.product_id),
                        _ => AppError::ProductUnavailable(line.product_id),
                    });
                }
            };
            items.push(OrderLine {
                product_id: line.product_id,
                variant_id: line.variant_id,
                product_name: name,
                quantity: line.quantity.max(0) as u32,
                unit_price: Money::new(price, &self.currency),
            });
        }

        let subtotal = items.iter().fold(Money::zero(&self.currency), |acc, i| {
            acc.add(&i.line_total()).unwrap_or(acc)
        });
        let amounts =
            self.pricing
                .quote(subtotal, selections.delivery_type, selections.payment_method);

        let order_number = self.unique_order_number(&mut tx).await?;
        let order = Order::create(
            order_number,
            owner,
            CustomerInfo {
                name: selections.contact.name.clone(),
                email: selections.contact.email.clone(),
                phone: selections.contact.phone.clone(),
            },
            selections.delivery_type,
            selections.contact.address.clone(),
            selections.payment_method,
            items,
            amounts,
        )?;

        let history = serde_json::to_value(order.history())
            .map_err(|e| AppError::Internal(e.to_string()))?;
        sqlx::query(
            "INSERT INTO orders (id, order_number, user_id, customer_name, customer_email, \
             customer_phone, delivery_type, delivery_address, payment_method, currency, \
             subtotal, tax_amount, shipping_amount, discount_amount, total_amount, \
             status, history, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)",
        )
        .bind(order.id())
        .bind(order.order_number().as_str())
        .bind(order.user_id())
        .bind(&order.customer().name)
        .bind(&order.customer().email)
        .bind(&order.customer().phone)
        .bind(order.delivery_type().as_str())
        .bind(order.delivery_address())
        .bind(order.payment_method().as_str())
        .bind(&self.currency)
        .bind(order.amounts().subtotal.amount())
        .bind(order.amounts().tax_amount.amount())
        .bind(order.amounts().shipping_amount.amount())
        .bind(order.amounts().discount_amount.amount())
        .bind(order.amounts().total_amount.amount())
        .bind(order.status().as_str())
        .bind(history)
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await?;

        for item in order.items() {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, variant_id, product_name, \
                 quantity, unit_price, line_total) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(Uuid::now_v7())
            .bind(order.id())
            .bind(item.product_id)
            .bind(item.variant_id)
            .bind(&item.product_name)
            .bind(item.quantity as i32)
            .bind(item.unit_price.amount())
            .bind(item.line_total().amount())
            .execute(&mut *tx)
            .await?;
        }

        // Queue the merchant notification in the same transaction; the
        // outbox dispatcher picks it up after commit.
        sqlx::query(
            "INSERT INTO notifications (id, order_id, channel, recipient, payload) \
             VALUES ($1, $2, 'whatsapp', $3, $4)",
        )
        .bind(Uuid::now_v7())
        .bind(order.id())
        .bind(&self.whatsapp_number)
        .bind(notification::order_summary_text(&order))
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM cart_items WHERE owner_kind = $1 AND owner_id = $2")
            .bind(owner.kind())
            .bind(owner.key())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        events::publish(
            &self.nats,
            &OrderEvent::Created {
                order_id: order.id(),
                order_number: order.order_number().to_string(),
                total_amount: order.amounts().total_amount.amount(),
                currency: self.currency.clone(),
            },
        )
        .await;

        tracing::info!(
            order_number = %order.order_number(),
            total = %order.amounts().total_amount,
            "order created"
        );
        Ok(order)
    }

    /// Applies an admin status transition. The transition table is checked
    /// against the loaded status, and the UPDATE is guarded by that same
    /// status so a concurrent transition surfaces as a conflict instead of
    /// a lost write.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        to: OrderStatus,
        notes: Option<String>,
    ) -> Result<OrderWithItems> {
        let current: Option<(String,)> =
            sqlx::query_as("SELECT status FROM orders WHERE id = $1")
                .bind(order_id)
                .fetch_optional(&self.db)
                .await?;
        let from: OrderStatus = current.ok_or(AppError::NotFound("order"))?.0.parse()?;
        if !from.can_transition_to(to) {
            return Err(AppError::InvalidStatusTransition { from, to });
        }

        let notes = NotesUpdate::from_field(notes);
        let entry = HistoryEntry::new(to, notes.as_set().map(str::to_string));
        let entry_json =
            serde_json::to_value(&entry).map_err(|e| AppError::Internal(e.to_string()))?;
        let updated = sqlx::query(
            "UPDATE orders \
             SET status = $2, history = history || $3, \
                 notes = CASE WHEN $6 THEN NULL \
                              WHEN $4::text IS NOT NULL THEN $4 \
                              ELSE notes END, \
                 updated_at = NOW() \
             WHERE id = $1 AND status = $5",
        )
        .bind(order_id)
        .bind(to.as_str())
        .bind(entry_json)
        .bind(notes.as_set())
        .bind(from.as_str())
        .bind(notes == NotesUpdate::Clear)
        .execute(&self.db)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(AppError::Conflict);
        }

        events::publish(
            &self.nats,
            &OrderEvent::StatusChanged { order_id, from, to },
        )
        .await;
        tracing::info!(%order_id, from = %from, to = %to, "order status changed");
        self.get(order_id).await
    }

    /// Sets shipping-tracking fields independently of status.
    pub async fn set_tracking(
        &self,
        order_id: Uuid,
        tracking: Tracking,
    ) -> Result<OrderWithItems> {
        let updated = sqlx::query(
            "UPDATE orders \
             SET tracking_id = $2, carrier_company = $3, tracking_url = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(order_id)
        .bind(&tracking.tracking_id)
        .bind(&tracking.carrier_company)
        .bind(&tracking.tracking_url)
        .execute(&self.db)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(AppError::NotFound("order"));
        }
        self.get(order_id).await
    }

    pub async fn get(&self, order_id: Uuid) -> Result<OrderWithItems> {
        let order = sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotFound("order"))?;
        self.with_items(order).await
    }

    /// Customer-facing lookup by the public order number.
    pub async fn get_by_number(&self, order_number: &OrderNumber) -> Result<OrderWithItems> {
        let order =
            sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE order_number = $1")
                .bind(order_number.as_str())
                .fetch_optional(&self.db)
                .await?
                .ok_or(AppError::NotFound("order"))?;
        self.with_items(order).await
    }

    async fn with_items(&self, order: OrderRow) -> Result<OrderWithItems> {
        let items = sqlx::query_as::<_, OrderItemRow>(
            "SELECT * FROM order_items WHERE order_id = $1",
        )
        .bind(order.id)
        .fetch_all(&self.db)
        .await?;
        Ok(OrderWithItems { order, items })
    }

    pub async fn list(
        &self,
        user_id: Option<Uuid>,
        page: u32,
        per_page: u32,
    ) -> Result<(Vec<OrderRow>, i64)> {
        let offset = page_offset(page, per_page);
        let (orders, total) = match user_id {
            Some(uid) => {
                let orders = sqlx::query_as::<_, OrderRow>(
                    "SELECT * FROM orders WHERE user_id = $1 \
                     ORDER BY created_at DESC LIMIT $2 OFFSET $3",
                )
                .bind(uid)
                .bind(per_page as i64)
                .bind(offset)
                .fetch_all(&self.db)
                .await?;
                let total: (i64,) =
                    sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
                        .bind(uid)
                        .fetch_one(&self.db)
                        .await?;
                (orders, total.0)
            }
            None => {
                let orders = sqlx::query_as::<_, OrderRow>(
                    "SELECT * FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2",
                )
                .bind(per_page as i64)
                .bind(offset)
                .fetch_all(&self.db)
                .await?;
                let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
                    .fetch_one(&self.db)
                    .await?;
                (orders, total.0)
            }
        };
        Ok((orders, total))
    }

    async fn unique_order_number(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ) -> Result<OrderNumber> {
        loop {
            let candidate = OrderNumber::generate();
            let taken: (bool,) =
                sqlx::query_as("SELECT EXISTS(SELECT 1 FROM orders WHERE order_number = $1)")
                    .bind(candidate.as_str())
                    .fetch_one(&mut **tx)
                    .await?;
            if !taken.0 {
                return Ok(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_notes_distinguish_keep_clear_set() {
        assert_eq!(NotesUpdate::from_field(None), NotesUpdate::Keep);
        assert_eq!(NotesUpdate::from_field(Some(String::new())), NotesUpdate::Clear);
        assert_eq!(NotesUpdate::from_field(Some("  ".into())), NotesUpdate::Clear);
        assert_eq!(
            NotesUpdate::from_field(Some("left with neighbor".into())),
            NotesUpdate::Set("left with neighbor".into())
        );
    }

    #[test]
    fn cleared_notes_leave_no_history_note() {
        assert_eq!(NotesUpdate::Clear.as_set(), None);
        assert_eq!(NotesUpdate::Keep.as_set(), None);
        assert_eq!(NotesUpdate::Set("ok".into()).as_set(), Some("ok"));
    }
}
