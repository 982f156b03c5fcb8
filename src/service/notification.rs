//! Outbound notification outbox.
//!
//! Order creation queues a record; a dispatch pass turns queued records
//! into sent or failed ones. The WhatsApp channel is a deep link with no
//! delivery confirmation, so a built link counts as dispatched.

use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::Order;
use crate::error::Result;

#[derive(Debug, sqlx::FromRow)]
struct QueuedNotification {
    id: Uuid,
    channel: String,
    recipient: String,
    payload: String,
}

pub struct NotificationOutbox {
    db: PgPool,
}

impl NotificationOutbox {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Dispatches queued notifications, oldest first. Returns how many
    /// were handled (sent or failed).
    pub async fn dispatch_pending(&self) -> Result<usize> {
        let queued = sqlx::query_as::<_, QueuedNotification>(
            "SELECT id, channel, recipient, payload FROM notifications \
             WHERE status = 'queued' ORDER BY created_at LIMIT 50",
        )
        .fetch_all(&self.db)
        .await?;

        let count = queued.len();
        for notification in queued {
            match notification.channel.as_str() {
                "whatsapp" if !notification.recipient.trim().is_empty() => {
                    let link = whatsapp_link(&notification.recipient, &notification.payload);
                    tracing::info!(id = %notification.id, %link, "whatsapp notification dispatched");
                    self.mark(notification.id, "sent", None).await?;
                }
                "whatsapp" => {
                    self.mark(notification.id, "failed", Some("recipient number not configured"))
                        .await?;
                }
                other => {
                    tracing::warn!(id = %notification.id, channel = other, "no transport for channel");
                    self.mark(notification.id, "failed", Some("no transport for channel"))
                        .await?;
                }
            }
        }
        Ok(count)
    }

    /// Re-queues failed notifications so the next dispatch pass retries
    /// them. Returns how many were re-queued.
    pub async fn retry_failed(&self) -> Result<u64> {
        let requeued = sqlx::query(
            "UPDATE notifications SET status = 'queued', last_error = NULL, updated_at = NOW() \
             WHERE status = 'failed'",
        )
        .execute(&self.db)
        .await?
        .rows_affected();
        Ok(requeued)
    }

    async fn mark(&self, id: Uuid, status: &str, error: Option<&str>) -> Result<()> {
        sqlx::query(
            "UPDATE notifications SET status = $2, last_error = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .bind(error)
        .execute(&self.db)
        .await?;
        Ok(())
    }
}

/// `https://wa.me/<number>?text=<urlencoded summary>`
pub fn whatsapp_link(number: &str, text: &str) -> String {
    format!("https://wa.me/{}?text={}", number, urlencoding::encode(text))
}

/// Merchant-facing order summary used as the notification payload.
pub fn order_summary_text(order: &Order) -> String {
    let mut lines = vec![format!("New order {}", order.order_number())];
    for item in order.items() {
        lines.push(format!(
            "{} x {} - {}",
            item.quantity,
            item.product_name,
            item.line_total()
        ));
    }
    lines.push(format!("Delivery: {}", order.delivery_type().as_str()));
    if let Some(address) = order.delivery_address() {
        lines.push(format!("Address: {address}"));
    }
    lines.push(format!("Payment: {}", order.payment_method().as_str()));
    lines.push(format!("Total: {}", order.amounts().total_amount));
    lines.push(format!("Customer: {} ({})", order.customer().name, order.customer().phone));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkout::pricing::PricingPolicy;
    use crate::domain::aggregates::{CustomerInfo, DeliveryType, OrderLine, PaymentMethod};
    use crate::domain::value_objects::{Money, OrderNumber, Owner};
    use rust_decimal::Decimal;

    #[test]
    fn link_percent_encodes_the_text() {
        let link = whatsapp_link("5215512345678", "New order ORD-1\nTotal: $200");
        assert!(link.starts_with("https://wa.me/5215512345678?text="));
        assert!(link.contains("New%20order"));
        assert!(!link.contains(' '));
        assert!(!link.contains('\n'));
    }

    #[test]
    fn summary_lists_items_and_total() {
        let subtotal = Money::new(Decimal::new(200, 0), "MXN");
        let amounts =
            PricingPolicy::default().quote(subtotal, DeliveryType::Pickup, PaymentMethod::Cash);
        let order = Order::create(
            OrderNumber::parse("ORD-00000042").unwrap(),
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
                product_id: uuid::Uuid::new_v4(),
                variant_id: None,
                product_name: "Widget".into(),
                quantity: 2,
                unit_price: Money::new(Decimal::new(100, 0), "MXN"),
            }],
            amounts,
        )
        .unwrap();

        let text = order_summary_text(&order);
        assert!(text.contains("ORD-00000042"));
        assert!(text.contains("2 x Widget"));
        assert!(text.contains("Total: $200 MXN"));
        assert!(text.contains("Payment: cash"));
    }
}
