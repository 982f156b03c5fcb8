//! Domain events published as JSON to the message bus when one is
//! configured. Delivery is best-effort; the order pipeline never blocks
//! on the bus.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::OrderStatus;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created {
        order_id: Uuid,
        order_number: String,
        total_amount: Decimal,
        currency: String,
    },
    StatusChanged {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
}

impl OrderEvent {
    pub fn subject(&self) -> &'static str {
        match self {
            OrderEvent::Created { .. } => "orders.created",
            OrderEvent::StatusChanged { .. } => "orders.status_changed",
        }
    }
}

/// Serializes and publishes an event, logging (not propagating) failures.
pub async fn publish(nats: &Option<async_nats::Client>, event: &OrderEvent) {
    let Some(client) = nats else { return };
    let payload = match serde_json::to_vec(event) {
        Ok(p) => p,
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize order event");
            return;
        }
    };
    if let Err(e) = client.publish(event.subject().to_string(), payload.into()).await {
        tracing::warn!(error = %e, subject = event.subject(), "failed to publish order event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_route_to_their_subject() {
        let created = OrderEvent::Created {
            order_id: Uuid::new_v4(),
            order_number: "ORD-00000001".into(),
            total_amount: Decimal::new(310, 0),
            currency: "MXN".into(),
        };
        assert_eq!(created.subject(), "orders.created");
        let changed = OrderEvent::StatusChanged {
            order_id: Uuid::new_v4(),
            from: OrderStatus::Pending,
            to: OrderStatus::Confirmed,
        };
        assert_eq!(changed.subject(), "orders.status_changed");
    }

    #[test]
    fn created_event_serializes_with_tag() {
        let event = OrderEvent::Created {
            order_id: Uuid::new_v4(),
            order_number: "ORD-00000001".into(),
            total_amount: Decimal::new(200, 0),
            currency: "MXN".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "created");
        assert_eq!(json["order_number"], "ORD-00000001");
    }
}
