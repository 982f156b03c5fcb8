//! Domain aggregates

pub mod cart;
pub mod order;

pub use cart::{Cart, CartItem};
pub use order::{
    CustomerInfo, DeliveryType, HistoryEntry, Order, OrderAmounts, OrderError, OrderLine,
    OrderStatus, PaymentMethod, Tracking,
};
