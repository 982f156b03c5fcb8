//! Application services: persistence-backed operations over the domain
//! aggregates, constructed per request with an explicit [`Owner`] where
//! one applies.
//!
//! [`Owner`]: crate::domain::value_objects::Owner

pub mod cart;
pub mod notification;
pub mod order;

pub use cart::{CartService, LocalCartItem};
pub use notification::NotificationOutbox;
pub use order::OrderService;

/// OFFSET for 1-based pagination; widens before multiplying so large page
/// numbers cannot overflow.
pub(crate) fn page_offset(page: u32, per_page: u32) -> i64 {
    (page as i64 - 1).max(0) * per_page as i64
}

#[cfg(test)]
mod tests {
    use super::page_offset;

    #[test]
    fn page_offset_is_overflow_safe() {
        assert_eq!(page_offset(1, 20), 0);
        assert_eq!(page_offset(3, 20), 40);
        assert_eq!(page_offset(0, 20), 0);
        assert_eq!(page_offset(u32::MAX, 100), (u32::MAX as i64 - 1) * 100);
    }
}
