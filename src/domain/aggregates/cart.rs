//! Cart Aggregate
//!
//! In-memory view of an owner's cart as loaded from the `cart_items`
//! table. The merge rules live here; single-line mutations (quantity
//! updates, removals) are single SQL statements in the service layer.

use uuid::Uuid;

use crate::domain::value_objects::{Money, Owner, Quantity};

#[derive(Clone, Debug)]
pub struct Cart {
    owner: Owner,
    items: Vec<CartItem>,
    currency: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CartItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub name: String,
    pub quantity: Quantity,
    pub unit_price: Money,
}

impl CartItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity.value())
    }
}

impl Cart {
    pub fn new(owner: Owner, currency: &str) -> Self {
        Self { owner, items: vec![], currency: currency.to_string() }
    }

    pub fn owner(&self) -> &Owner { &self.owner }
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn line_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }

    pub fn total_units(&self) -> u32 {
        self.items.iter().map(|i| i.quantity.value()).sum()
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().fold(Money::zero(&self.currency), |acc, i| {
            acc.add(&i.line_total()).unwrap_or(acc)
        })
    }

    /// At most one line exists per (product, variant); adding the same
    /// pair again increments the quantity instead of duplicating. Zero
    /// quantities are ignored, so no line ever holds quantity <= 0.
    pub fn add_item(&mut self, item: CartItem) {
        if item.quantity.is_zero() {
            return;
        }
        match self.find_mut(item.product_id, item.variant_id) {
            Some(existing) => existing.quantity = existing.quantity.add(item.quantity.value()),
            None => self.items.push(item),
        }
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Login-sync semantics: the server cart is discarded and replaced by
    /// the device-local lines. Duplicate local lines for the same
    /// (product, variant) collapse into one with summed quantity.
    pub fn replace_from_local(&mut self, local: Vec<CartItem>) {
        self.clear();
        for item in local {
            self.add_item(item);
        }
    }

    fn find_mut(&mut self, product_id: Uuid, variant_id: Option<Uuid>) -> Option<&mut CartItem> {
        self.items
            .iter_mut()
            .find(|i| i.product_id == product_id && i.variant_id == variant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn item(product_id: Uuid, qty: u32, price: i64) -> CartItem {
        CartItem {
            product_id,
            variant_id: None,
            name: "Widget".into(),
            quantity: Quantity::new(qty),
            unit_price: Money::new(Decimal::new(price, 0), "MXN"),
        }
    }

    #[test]
    fn add_merges_same_product() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::new(Owner::Session("s1".into()), "MXN");
        cart.add_item(item(p1, 2, 10));
        cart.add_item(item(p1, 3, 10));
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 5);
        assert_eq!(cart.subtotal().amount(), Decimal::new(50, 0));
    }

    #[test]
    fn variants_are_distinct_lines() {
        let p1 = Uuid::new_v4();
        let v1 = Uuid::new_v4();
        let mut cart = Cart::new(Owner::Session("s1".into()), "MXN");
        cart.add_item(item(p1, 1, 10));
        cart.add_item(CartItem { variant_id: Some(v1), ..item(p1, 1, 12) });
        assert_eq!(cart.line_count(), 2);
    }

    #[test]
    fn zero_quantity_lines_are_never_held() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::new(Owner::Session("s1".into()), "MXN");
        cart.add_item(item(p1, 0, 10));
        assert!(cart.is_empty());
        cart.add_item(item(p1, 2, 10));
        cart.add_item(item(p1, 0, 10));
        assert!(cart.items().iter().all(|i| !i.quantity.is_zero()));
        assert_eq!(cart.items()[0].quantity.value(), 2);
    }

    #[test]
    fn sync_replaces_server_lines() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::new(Owner::User(Uuid::new_v4()), "MXN");
        cart.add_item(item(p1, 3, 10)); // pre-existing server cart
        cart.replace_from_local(vec![item(p1, 1, 10)]);
        assert_eq!(cart.line_count(), 1);
        // The server quantity is discarded, not merged.
        assert_eq!(cart.items()[0].quantity.value(), 1);
    }

    #[test]
    fn sync_collapses_duplicate_local_lines() {
        let p1 = Uuid::new_v4();
        let mut cart = Cart::new(Owner::User(Uuid::new_v4()), "MXN");
        cart.replace_from_local(vec![item(p1, 1, 10), item(p1, 2, 10)]);
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.items()[0].quantity.value(), 3);
    }
}
