//! Cart persistence service.
//!
//! Constructed per request with the owning [`Owner`]; every statement is
//! scoped to that owner. Mutations that must be atomic are single SQL
//! statements (the add upsert, the keyed delete), so a retried request
//! cannot double-apply or half-apply.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartItem};
use crate::domain::value_objects::{Money, Owner, Quantity};
use crate::error::{AppError, Result};

/// A cart line as held by the client device before login.
#[derive(Clone, Debug, Deserialize)]
pub struct LocalCartItem {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: u32,
}

#[derive(Debug, sqlx::FromRow)]
struct CartRow {
    product_id: Uuid,
    variant_id: Option<Uuid>,
    quantity: i32,
    name: String,
    price: Decimal,
}

pub struct CartService {
    db: PgPool,
    owner: Owner,
    currency: String,
}

impl CartService {
    pub fn new(db: PgPool, owner: Owner, currency: impl Into<String>) -> Self {
        Self { db, owner, currency: currency.into() }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    /// Loads the owner's cart joined with current catalog names/prices.
    pub async fn get(&self) -> Result<Cart> {
        let rows = sqlx::query_as::<_, CartRow>(
            "SELECT ci.product_id, ci.variant_id, ci.quantity, p.name, p.price \
             FROM cart_items ci JOIN products p ON p.id = ci.product_id \
             WHERE ci.owner_kind = $1 AND ci.owner_id = $2 \
             ORDER BY ci.created_at",
        )
        .bind(self.owner.kind())
        .bind(self.owner.key())
        .fetch_all(&self.db)
        .await?;

        let mut cart = Cart::new(self.owner.clone(), &self.currency);
        for row in rows {
            cart.add_item(CartItem {
                product_id: row.product_id,
                variant_id: row.variant_id,
                name: row.name,
                quantity: Quantity::new(row.quantity.max(0) as u32),
                unit_price: Money::new(row.price, &self.currency),
            });
        }
        Ok(cart)
    }

    /// Adds `quantity` units, merging into an existing line for the same
    /// (product, variant) via a single upsert. Rejects inactive products
    /// and quantities beyond current stock.
    pub async fn add(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: u32,
    ) -> Result<Cart> {
        if quantity == 0 {
            return Err(AppError::Validation("quantity must be positive".into()));
        }
        let product: Option<(bool, i32)> = sqlx::query_as(
            "SELECT is_active, stock_quantity FROM products WHERE id = $1",
        )
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?;
        let (is_active, stock) = product.ok_or(AppError::NotFound("product"))?;
        if !is_active {
            return Err(AppError::ProductUnavailable(product_id));
        }
        // Stock must cover what the owner already holds in the cart plus
        // this increment, not just the increment; the order transaction
        // remains the authoritative check.
        let in_cart: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(quantity), 0) FROM cart_items \
             WHERE owner_kind = $1 AND owner_id = $2 AND product_id = $3",
        )
        .bind(self.owner.kind())
        .bind(self.owner.key())
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;
        if exceeds_stock(in_cart.0, quantity, stock) {
            return Err(AppError::InsufficientStock(product_id));
        }

        sqlx::query(
            "INSERT INTO cart_items (id, owner_kind, owner_id, product_id, variant_id, quantity) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (owner_kind, owner_id, product_id, \
                          COALESCE(variant_id, '00000000-0000-0000-0000-000000000000')) \
             DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity, updated_at = NOW()",
        )
        .bind(Uuid::now_v7())
        .bind(self.owner.kind())
        .bind(self.owner.key())
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity as i32)
        .execute(&self.db)
        .await?;

        self.get().await
    }

    /// Sets the line quantity; zero or less removes the line.
    pub async fn update_quantity(
        &self,
        product_id: Uuid,
        variant_id: Option<Uuid>,
        quantity: i32,
    ) -> Result<Cart> {
        if quantity <= 0 {
            return self.remove(product_id, variant_id).await;
        }
        let updated = sqlx::query(
            "UPDATE cart_items SET quantity = $5, updated_at = NOW() \
             WHERE owner_kind = $1 AND owner_id = $2 AND product_id = $3 \
               AND variant_id IS NOT DISTINCT FROM $4",
        )
        .bind(self.owner.kind())
        .bind(self.owner.key())
        .bind(product_id)
        .bind(variant_id)
        .bind(quantity)
        .execute(&self.db)
        .await?
        .rows_affected();
        if updated == 0 {
            return Err(AppError::NotFound("cart item"));
        }
        self.get().await
    }

    /// Single keyed delete; no lookup round trip.
    pub async fn remove(&self, product_id: Uuid, variant_id: Option<Uuid>) -> Result<Cart> {
        let deleted = sqlx::query(
            "DELETE FROM cart_items \
             WHERE owner_kind = $1 AND owner_id = $2 AND product_id = $3 \
               AND variant_id IS NOT DISTINCT FROM $4",
        )
        .bind(self.owner.kind())
        .bind(self.owner.key())
        .bind(product_id)
        .bind(variant_id)
        .execute(&self.db)
        .await?
        .rows_affected();
        if deleted == 0 {
            return Err(AppError::NotFound("cart item"));
        }
        self.get().await
    }

    pub async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM cart_items WHERE owner_kind = $1 AND owner_id = $2")
            .bind(self.owner.kind())
            .bind(self.owner.key())
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Login-time sync: replaces the server cart with the device-local
    /// lines in one transaction. The idempotency key makes retries no-ops,
    /// and a failure anywhere rolls the whole sync back, so the cart is
    /// never left half-applied.
    pub async fn sync_on_login(
        &self,
        idempotency_key: Uuid,
        local_items: Vec<LocalCartItem>,
    ) -> Result<Cart> {
        let mut tx = self.db.begin().await?;

        let first_application = sqlx::query(
            "INSERT INTO cart_syncs (idempotency_key, owner_kind, owner_id) \
             VALUES ($1, $2, $3) ON CONFLICT (idempotency_key) DO NOTHING",
        )
        .bind(idempotency_key)
        .bind(self.owner.kind())
        .bind(self.owner.key())
        .execute(&mut *tx)
        .await?
        .rows_affected()
            > 0;

        if !first_application {
            // Already applied; return the authoritative cart unchanged.
            tx.commit().await?;
            return self.get().await;
        }

        // Resolve local lines against the catalog, then collapse
        // duplicates with the aggregate's replace rule.
        let mut resolved = Vec::with_capacity(local_items.len());
        for item in local_items {
            if item.quantity == 0 {
                continue;
            }
            let product: Option<(String, Decimal, bool)> = sqlx::query_as(
                "SELECT name, price, is_active FROM products WHERE id = $1",
            )
            .bind(item.product_id)
            .fetch_optional(&mut *tx)
            .await?;
            let (name, price, is_active) = product.ok_or(AppError::NotFound("product"))?;
            if !is_active {
                return Err(AppError::ProductUnavailable(item.product_id));
            }
            resolved.push(CartItem {
                product_id: item.product_id,
                variant_id: item.variant_id,
                name,
                quantity: Quantity::new(item.quantity),
                unit_price: Money::new(price, &self.currency),
            });
        }
        let mut merged = Cart::new(self.owner.clone(), &self.currency);
        merged.replace_from_local(resolved);

        // Replace semantics: the pre-existing server cart is discarded.
        sqlx::query("DELETE FROM cart_items WHERE owner_kind = $1 AND owner_id = $2")
            .bind(self.owner.kind())
            .bind(self.owner.key())
            .execute(&mut *tx)
            .await?;

        for line in merged.items() {
            sqlx::query(
                "INSERT INTO cart_items (id, owner_kind, owner_id, product_id, variant_id, quantity) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(Uuid::now_v7())
            .bind(self.owner.kind())
            .bind(self.owner.key())
            .bind(line.product_id)
            .bind(line.variant_id)
            .bind(line.quantity.value() as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        self.get().await
    }
}

/// True when the cart total for a product after this add would exceed
/// available stock.
fn exceeds_stock(in_cart: i64, requested: u32, stock: i32) -> bool {
    in_cart + requested as i64 > stock as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_counts_quantity_already_in_cart() {
        // First add of 5 against stock 6 fits; the second must not.
        assert!(!exceeds_stock(0, 5, 6));
        assert!(exceeds_stock(5, 5, 6));
        assert!(!exceeds_stock(5, 1, 6));
        assert!(exceeds_stock(6, 1, 6));
    }
}

