//! Value objects shared across the cart and order domain.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: Decimal,
    currency: String,
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self {
        Self { amount, currency: currency.to_string() }
    }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn subtract(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount - other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: u32) -> Money {
        Money::new(self.amount * Decimal::from(qty), &self.currency)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${} {}", self.amount.round_dp(2), self.currency)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MoneyError {
    #[error("currency mismatch")]
    CurrencyMismatch,
}

/// Quantity value object
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self { Self(value) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn add(&self, other: u32) -> Self { Self(self.0.saturating_add(other)) }
    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 { None } else { Some(Self(self.0 - other)) }
    }
    pub fn is_zero(&self) -> bool { self.0 == 0 }
}

/// Externally displayed order identifier, distinct from the row id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate() -> Self {
        Self(format!("ORD-{:08}", rand::random::<u32>() % 100_000_000))
    }
    pub fn parse(value: impl Into<String>) -> Result<Self, OrderNumberError> {
        let value = value.into();
        let digits = value.strip_prefix("ORD-").ok_or(OrderNumberError::BadFormat)?;
        if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OrderNumberError::BadFormat);
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum OrderNumberError {
    #[error("order number must look like ORD-00000000")]
    BadFormat,
}

/// Who a cart belongs to: an authenticated user or an anonymous session.
///
/// Services take an `Owner` at construction instead of reading ambient
/// auth state, so every operation is explicit about whose data it touches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Owner {
    User(Uuid),
    Session(String),
}

impl Owner {
    pub fn kind(&self) -> &'static str {
        match self {
            Owner::User(_) => "user",
            Owner::Session(_) => "session",
        }
    }
    pub fn key(&self) -> String {
        match self {
            Owner::User(id) => id.to_string(),
            Owner::Session(id) => id.clone(),
        }
    }
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Owner::User(id) => Some(*id),
            Owner::Session(_) => None,
        }
    }
    pub fn is_authenticated(&self) -> bool { matches!(self, Owner::User(_)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_add_and_multiply() {
        let a = Money::new(Decimal::new(100, 0), "MXN");
        let b = Money::new(Decimal::new(50, 0), "MXN");
        assert_eq!(a.add(&b).unwrap().amount(), Decimal::new(150, 0));
        assert_eq!(a.multiply(3).amount(), Decimal::new(300, 0));
    }

    #[test]
    fn money_rejects_currency_mismatch() {
        let a = Money::new(Decimal::new(100, 0), "MXN");
        let b = Money::new(Decimal::new(100, 0), "USD");
        assert!(a.add(&b).is_err());
    }

    #[test]
    fn quantity_saturates_and_checks() {
        let q = Quantity::new(2);
        assert_eq!(q.add(u32::MAX).value(), u32::MAX);
        assert!(q.subtract(3).is_none());
        assert_eq!(q.subtract(2).unwrap().value(), 0);
        assert!(Quantity::default().is_zero());
    }

    #[test]
    fn order_number_round_trip() {
        let n = OrderNumber::generate();
        assert_eq!(OrderNumber::parse(n.as_str()).unwrap(), n);
        assert!(OrderNumber::parse("ORD-123").is_err());
        assert!(OrderNumber::parse("X-12345678").is_err());
    }

    #[test]
    fn owner_storage_key() {
        let id = Uuid::new_v4();
        let user = Owner::User(id);
        assert_eq!(user.kind(), "user");
        assert_eq!(user.key(), id.to_string());
        let guest = Owner::Session("abc".into());
        assert_eq!(guest.kind(), "session");
        assert!(guest.user_id().is_none());
    }
}
