//! Checkout flow
//!
//! A linear step machine: `UserType → DeliveryType → ContactInfo →
//! PaymentMethod → Confirmation → OrderSuccess`. Forward moves validate
//! the current step; backward moves never re-validate. There is no failed
//! state: a submit that errors leaves the flow at Confirmation so the
//! customer can retry.

pub mod pricing;

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{DeliveryType, PaymentMethod};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    UserType,
    DeliveryType,
    ContactInfo,
    PaymentMethod,
    Confirmation,
    OrderSuccess,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Guest,
    Account,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContactInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
}

/// Everything the server needs to place the order. Amounts are absent on
/// purpose: pricing is recomputed server-side from the catalog.
#[derive(Clone, Debug)]
pub struct CheckoutSelections {
    pub user_type: UserType,
    pub delivery_type: DeliveryType,
    pub contact: ContactInfo,
    pub payment_method: PaymentMethod,
}

#[derive(Clone, Debug)]
pub struct CheckoutFlow {
    step: CheckoutStep,
    first_step: CheckoutStep,
    user_type: Option<UserType>,
    delivery_type: Option<DeliveryType>,
    contact: ContactInfo,
    payment_method: Option<PaymentMethod>,
}

impl CheckoutFlow {
    /// Anonymous entry: starts at the user-type choice.
    pub fn new() -> Self {
        Self {
            step: CheckoutStep::UserType,
            first_step: CheckoutStep::UserType,
            user_type: None,
            delivery_type: None,
            contact: ContactInfo::default(),
            payment_method: None,
        }
    }

    /// Authenticated entry: the user-type step is skipped and the type is
    /// pinned to Account once, at construction.
    pub fn for_account() -> Self {
        Self {
            step: CheckoutStep::DeliveryType,
            first_step: CheckoutStep::DeliveryType,
            user_type: Some(UserType::Account),
            delivery_type: None,
            contact: ContactInfo::default(),
            payment_method: None,
        }
    }

    pub fn step(&self) -> CheckoutStep { self.step }

    pub fn select_user_type(&mut self, user_type: UserType) {
        self.user_type = Some(user_type);
    }

    pub fn select_delivery_type(&mut self, delivery_type: DeliveryType) {
        self.delivery_type = Some(delivery_type);
    }

    pub fn set_contact(&mut self, contact: ContactInfo) {
        self.contact = contact;
    }

    pub fn select_payment_method(&mut self, payment_method: PaymentMethod) {
        self.payment_method = Some(payment_method);
    }

    /// Moves forward one step if the current step's fields validate;
    /// otherwise returns the violation and stays put.
    pub fn advance(&mut self) -> Result<CheckoutStep, CheckoutError> {
        let next = match self.step {
            CheckoutStep::UserType => {
                if self.user_type.is_none() {
                    return Err(CheckoutError::MissingField("user_type"));
                }
                CheckoutStep::DeliveryType
            }
            CheckoutStep::DeliveryType => {
                if self.delivery_type.is_none() {
                    return Err(CheckoutError::MissingField("delivery_type"));
                }
                CheckoutStep::ContactInfo
            }
            CheckoutStep::ContactInfo => {
                self.validate_contact()?;
                CheckoutStep::PaymentMethod
            }
            CheckoutStep::PaymentMethod => {
                if self.payment_method.is_none() {
                    return Err(CheckoutError::MissingField("payment_method"));
                }
                CheckoutStep::Confirmation
            }
            CheckoutStep::Confirmation => return Err(CheckoutError::AwaitingSubmit),
            CheckoutStep::OrderSuccess => return Err(CheckoutError::AlreadyCompleted),
        };
        self.step = next;
        Ok(next)
    }

    /// Always permitted; never re-validates. No-op at the first reachable
    /// step and once the order has been placed.
    pub fn back(&mut self) -> CheckoutStep {
        if self.step == self.first_step || self.step == CheckoutStep::OrderSuccess {
            return self.step;
        }
        self.step = match self.step {
            CheckoutStep::DeliveryType => CheckoutStep::UserType,
            CheckoutStep::ContactInfo => CheckoutStep::DeliveryType,
            CheckoutStep::PaymentMethod => CheckoutStep::ContactInfo,
            CheckoutStep::Confirmation => CheckoutStep::PaymentMethod,
            CheckoutStep::UserType | CheckoutStep::OrderSuccess => self.step,
        };
        self.step
    }

    /// The selections to submit, available only at Confirmation.
    pub fn selections(&self) -> Result<CheckoutSelections, CheckoutError> {
        if self.step != CheckoutStep::Confirmation {
            return Err(CheckoutError::NotAtConfirmation);
        }
        Ok(CheckoutSelections {
            user_type: self.user_type.ok_or(CheckoutError::MissingField("user_type"))?,
            delivery_type: self.delivery_type.ok_or(CheckoutError::MissingField("delivery_type"))?,
            contact: self.contact.clone(),
            payment_method: self
                .payment_method
                .ok_or(CheckoutError::MissingField("payment_method"))?,
        })
    }

    /// Marks the flow finished after a successful order creation.
    pub fn complete(&mut self) -> Result<(), CheckoutError> {
        if self.step != CheckoutStep::Confirmation {
            return Err(CheckoutError::NotAtConfirmation);
        }
        self.step = CheckoutStep::OrderSuccess;
        Ok(())
    }

    fn validate_contact(&self) -> Result<(), CheckoutError> {
        if self.contact.name.trim().is_empty() {
            return Err(CheckoutError::MissingField("name"));
        }
        if !validator::validate_email(self.contact.email.as_str()) {
            return Err(CheckoutError::InvalidEmail);
        }
        if !phone_is_valid(&self.contact.phone) {
            return Err(CheckoutError::InvalidPhone);
        }
        if self.delivery_type == Some(DeliveryType::Delivery)
            && self.contact.address.as_deref().map_or(true, |a| a.trim().is_empty())
        {
            return Err(CheckoutError::AddressRequired);
        }
        Ok(())
    }
}

impl Default for CheckoutFlow {
    fn default() -> Self {
        Self::new()
    }
}

/// Accepts 10 to 15 digits, ignoring a leading `+` and common separators.
pub fn phone_is_valid(phone: &str) -> bool {
    let digits = phone
        .chars()
        .filter(|c| c.is_ascii_digit())
        .count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
    allowed && (10..=15).contains(&digits)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckoutError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("invalid email address")]
    InvalidEmail,
    #[error("invalid phone number")]
    InvalidPhone,
    #[error("delivery orders require an address")]
    AddressRequired,
    #[error("confirmation step submits via the order service")]
    AwaitingSubmit,
    #[error("checkout already completed")]
    AlreadyCompleted,
    #[error("flow is not at the confirmation step")]
    NotAtConfirmation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(name: &str, email: &str, phone: &str, address: Option<&str>) -> ContactInfo {
        ContactInfo {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            address: address.map(Into::into),
        }
    }

    fn flow_at_contact(delivery: DeliveryType) -> CheckoutFlow {
        let mut flow = CheckoutFlow::new();
        flow.select_user_type(UserType::Guest);
        flow.advance().unwrap();
        flow.select_delivery_type(delivery);
        flow.advance().unwrap();
        flow
    }

    #[test]
    fn happy_path_reaches_confirmation() {
        let mut flow = flow_at_contact(DeliveryType::Pickup);
        flow.set_contact(contact("Ana", "ana@example.com", "5512345678", None));
        flow.advance().unwrap();
        flow.select_payment_method(PaymentMethod::Cash);
        assert_eq!(flow.advance().unwrap(), CheckoutStep::Confirmation);
        let selections = flow.selections().unwrap();
        assert_eq!(selections.delivery_type, DeliveryType::Pickup);
        flow.complete().unwrap();
        assert_eq!(flow.step(), CheckoutStep::OrderSuccess);
    }

    #[test]
    fn empty_name_blocks_contact_step() {
        let mut flow = flow_at_contact(DeliveryType::Pickup);
        flow.set_contact(contact("", "ana@example.com", "5512345678", None));
        assert_eq!(flow.advance(), Err(CheckoutError::MissingField("name")));
        assert_eq!(flow.step(), CheckoutStep::ContactInfo);
    }

    #[test]
    fn malformed_email_blocks_contact_step() {
        let mut flow = flow_at_contact(DeliveryType::Pickup);
        flow.set_contact(contact("Ana", "abc", "5512345678", None));
        assert_eq!(flow.advance(), Err(CheckoutError::InvalidEmail));
        assert_eq!(flow.step(), CheckoutStep::ContactInfo);
    }

    #[test]
    fn delivery_without_address_blocks_contact_step() {
        let mut flow = flow_at_contact(DeliveryType::Delivery);
        flow.set_contact(contact("Ana", "ana@example.com", "5512345678", None));
        assert_eq!(flow.advance(), Err(CheckoutError::AddressRequired));
        assert_eq!(flow.step(), CheckoutStep::ContactInfo);
        // Pickup with the same contact is fine.
        let mut pickup = flow_at_contact(DeliveryType::Pickup);
        pickup.set_contact(contact("Ana", "ana@example.com", "5512345678", None));
        assert!(pickup.advance().is_ok());
    }

    #[test]
    fn phone_digit_count_is_enforced() {
        assert!(phone_is_valid("5512345678"));
        assert!(phone_is_valid("+52 55 1234 5678"));
        assert!(!phone_is_valid("12345"));
        assert!(!phone_is_valid("551234567890123456"));
        assert!(!phone_is_valid("55-1234-abcd"));
    }

    #[test]
    fn back_never_validates() {
        let mut flow = flow_at_contact(DeliveryType::Delivery);
        // Contact is empty and invalid; back is still permitted.
        assert_eq!(flow.back(), CheckoutStep::DeliveryType);
        assert_eq!(flow.back(), CheckoutStep::UserType);
        // First step: back is a no-op.
        assert_eq!(flow.back(), CheckoutStep::UserType);
    }

    #[test]
    fn account_fast_path_skips_user_type() {
        let mut flow = CheckoutFlow::for_account();
        assert_eq!(flow.step(), CheckoutStep::DeliveryType);
        // Back stops at the first reachable step for this entry.
        assert_eq!(flow.back(), CheckoutStep::DeliveryType);
        flow.select_delivery_type(DeliveryType::Pickup);
        flow.advance().unwrap();
        flow.set_contact(contact("Ana", "ana@example.com", "5512345678", None));
        flow.advance().unwrap();
        flow.select_payment_method(PaymentMethod::Transfer);
        flow.advance().unwrap();
        assert_eq!(flow.selections().unwrap().user_type, UserType::Account);
    }

    #[test]
    fn cannot_skip_ahead_without_selection() {
        let mut flow = CheckoutFlow::new();
        assert_eq!(flow.advance(), Err(CheckoutError::MissingField("user_type")));
        assert_eq!(flow.step(), CheckoutStep::UserType);
    }
}
