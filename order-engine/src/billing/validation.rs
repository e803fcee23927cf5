//! Input validation for billing-relevant command fields
//!
//! Validation happens at the action layer, before any event is produced,
//! so appliers never see malformed inputs.

use crate::orders::traits::OrderError;
use shared::money::Money;
use shared::order::types::{CartItemInput, Tip};
use shared::policy::VenuePolicy;

/// Validate a cart item input against the order's policy
pub fn validate_cart_item(item: &CartItemInput, policy: &VenuePolicy) -> Result<(), OrderError> {
    if item.product_name.trim().is_empty() {
        return Err(OrderError::InvalidOperation(
            "item product name must not be empty".to_string(),
        ));
    }
    if !item.unit_price.is_non_negative() {
        return Err(OrderError::InvalidOperation(format!(
            "unit price must be non-negative, got {}",
            item.unit_price
        )));
    }
    if item.unit_price.currency() != policy.currency {
        return Err(OrderError::CurrencyMismatch(format!(
            "item {} is priced in {}, venue uses {}",
            item.product_name,
            item.unit_price.currency(),
            policy.currency
        )));
    }
    for option in &item.selected_options {
        if option.price_modifier.currency() != policy.currency {
            return Err(OrderError::CurrencyMismatch(format!(
                "option {} of item {} uses {}, venue uses {}",
                option.choice_name,
                item.product_name,
                option.price_modifier.currency(),
                policy.currency
            )));
        }
    }
    Ok(())
}

/// Clamp a requested quantity into the policy's allowed range
pub fn clamp_quantity(quantity: i32, policy: &VenuePolicy) -> i32 {
    quantity.clamp(1, policy.max_item_quantity)
}

/// Validate a tip input
pub fn validate_tip(tip: &Tip, policy: &VenuePolicy) -> Result<(), OrderError> {
    if let Some(rate) = tip.rate {
        if !rate.is_finite() || rate < 0.0 {
            return Err(OrderError::InvalidOperation(format!(
                "tip rate must be a non-negative finite number, got {rate}"
            )));
        }
    }
    if let Some(amount) = tip.amount {
        if !amount.is_non_negative() {
            return Err(OrderError::InvalidOperation(format!(
                "tip amount must be non-negative, got {amount}"
            )));
        }
        if amount.currency() != policy.currency {
            return Err(OrderError::CurrencyMismatch(format!(
                "tip is in {}, venue uses {}",
                amount.currency(),
                policy.currency
            )));
        }
    }
    Ok(())
}

/// Validate a discount input
pub fn validate_discount(discount: Money, policy: &VenuePolicy) -> Result<(), OrderError> {
    if !discount.is_non_negative() {
        return Err(OrderError::InvalidOperation(format!(
            "discount must be non-negative, got {discount}"
        )));
    }
    if discount.currency() != policy.currency {
        return Err(OrderError::CurrencyMismatch(format!(
            "discount is in {}, venue uses {}",
            discount.currency(),
            policy.currency
        )));
    }
    Ok(())
}

/// Validate a split count
pub fn validate_split_count(split_count: u32) -> Result<(), OrderError> {
    if split_count < 1 {
        return Err(OrderError::InvalidOperation(
            "split count must be at least 1".to_string(),
        ));
    }
    Ok(())
}
