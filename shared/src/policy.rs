//! Venue billing policy
//!
//! A policy snapshot is captured when an order is created and stays frozen
//! for the order's lifetime, so later venue configuration changes never
//! alter an open order's pricing.

use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Default cap on a single line item's quantity
pub const DEFAULT_MAX_ITEM_QUANTITY: i32 = 99;

/// Venue billing policy inputs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VenuePolicy {
    pub currency: Currency,
    /// Tax rate as a fraction of the subtotal (0.08 = 8%)
    pub tax_rate: f64,
    /// Service charge rate as a fraction of the subtotal
    pub service_charge_rate: f64,
    /// Flat fee applied to delivery orders
    pub delivery_base_fee: Money,
    /// Minimum subtotal required for delivery orders
    pub minimum_order_amount: Money,
    /// Informational tab ceiling; never blocks mutations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spending_limit: Option<Money>,
    /// Cap on a single line item's quantity
    pub max_item_quantity: i32,
}

impl VenuePolicy {
    /// A policy with zero rates and fees in the given currency
    pub fn new(currency: Currency) -> Self {
        Self {
            currency,
            tax_rate: 0.0,
            service_charge_rate: 0.0,
            delivery_base_fee: Money::zero(currency),
            minimum_order_amount: Money::zero(currency),
            spending_limit: None,
            max_item_quantity: DEFAULT_MAX_ITEM_QUANTITY,
        }
    }

    /// Check that rates are finite and non-negative
    ///
    /// Returns the offending field name on failure.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.tax_rate.is_finite() || self.tax_rate < 0.0 {
            return Err("tax_rate");
        }
        if !self.service_charge_rate.is_finite() || self.service_charge_rate < 0.0 {
            return Err("service_charge_rate");
        }
        if self.max_item_quantity < 1 {
            return Err("max_item_quantity");
        }
        if !self.delivery_base_fee.is_non_negative() {
            return Err("delivery_base_fee");
        }
        if !self.minimum_order_amount.is_non_negative() {
            return Err("minimum_order_amount");
        }
        Ok(())
    }
}

impl Default for VenuePolicy {
    fn default() -> Self {
        Self::new(Currency::default())
    }
}
