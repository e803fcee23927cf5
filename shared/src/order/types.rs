//! Shared types for the order command/event pipeline

use crate::money::Money;
use serde::{Deserialize, Serialize};

// ============================================================================
// Fulfillment
// ============================================================================

/// How the order reaches the customer, with the details each mode requires
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Fulfillment {
    DineIn { table_number: u32 },
    Takeaway { customer_contact: String },
    Delivery { delivery_address: String },
}

impl Fulfillment {
    pub fn kind(&self) -> FulfillmentKind {
        match self {
            Fulfillment::DineIn { .. } => FulfillmentKind::DineIn,
            Fulfillment::Takeaway { .. } => FulfillmentKind::Takeaway,
            Fulfillment::Delivery { .. } => FulfillmentKind::Delivery,
        }
    }

    pub fn table_number(&self) -> Option<u32> {
        match self {
            Fulfillment::DineIn { table_number } => Some(*table_number),
            _ => None,
        }
    }
}

impl Default for Fulfillment {
    fn default() -> Self {
        Fulfillment::Takeaway {
            customer_contact: String::new(),
        }
    }
}

/// Fulfillment mode without its details
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentKind {
    #[default]
    DineIn,
    Takeaway,
    Delivery,
}

// ============================================================================
// Payment
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Wallet,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

// ============================================================================
// Items
// ============================================================================

/// A selected option on a line item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemOption {
    pub option_name: String,
    pub choice_name: String,
    pub price_modifier: Money,
}

/// Cart item input - for order creation and item additions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemInput {
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_options: Vec<ItemOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Item changes for modification
///
/// A quantity below 1 is interpreted as item removal, not an error.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ItemChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

// ============================================================================
// Tip
// ============================================================================

/// Tip choice - a rate on the subtotal or an explicit amount
///
/// When both are present the explicit amount wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Tip {
    /// Fraction of the subtotal (0.15 = 15%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Money>,
}

impl Tip {
    pub fn percent(rate: f64) -> Self {
        Self {
            rate: Some(rate),
            amount: None,
        }
    }

    pub fn amount(amount: Money) -> Self {
        Self {
            rate: None,
            amount: Some(amount),
        }
    }

    /// Resolve against a subtotal; explicit amount wins over rate
    pub fn resolve(&self, subtotal: Money) -> Money {
        match (self.amount, self.rate) {
            (Some(amount), _) => amount,
            (None, Some(rate)) => subtotal.percentage(rate),
            (None, None) => Money::zero(subtotal.currency()),
        }
    }
}

// ============================================================================
// Command response
// ============================================================================

/// Command response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// The command ID this responds to
    pub command_id: String,
    /// Whether the command succeeded
    pub success: bool,
    /// New order ID (only for CreateOrder commands)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Error details if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
}

impl CommandResponse {
    pub fn success(command_id: String, order_id: Option<String>) -> Self {
        Self {
            command_id,
            success: true,
            order_id,
            error: None,
        }
    }

    pub fn error(command_id: String, error: CommandError) -> Self {
        Self {
            command_id,
            success: false,
            order_id: None,
            error: Some(error),
        }
    }

    /// Response for an already-processed command id
    pub fn duplicate(command_id: String) -> Self {
        Self {
            command_id,
            success: true,
            order_id: None,
            error: None,
        }
    }
}

/// Command error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandError {
    pub code: CommandErrorCode,
    pub message: String,
}

impl CommandError {
    pub fn new(code: CommandErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Command error codes (clients handle presentation/localization)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandErrorCode {
    // Validation
    EmptyCart,
    MissingFulfillmentDetails,
    MinimumOrderNotMet,
    TableOccupied,
    // State
    OrderNotFound,
    OrderClosed,
    InvalidTransition,
    ItemNotFound,
    // Concurrency
    ConcurrentModification,
    // Policy
    PartialSettlementNotSupported,
    // Money
    CurrencyMismatch,
    // Other
    InvalidOperation,
    DuplicateCommand,
    InternalError,
}
