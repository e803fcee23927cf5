//! Order commands - requests from clients to modify orders

use super::snapshot::{ItemStatus, OrderStatus};
use super::types::{CartItemInput, Fulfillment, ItemChanges, PaymentMethod, Tip};
use crate::money::Money;
use crate::policy::VenuePolicy;
use serde::{Deserialize, Serialize};

/// Order command
///
/// `command_id` is the idempotency key: the engine processes each id at
/// most once and answers duplicates without side effects. When
/// `expected_version` is set, the command fails with a concurrent
/// modification error unless the target order's current version matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCommand {
    /// Client-generated idempotency key
    pub command_id: String,
    /// Operator who issued the command (customer or staff)
    pub operator_id: String,
    /// Operator name (snapshot for audit)
    pub operator_name: String,
    /// Client timestamp (Unix milliseconds)
    pub timestamp: i64,
    /// Optional compare-and-set guard against the order's version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
    pub payload: OrderCommandPayload,
}

impl OrderCommand {
    pub fn new(
        operator_id: impl Into<String>,
        operator_name: impl Into<String>,
        payload: OrderCommandPayload,
    ) -> Self {
        Self {
            command_id: uuid::Uuid::new_v4().to_string(),
            operator_id: operator_id.into(),
            operator_name: operator_name.into(),
            timestamp: crate::util::now_millis(),
            expected_version: None,
            payload,
        }
    }

    pub fn with_expected_version(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Command payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderCommandPayload {
    // ========== Creation ==========
    CreateOrder {
        venue_id: String,
        customer_id: String,
        fulfillment: Fulfillment,
        items: Vec<CartItemInput>,
        /// Venue policy, frozen onto the order at creation
        policy: VenuePolicy,
        #[serde(skip_serializing_if = "Option::is_none")]
        payment_method: Option<PaymentMethod>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tip: Option<Tip>,
        #[serde(skip_serializing_if = "Option::is_none")]
        discount: Option<Money>,
        #[serde(skip_serializing_if = "Option::is_none")]
        split_count: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
    },

    // ========== Items (pending orders only) ==========
    AddItems {
        order_id: String,
        items: Vec<CartItemInput>,
    },
    ModifyItem {
        order_id: String,
        item_id: String,
        changes: ItemChanges,
    },
    RemoveItem {
        order_id: String,
        item_id: String,
    },

    // ========== Lifecycle ==========
    AdvanceOrderStatus {
        order_id: String,
        target: OrderStatus,
    },
    AdvanceItemStatus {
        order_id: String,
        item_id: String,
        target: ItemStatus,
    },
    CancelOrder {
        order_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    // ========== Billing adjustments ==========
    /// Replace tip/discount/split inputs; `None` fields are left unchanged
    AdjustBilling {
        order_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        tip: Option<Tip>,
        #[serde(skip_serializing_if = "Option::is_none")]
        discount: Option<Money>,
        #[serde(skip_serializing_if = "Option::is_none")]
        split_count: Option<u32>,
    },

    // ========== Tab settlement (set-based, all-or-nothing) ==========
    RequestBill {
        order_ids: Vec<String>,
    },
    SettlePayment {
        order_ids: Vec<String>,
        method: PaymentMethod,
    },
}

impl OrderCommandPayload {
    /// The single order a command targets, if any; set-based commands and
    /// creation return `None`
    pub fn primary_order_id(&self) -> Option<&str> {
        match self {
            OrderCommandPayload::CreateOrder { .. }
            | OrderCommandPayload::RequestBill { .. }
            | OrderCommandPayload::SettlePayment { .. } => None,
            OrderCommandPayload::AddItems { order_id, .. }
            | OrderCommandPayload::ModifyItem { order_id, .. }
            | OrderCommandPayload::RemoveItem { order_id, .. }
            | OrderCommandPayload::AdvanceOrderStatus { order_id, .. }
            | OrderCommandPayload::AdvanceItemStatus { order_id, .. }
            | OrderCommandPayload::CancelOrder { order_id, .. }
            | OrderCommandPayload::AdjustBilling { order_id, .. } => Some(order_id),
        }
    }
}
