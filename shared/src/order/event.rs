//! Order events - immutable facts recorded after command processing

use super::snapshot::{ItemStatus, OrderItemSnapshot, OrderStatus};
use super::types::{Fulfillment, ItemChanges, PaymentMethod, Tip};
use crate::money::Money;
use crate::policy::VenuePolicy;
use serde::{Deserialize, Serialize};

/// Order event - immutable audit record
///
/// `sequence` is the global, authoritative ordering for replay and sync;
/// `order_version` is the per-order monotonic version observers use to
/// drop stale or redelivered updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Event unique ID
    pub event_id: String,
    /// Global sequence number (for ordering and replay)
    pub sequence: u64,
    /// Order this event belongs to
    pub order_id: String,
    /// Per-order version after applying this event
    pub order_version: u64,
    /// Routing metadata for subscription filters
    pub venue_id: String,
    pub customer_id: String,
    /// Server timestamp (Unix milliseconds), authoritative for state
    pub timestamp: i64,
    /// Client timestamp, preserved for audit; may differ due to clock skew
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_timestamp: Option<i64>,
    /// Operator who triggered this event
    pub operator_id: String,
    /// Operator name (snapshot for audit)
    pub operator_name: String,
    /// Command that triggered this event (for audit tracing)
    pub command_id: String,
    pub event_type: OrderEventType,
    pub payload: EventPayload,
}

/// Identity and routing fields for a new event
#[derive(Debug, Clone)]
pub struct EventContext {
    pub order_id: String,
    pub venue_id: String,
    pub customer_id: String,
    /// Per-order version the event will carry
    pub order_version: u64,
}

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    // Lifecycle
    OrderCreated,
    OrderStatusAdvanced,
    ItemStatusAdvanced,
    OrderCancelled,

    // Items
    ItemsAdded,
    ItemModified,
    ItemRemoved,

    // Billing
    BillingAdjusted,
    BillRequested,
    PaymentSettled,
}

impl std::fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderEventType::OrderCreated => "ORDER_CREATED",
            OrderEventType::OrderStatusAdvanced => "ORDER_STATUS_ADVANCED",
            OrderEventType::ItemStatusAdvanced => "ITEM_STATUS_ADVANCED",
            OrderEventType::OrderCancelled => "ORDER_CANCELLED",
            OrderEventType::ItemsAdded => "ITEMS_ADDED",
            OrderEventType::ItemModified => "ITEM_MODIFIED",
            OrderEventType::ItemRemoved => "ITEM_REMOVED",
            OrderEventType::BillingAdjusted => "BILLING_ADJUSTED",
            OrderEventType::BillRequested => "BILL_REQUESTED",
            OrderEventType::PaymentSettled => "PAYMENT_SETTLED",
        };
        f.write_str(name)
    }
}

/// Event payload variants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    // ========== Lifecycle ==========
    OrderCreated {
        /// Server-generated order number (always present)
        order_number: String,
        fulfillment: Fulfillment,
        /// Complete snapshots of the initial items
        items: Vec<OrderItemSnapshot>,
        /// Venue policy frozen for the order's lifetime
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

    OrderStatusAdvanced {
        from: OrderStatus,
        to: OrderStatus,
    },

    ItemStatusAdvanced {
        item_id: String,
        from: ItemStatus,
        to: ItemStatus,
    },

    OrderCancelled {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Total frozen at cancellation (audit trail)
        final_total: Money,
    },

    // ========== Items ==========
    ItemsAdded {
        /// Complete snapshots of added items
        items: Vec<OrderItemSnapshot>,
    },

    ItemModified {
        item_id: String,
        /// Changes applied
        changes: ItemChanges,
        /// Previous values for comparison
        previous: ItemChanges,
    },

    ItemRemoved {
        item_id: String,
        product_name: String,
    },

    // ========== Billing ==========
    BillingAdjusted {
        #[serde(skip_serializing_if = "Option::is_none")]
        tip: Option<Tip>,
        #[serde(skip_serializing_if = "Option::is_none")]
        discount: Option<Money>,
        #[serde(skip_serializing_if = "Option::is_none")]
        split_count: Option<u32>,
    },

    BillRequested {
        from: OrderStatus,
    },

    PaymentSettled {
        method: PaymentMethod,
        /// Total collected (audit trail)
        amount: Money,
    },
}

impl OrderEvent {
    /// Create a new event; the server timestamp is always set here
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        ctx: EventContext,
        operator_id: String,
        operator_name: String,
        command_id: String,
        client_timestamp: Option<i64>,
        event_type: OrderEventType,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            sequence,
            order_id: ctx.order_id,
            order_version: ctx.order_version,
            venue_id: ctx.venue_id,
            customer_id: ctx.customer_id,
            timestamp: crate::util::now_millis(),
            client_timestamp,
            operator_id,
            operator_name,
            command_id,
            event_type,
            payload,
        }
    }
}
