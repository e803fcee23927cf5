//! Order snapshot - computed state from the event stream
//!
//! The snapshot includes a `state_checksum` field for drift detection.
//! Clients maintaining a local reduction can compare their computed
//! checksum with the server's to detect divergence and trigger a full
//! re-fetch.

use super::types::{
    Fulfillment, FulfillmentKind, ItemOption, PaymentMethod, PaymentStatus, Tip,
};
use crate::money::{Currency, Money};
use crate::policy::VenuePolicy;
use serde::{Deserialize, Serialize};
use std::hash::Hash;

// ============================================================================
// Status state machines
// ============================================================================

/// Order status
///
/// `pending → confirmed → preparing → ready → served|delivered →
/// bill_requested → paid → completed`, with `cancelled` reachable from
/// every status up to and including `bill_requested`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Served,
    Delivered,
    BillRequested,
    Paid,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses permit no further mutation
    /// (`paid` excepts the single closing advance to `completed`)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Completed | OrderStatus::Cancelled
        )
    }

    /// Progress rank; `served` and `delivered` share a rank, `cancelled`
    /// sits outside the forward progression
    pub fn rank(&self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Confirmed => 1,
            OrderStatus::Preparing => 2,
            OrderStatus::Ready => 3,
            OrderStatus::Served | OrderStatus::Delivered => 4,
            OrderStatus::BillRequested => 5,
            OrderStatus::Paid => 6,
            OrderStatus::Completed => 7,
            OrderStatus::Cancelled => u8::MAX,
        }
    }

    /// The direct successor in the transition graph, if any
    ///
    /// The `ready` branch depends on the fulfillment mode: dine-in and
    /// takeaway orders are `served`, delivery orders are `delivered`.
    pub fn successor(&self, fulfillment: FulfillmentKind) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(match fulfillment {
                FulfillmentKind::Delivery => OrderStatus::Delivered,
                _ => OrderStatus::Served,
            }),
            OrderStatus::Served | OrderStatus::Delivered => Some(OrderStatus::BillRequested),
            OrderStatus::BillRequested => Some(OrderStatus::Paid),
            OrderStatus::Paid => Some(OrderStatus::Completed),
            OrderStatus::Completed | OrderStatus::Cancelled => None,
        }
    }

    /// Whether cancellation is still permitted (up to and including
    /// `bill_requested`)
    pub fn is_cancellable(&self) -> bool {
        !self.is_terminal()
    }
}

/// Line item status: `pending → preparing → ready → served`, monotonic,
/// no skipping, no regression
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    #[default]
    Pending,
    Preparing,
    Ready,
    Served,
}

impl ItemStatus {
    pub fn rank(&self) -> u8 {
        match self {
            ItemStatus::Pending => 0,
            ItemStatus::Preparing => 1,
            ItemStatus::Ready => 2,
            ItemStatus::Served => 3,
        }
    }

    pub fn successor(&self) -> Option<ItemStatus> {
        match self {
            ItemStatus::Pending => Some(ItemStatus::Preparing),
            ItemStatus::Preparing => Some(ItemStatus::Ready),
            ItemStatus::Ready => Some(ItemStatus::Served),
            ItemStatus::Served => None,
        }
    }
}

// ============================================================================
// Bill breakdown
// ============================================================================

/// Derived pricing for an order
///
/// Always recomputed as a whole from the items and the frozen policy;
/// never mutated field by field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillBreakdown {
    pub subtotal: Money,
    pub tax: Money,
    pub service_charge: Money,
    pub tip: Money,
    pub delivery_fee: Money,
    pub discount: Money,
    /// `subtotal + tax + service_charge + tip + delivery_fee − discount`,
    /// clamped to ≥ 0
    pub total: Money,
    /// Ceiling-divided share when the bill is split
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_head: Option<Money>,
}

impl BillBreakdown {
    pub fn zero(currency: Currency) -> Self {
        Self {
            subtotal: Money::zero(currency),
            tax: Money::zero(currency),
            service_charge: Money::zero(currency),
            tip: Money::zero(currency),
            delivery_fee: Money::zero(currency),
            discount: Money::zero(currency),
            total: Money::zero(currency),
            per_head: None,
        }
    }
}

// ============================================================================
// Items
// ============================================================================

/// Line item snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItemSnapshot {
    /// Opaque id, unique within the order
    pub item_id: String,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selected_options: Vec<ItemOption>,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// `(unit_price + Σ option modifiers) × quantity`, recomputed whenever
    /// price or quantity changes
    pub line_total: Money,
}

// ============================================================================
// Order snapshot
// ============================================================================

/// Order snapshot - computed from the event stream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSnapshot {
    /// Order ID (assigned by the engine)
    pub order_id: String,
    /// Human-readable globally-unique order number
    pub order_number: String,
    pub venue_id: String,
    pub customer_id: String,
    pub fulfillment: Fulfillment,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<PaymentMethod>,
    /// Line items; never empty for a created order
    pub items: Vec<OrderItemSnapshot>,
    /// Derived pricing, recomputed on every mutation
    pub pricing: BillBreakdown,
    /// Venue policy frozen at creation
    pub policy: VenuePolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip: Option<Tip>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub split_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,
    /// Last update timestamp; bumped by every accepted mutation
    pub updated_at: i64,
    /// Per-order version; observers drop updates that are not strictly newer
    pub version: u64,
    /// Global sequence of the last applied event
    pub last_sequence: u64,
    /// State checksum for drift detection (hex string)
    #[serde(default)]
    pub state_checksum: String,
}

impl OrderSnapshot {
    /// Create an empty shell for an order id; the creation event applier
    /// fills in every field
    pub fn new(order_id: String) -> Self {
        let currency = Currency::default();
        let mut snapshot = Self {
            order_id,
            order_number: String::new(),
            venue_id: String::new(),
            customer_id: String::new(),
            fulfillment: Fulfillment::default(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_method: None,
            items: Vec::new(),
            pricing: BillBreakdown::zero(currency),
            policy: VenuePolicy::new(currency),
            tip: None,
            discount: None,
            split_count: None,
            notes: None,
            cancel_reason: None,
            created_at: 0,
            updated_at: 0,
            version: 0,
            last_sequence: 0,
            state_checksum: String::new(),
        };
        snapshot.update_checksum();
        snapshot
    }

    /// Whether the order still accepts mutations
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == OrderStatus::Cancelled
    }

    pub fn item(&self, item_id: &str) -> Option<&OrderItemSnapshot> {
        self.items.iter().find(|i| i.item_id == item_id)
    }

    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut OrderItemSnapshot> {
        self.items.iter_mut().find(|i| i.item_id == item_id)
    }

    /// Count of items currently at the given status
    pub fn items_at(&self, status: ItemStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    /// Identity and routing fields for the next event on this order
    pub fn event_context(&self) -> super::event::EventContext {
        super::event::EventContext {
            order_id: self.order_id.clone(),
            venue_id: self.venue_id.clone(),
            customer_id: self.customer_id.clone(),
            order_version: self.version + 1,
        }
    }

    /// Compute state checksum for drift detection
    ///
    /// Hashes item count, total in minor units, status, per-order version
    /// and last applied sequence. Returns a 16-character hex string.
    pub fn compute_checksum(&self) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::Hasher as _;

        let mut hasher = DefaultHasher::new();
        self.items.len().hash(&mut hasher);
        self.pricing.total.minor_units().hash(&mut hasher);
        self.status.rank().hash(&mut hasher);
        self.version.hash(&mut hasher);
        self.last_sequence.hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    /// Update the state_checksum field based on current state
    pub fn update_checksum(&mut self) {
        self.state_checksum = self.compute_checksum();
    }

    /// Verify that state_checksum matches the computed checksum
    pub fn verify_checksum(&self) -> bool {
        self.state_checksum == self.compute_checksum()
    }
}
