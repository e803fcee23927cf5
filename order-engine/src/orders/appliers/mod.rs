//! Event applier implementations
//!
//! Each applier implements the `EventApplier` trait and handles one
//! specific event type. Appliers are PURE functions of (snapshot, event),
//! so replaying an order's event stream always reproduces the same
//! snapshot.

use enum_dispatch::enum_dispatch;

use crate::billing;
use crate::orders::traits::EventApplier;
use shared::order::{OrderEvent, OrderEventType, OrderSnapshot};

mod bill_requested;
mod billing_adjusted;
mod item_modified;
mod item_removed;
mod item_status_advanced;
mod items_added;
mod order_cancelled;
mod order_created;
mod order_status_advanced;
mod payment_settled;

pub use bill_requested::BillRequestedApplier;
pub use billing_adjusted::BillingAdjustedApplier;
pub use item_modified::ItemModifiedApplier;
pub use item_removed::ItemRemovedApplier;
pub use item_status_advanced::ItemStatusAdvancedApplier;
pub use items_added::ItemsAddedApplier;
pub use order_cancelled::OrderCancelledApplier;
pub use order_created::OrderCreatedApplier;
pub use order_status_advanced::OrderStatusAdvancedApplier;
pub use payment_settled::PaymentSettledApplier;

/// EventAction enum - dispatches to concrete applier implementations
///
/// Uses enum_dispatch for zero-cost static dispatch.
#[enum_dispatch(EventApplier)]
pub enum EventAction {
    OrderCreated(OrderCreatedApplier),
    ItemsAdded(ItemsAddedApplier),
    ItemModified(ItemModifiedApplier),
    ItemRemoved(ItemRemovedApplier),
    OrderStatusAdvanced(OrderStatusAdvancedApplier),
    ItemStatusAdvanced(ItemStatusAdvancedApplier),
    BillingAdjusted(BillingAdjustedApplier),
    OrderCancelled(OrderCancelledApplier),
    BillRequested(BillRequestedApplier),
    PaymentSettled(PaymentSettledApplier),
}

/// Convert an OrderEvent reference to its applier
///
/// This is the ONLY place with a match on `OrderEventType`.
impl From<&OrderEvent> for EventAction {
    fn from(event: &OrderEvent) -> Self {
        match event.event_type {
            OrderEventType::OrderCreated => EventAction::OrderCreated(OrderCreatedApplier),
            OrderEventType::ItemsAdded => EventAction::ItemsAdded(ItemsAddedApplier),
            OrderEventType::ItemModified => EventAction::ItemModified(ItemModifiedApplier),
            OrderEventType::ItemRemoved => EventAction::ItemRemoved(ItemRemovedApplier),
            OrderEventType::OrderStatusAdvanced => {
                EventAction::OrderStatusAdvanced(OrderStatusAdvancedApplier)
            }
            OrderEventType::ItemStatusAdvanced => {
                EventAction::ItemStatusAdvanced(ItemStatusAdvancedApplier)
            }
            OrderEventType::BillingAdjusted => EventAction::BillingAdjusted(BillingAdjustedApplier),
            OrderEventType::OrderCancelled => EventAction::OrderCancelled(OrderCancelledApplier),
            OrderEventType::BillRequested => EventAction::BillRequested(BillRequestedApplier),
            OrderEventType::PaymentSettled => EventAction::PaymentSettled(PaymentSettledApplier),
        }
    }
}

/// Common tail of every applier: version/sequence/timestamp bookkeeping,
/// optional pricing recomputation, checksum refresh
///
/// Pricing errors cannot occur for event streams produced by the actions
/// (inputs are validated before events exist); if one does surface the
/// previous totals are kept and the inconsistency is logged.
pub(crate) fn finalize(snapshot: &mut OrderSnapshot, event: &OrderEvent, recalculate: bool) {
    snapshot.version = event.order_version;
    snapshot.last_sequence = event.sequence;
    snapshot.updated_at = event.timestamp;
    if recalculate {
        if let Err(e) = billing::recalculate(snapshot) {
            tracing::error!(
                order_id = %snapshot.order_id,
                error = %e,
                "pricing recalculation failed; keeping previous totals"
            );
        }
    }
    snapshot.update_checksum();
}
