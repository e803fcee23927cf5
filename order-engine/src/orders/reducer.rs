//! Input conversion and event replay
//!
//! The reducer turns cart inputs into item snapshots at the action layer
//! and rebuilds order snapshots from their event streams. Replay and the
//! live apply path share the same appliers, so a rebuilt snapshot is
//! bit-identical to the incrementally maintained one.

use crate::billing::{self, validation};
use crate::orders::appliers::EventAction;
use crate::orders::traits::{EventApplier, OrderError};
use shared::money::Money;
use shared::order::snapshot::{ItemStatus, OrderItemSnapshot};
use shared::order::{CartItemInput, OrderEvent, OrderEventType, OrderSnapshot};
use shared::policy::VenuePolicy;

/// Convert a cart input into an item snapshot
///
/// Quantities are clamped into the policy range; the line total is
/// computed immediately so the snapshot never carries a stale value.
pub fn item_from_input(
    input: &CartItemInput,
    policy: &VenuePolicy,
) -> Result<OrderItemSnapshot, OrderError> {
    let mut item = OrderItemSnapshot {
        item_id: uuid::Uuid::new_v4().to_string(),
        product_name: input.product_name.clone(),
        unit_price: input.unit_price,
        quantity: validation::clamp_quantity(input.quantity, policy),
        selected_options: input.selected_options.clone(),
        status: ItemStatus::Pending,
        note: input.note.clone(),
        line_total: Money::zero(policy.currency),
    };
    item.line_total = billing::line_total(&item)?;
    Ok(item)
}

/// Rebuild an order snapshot by replaying its event stream
///
/// Returns `None` when the stream is empty or does not start with a
/// creation event.
pub fn replay(events: &[OrderEvent]) -> Option<OrderSnapshot> {
    let first = events.first()?;
    if first.event_type != OrderEventType::OrderCreated {
        return None;
    }

    let mut snapshot = OrderSnapshot::new(first.order_id.clone());
    for event in events {
        let applier: EventAction = event.into();
        applier.apply(&mut snapshot, event);
    }
    Some(snapshot)
}
