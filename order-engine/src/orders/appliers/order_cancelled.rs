//! OrderCancelled event applier
//!
//! Pricing is deliberately NOT recomputed: the breakdown freezes at its
//! last computed value as the audit trail of the cancelled order.

use super::finalize;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// OrderCancelled applier
pub struct OrderCancelledApplier;

impl EventApplier for OrderCancelledApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderCancelled { reason, .. } = &event.payload {
            snapshot.status = OrderStatus::Cancelled;
            snapshot.cancel_reason = reason.clone();
            finalize(snapshot, event, false);
        }
    }
}
