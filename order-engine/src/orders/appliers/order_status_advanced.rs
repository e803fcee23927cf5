//! OrderStatusAdvanced event applier

use super::finalize;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// OrderStatusAdvanced applier
pub struct OrderStatusAdvancedApplier;

impl EventApplier for OrderStatusAdvancedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderStatusAdvanced { to, .. } = &event.payload {
            snapshot.status = *to;
            finalize(snapshot, event, false);
        }
    }
}
