//! BillRequested event applier

use super::finalize;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// BillRequested applier
pub struct BillRequestedApplier;

impl EventApplier for BillRequestedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::BillRequested { .. } = &event.payload {
            snapshot.status = OrderStatus::BillRequested;
            finalize(snapshot, event, false);
        }
    }
}
