//! ItemStatusAdvanced event applier

use super::finalize;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// ItemStatusAdvanced applier
pub struct ItemStatusAdvancedApplier;

impl EventApplier for ItemStatusAdvancedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemStatusAdvanced { item_id, to, .. } = &event.payload {
            if let Some(item) = snapshot.item_mut(item_id) {
                item.status = *to;
            }
            finalize(snapshot, event, false);
        }
    }
}
