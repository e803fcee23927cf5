//! ItemModified event applier

use super::finalize;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// ItemModified applier
pub struct ItemModifiedApplier;

impl EventApplier for ItemModifiedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemModified {
            item_id, changes, ..
        } = &event.payload
        {
            if let Some(item) = snapshot.item_mut(item_id) {
                if let Some(quantity) = changes.quantity {
                    item.quantity = quantity;
                }
                if let Some(note) = &changes.note {
                    item.note = Some(note.clone());
                }
            }
            finalize(snapshot, event, true);
        }
    }
}
