//! BillingAdjusted event applier
//!
//! Merges the adjusted inputs into the snapshot and recomputes the whole
//! bill; fields absent from the event keep their current value.

use super::finalize;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// BillingAdjusted applier
pub struct BillingAdjustedApplier;

impl EventApplier for BillingAdjustedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::BillingAdjusted {
            tip,
            discount,
            split_count,
        } = &event.payload
        {
            if let Some(tip) = tip {
                snapshot.tip = Some(tip.clone());
            }
            if let Some(discount) = discount {
                snapshot.discount = Some(*discount);
            }
            if let Some(split_count) = split_count {
                snapshot.split_count = Some(*split_count);
            }
            finalize(snapshot, event, true);
        }
    }
}
