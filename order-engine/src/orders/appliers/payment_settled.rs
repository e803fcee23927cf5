//! PaymentSettled event applier

use super::finalize;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus, PaymentStatus};

/// PaymentSettled applier
pub struct PaymentSettledApplier;

impl EventApplier for PaymentSettledApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::PaymentSettled { method, .. } = &event.payload {
            snapshot.status = OrderStatus::Paid;
            snapshot.payment_status = PaymentStatus::Paid;
            snapshot.payment_method = Some(*method);
            finalize(snapshot, event, false);
        }
    }
}
