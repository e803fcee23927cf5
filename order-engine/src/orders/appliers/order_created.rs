//! OrderCreated event applier
//!
//! Populates a fresh snapshot from the creation event and computes the
//! initial pricing.

use super::finalize;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus, PaymentStatus};

/// OrderCreated applier
pub struct OrderCreatedApplier;

impl EventApplier for OrderCreatedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderCreated {
            order_number,
            fulfillment,
            items,
            policy,
            payment_method,
            tip,
            discount,
            split_count,
            notes,
        } = &event.payload
        {
            snapshot.order_number = order_number.clone();
            snapshot.venue_id = event.venue_id.clone();
            snapshot.customer_id = event.customer_id.clone();
            snapshot.fulfillment = fulfillment.clone();
            snapshot.status = OrderStatus::Pending;
            snapshot.payment_status = PaymentStatus::Unpaid;
            snapshot.payment_method = *payment_method;
            snapshot.items = items.clone();
            snapshot.policy = policy.clone();
            snapshot.tip = tip.clone();
            snapshot.discount = *discount;
            snapshot.split_count = *split_count;
            snapshot.notes = notes.clone();
            snapshot.created_at = event.timestamp;

            finalize(snapshot, event, true);
        }
    }
}
