//! SettlePayment command handler
//!
//! Settles every order in the set: status moves to `paid`, the payment
//! flag flips, and the chosen method is recorded. Settlement is strictly
//! all-or-nothing:
//!
//! - the set must cover every active order of each tab it touches —
//!   settling a strict subset is partial settlement and is not supported;
//! - every order must be at `bill_requested`; the first order that is not
//!   fails the whole operation with its underlying transition error and
//!   nothing is mutated.

use async_trait::async_trait;
use std::collections::{BTreeSet, HashSet};

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{
    EventPayload, OrderEvent, OrderEventType, OrderSnapshot, OrderStatus, PaymentMethod,
};

/// SettlePayment action
#[derive(Debug, Clone)]
pub struct SettlePaymentAction {
    pub order_ids: Vec<String>,
    pub method: PaymentMethod,
}

#[async_trait]
impl CommandHandler for SettlePaymentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.order_ids.is_empty() {
            return Err(OrderError::InvalidOperation(
                "settle_payment needs at least one order".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut snapshots: Vec<OrderSnapshot> = Vec::new();
        for order_id in &self.order_ids {
            if seen.insert(order_id.clone()) {
                snapshots.push(ctx.load_snapshot(order_id)?);
            }
        }

        // Every tab touched must settle as one unit
        let pairs: BTreeSet<(String, String)> = snapshots
            .iter()
            .map(|s| (s.customer_id.clone(), s.venue_id.clone()))
            .collect();
        for (customer_id, venue_id) in &pairs {
            for active in ctx.active_orders_for(customer_id, venue_id)? {
                if !seen.contains(&active.order_id) {
                    return Err(OrderError::PartialSettlementNotSupported(format!(
                        "order {} belongs to the same tab but is not part of the settlement",
                        active.order_id
                    )));
                }
            }
        }

        // Validate every transition before emitting anything
        for snapshot in &snapshots {
            if snapshot.status.is_terminal() {
                return Err(OrderError::OrderClosed(snapshot.order_id.clone()));
            }
            if snapshot.status != OrderStatus::BillRequested {
                return Err(OrderError::InvalidTransition(format!(
                    "order {} cannot settle payment from {:?}",
                    snapshot.order_id, snapshot.status
                )));
            }
        }

        let mut events = Vec::with_capacity(snapshots.len());
        for snapshot in &snapshots {
            let sequence = ctx.next_sequence();
            events.push(OrderEvent::new(
                sequence,
                snapshot.event_context(),
                metadata.operator_id.clone(),
                metadata.operator_name.clone(),
                metadata.command_id.clone(),
                Some(metadata.timestamp),
                OrderEventType::PaymentSettled,
                EventPayload::PaymentSettled {
                    method: self.method,
                    amount: snapshot.pricing.total,
                },
            ));
        }

        Ok(events)
    }
}
