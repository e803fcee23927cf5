//! RequestBill command handler
//!
//! Transitions every order in the set that is not already at or past
//! `bill_requested` to `bill_requested`. Used by the open-bill aggregator
//! to request settlement for an entire tab at once. The operation is
//! all-or-nothing: if any order in the set cannot legally reach
//! `bill_requested`, no order is touched.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// RequestBill action
#[derive(Debug, Clone)]
pub struct RequestBillAction {
    pub order_ids: Vec<String>,
}

#[async_trait]
impl CommandHandler for RequestBillAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        if self.order_ids.is_empty() {
            return Err(OrderError::InvalidOperation(
                "request_bill needs at least one order".to_string(),
            ));
        }

        let mut events = Vec::new();
        let mut seen = HashSet::new();
        for order_id in &self.order_ids {
            if !seen.insert(order_id.clone()) {
                continue;
            }
            let snapshot = ctx.load_snapshot(order_id)?;

            if snapshot.status.is_terminal() {
                return Err(OrderError::OrderClosed(order_id.clone()));
            }
            // Already requested; nothing to do for this order
            if snapshot.status.rank() >= OrderStatus::BillRequested.rank() {
                continue;
            }
            if !matches!(
                snapshot.status,
                OrderStatus::Served | OrderStatus::Delivered
            ) {
                return Err(OrderError::InvalidTransition(format!(
                    "order {} cannot request the bill from {:?}",
                    order_id, snapshot.status
                )));
            }

            let sequence = ctx.next_sequence();
            events.push(OrderEvent::new(
                sequence,
                snapshot.event_context(),
                metadata.operator_id.clone(),
                metadata.operator_name.clone(),
                metadata.command_id.clone(),
                Some(metadata.timestamp),
                OrderEventType::BillRequested,
                EventPayload::BillRequested {
                    from: snapshot.status,
                },
            ));
        }

        Ok(events)
    }
}
