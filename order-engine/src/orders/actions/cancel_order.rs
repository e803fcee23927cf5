//! CancelOrder command handler
//!
//! Cancels an order with a reason. Valid from any status up to and
//! including `bill_requested`; paid and completed orders are immutable.
//! Pricing is frozen at its last computed value for the audit trail.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType};

/// CancelOrder action
#[derive(Debug, Clone)]
pub struct CancelOrderAction {
    pub order_id: String,
    pub reason: Option<String>,
}

#[async_trait]
impl CommandHandler for CancelOrderAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        if snapshot.status.is_terminal() {
            return Err(OrderError::OrderClosed(self.order_id.clone()));
        }

        let sequence = ctx.next_sequence();
        let event = OrderEvent::new(
            sequence,
            snapshot.event_context(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::OrderCancelled,
            EventPayload::OrderCancelled {
                reason: self.reason.clone(),
                final_total: snapshot.pricing.total,
            },
        );

        Ok(vec![event])
    }
}
