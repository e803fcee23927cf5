//! AddItems command handler
//!
//! Adds items to a pending order. The prospective bill is computed before
//! the event is emitted so a cart edit can never leave an order in an
//! invalid billing state.

use async_trait::async_trait;

use crate::billing::{self, validation};
use crate::orders::reducer;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{CartItemInput, EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// AddItems action
#[derive(Debug, Clone)]
pub struct AddItemsAction {
    pub order_id: String,
    pub items: Vec<CartItemInput>,
}

#[async_trait]
impl CommandHandler for AddItemsAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        if snapshot.status.is_terminal() {
            return Err(OrderError::OrderClosed(self.order_id.clone()));
        }
        if snapshot.status != OrderStatus::Pending {
            return Err(OrderError::InvalidOperation(format!(
                "items can only be added while the order is pending, not {:?}",
                snapshot.status
            )));
        }
        if self.items.is_empty() {
            return Err(OrderError::InvalidOperation("no items to add".to_string()));
        }

        let mut added = Vec::with_capacity(self.items.len());
        for input in &self.items {
            validation::validate_cart_item(input, &snapshot.policy)?;
            added.push(reducer::item_from_input(input, &snapshot.policy)?);
        }

        // Validate the prospective bill before committing to the event
        let mut candidate = snapshot.items.clone();
        candidate.extend(added.iter().cloned());
        let bill = billing::compute_bill(
            &candidate,
            &snapshot.policy,
            snapshot.fulfillment.kind(),
            snapshot.tip.as_ref(),
            snapshot.discount,
            snapshot.split_count,
        )?;
        billing::enforce_delivery_minimum(
            bill.subtotal,
            &snapshot.policy,
            snapshot.fulfillment.kind(),
        )?;

        let sequence = ctx.next_sequence();
        let event = OrderEvent::new(
            sequence,
            snapshot.event_context(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::ItemsAdded,
            EventPayload::ItemsAdded { items: added },
        );

        Ok(vec![event])
    }
}
