//! ModifyItem command handler
//!
//! Changes an item's quantity or note on a pending order. A quantity
//! below 1 turns into removal; quantities above the policy cap are
//! clamped.

use async_trait::async_trait;

use crate::billing::{self, validation};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{
    EventPayload, ItemChanges, OrderEvent, OrderEventType, OrderStatus,
};

/// ModifyItem action
#[derive(Debug, Clone)]
pub struct ModifyItemAction {
    pub order_id: String,
    pub item_id: String,
    pub changes: ItemChanges,
}

#[async_trait]
impl CommandHandler for ModifyItemAction {
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
                "items can only be modified while the order is pending, not {:?}",
                snapshot.status
            )));
        }

        let item = snapshot
            .item(&self.item_id)
            .ok_or_else(|| OrderError::ItemNotFound(self.item_id.clone()))?;

        // A quantity below 1 is a removal request
        if matches!(self.changes.quantity, Some(q) if q < 1) {
            if snapshot.items.len() == 1 {
                return Err(OrderError::InvalidOperation(
                    "an order must keep at least one item; cancel the order instead".to_string(),
                ));
            }

            let remaining: Vec<_> = snapshot
                .items
                .iter()
                .filter(|i| i.item_id != self.item_id)
                .cloned()
                .collect();
            let bill = billing::compute_bill(
                &remaining,
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
                OrderEventType::ItemRemoved,
                EventPayload::ItemRemoved {
                    item_id: self.item_id.clone(),
                    product_name: item.product_name.clone(),
                },
            );
            return Ok(vec![event]);
        }

        let previous = ItemChanges {
            quantity: Some(item.quantity),
            note: item.note.clone(),
        };
        let applied = ItemChanges {
            quantity: self
                .changes
                .quantity
                .map(|q| validation::clamp_quantity(q, &snapshot.policy)),
            note: self.changes.note.clone(),
        };

        // Validate the prospective bill with the change applied
        let mut candidate = snapshot.items.clone();
        if let Some(target) = candidate.iter_mut().find(|i| i.item_id == self.item_id) {
            if let Some(quantity) = applied.quantity {
                target.quantity = quantity;
            }
        }
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
            OrderEventType::ItemModified,
            EventPayload::ItemModified {
                item_id: self.item_id.clone(),
                changes: applied,
                previous,
            },
        );

        Ok(vec![event])
    }
}
