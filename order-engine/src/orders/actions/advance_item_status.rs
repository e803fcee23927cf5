//! AdvanceItemStatus command handler
//!
//! Moves a single line item one step through `pending → preparing →
//! ready → served`. Item statuses are independent of the order status
//! except for the serving guards: an item cannot be served while the
//! order is still pending, or confirmed with nothing in preparation.
//!
//! Two concurrent advances of different items both succeed (commands
//! serialize on the write transaction); two concurrent advances of the
//! same item have exactly one winner, the loser seeing a target at or
//! behind the item's current status and failing as a concurrent
//! modification to be retried after a re-read.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, ItemStatus, OrderEvent, OrderEventType, OrderStatus};

/// AdvanceItemStatus action
#[derive(Debug, Clone)]
pub struct AdvanceItemStatusAction {
    pub order_id: String,
    pub item_id: String,
    pub target: ItemStatus,
}

#[async_trait]
impl CommandHandler for AdvanceItemStatusAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        if snapshot.status.is_terminal() {
            return Err(OrderError::OrderClosed(self.order_id.clone()));
        }

        let item = snapshot
            .item(&self.item_id)
            .ok_or_else(|| OrderError::ItemNotFound(self.item_id.clone()))?;

        if item.status.successor() == Some(self.target) {
            if self.target == ItemStatus::Served {
                if snapshot.status == OrderStatus::Pending {
                    return Err(OrderError::InvalidTransition(format!(
                        "item {} cannot be served while order {} is still pending",
                        self.item_id, self.order_id
                    )));
                }
                if snapshot.status == OrderStatus::Confirmed
                    && snapshot.items_at(ItemStatus::Preparing) == 0
                {
                    return Err(OrderError::InvalidTransition(format!(
                        "item {} cannot be served while order {} is confirmed with no items preparing",
                        self.item_id, self.order_id
                    )));
                }
            }

            let sequence = ctx.next_sequence();
            let event = OrderEvent::new(
                sequence,
                snapshot.event_context(),
                metadata.operator_id.clone(),
                metadata.operator_name.clone(),
                metadata.command_id.clone(),
                Some(metadata.timestamp),
                OrderEventType::ItemStatusAdvanced,
                EventPayload::ItemStatusAdvanced {
                    item_id: self.item_id.clone(),
                    from: item.status,
                    to: self.target,
                },
            );
            Ok(vec![event])
        } else if self.target.rank() <= item.status.rank() {
            Err(OrderError::ConcurrentModification(format!(
                "item {} is already {:?}; re-read before retrying",
                self.item_id, item.status
            )))
        } else {
            Err(OrderError::InvalidTransition(format!(
                "item {} cannot advance from {:?} to {:?}",
                self.item_id, item.status, self.target
            )))
        }
    }
}
