//! RemoveItem command handler
//!
//! Removes an item from a pending order. The last item cannot be removed;
//! an order with no items is not a valid aggregate.

use async_trait::async_trait;

use crate::billing;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// RemoveItem action
#[derive(Debug, Clone)]
pub struct RemoveItemAction {
    pub order_id: String,
    pub item_id: String,
}

#[async_trait]
impl CommandHandler for RemoveItemAction {
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
                "items can only be removed while the order is pending, not {:?}",
                snapshot.status
            )));
        }

        let item = snapshot
            .item(&self.item_id)
            .ok_or_else(|| OrderError::ItemNotFound(self.item_id.clone()))?;

        if snapshot.items.len() == 1 {
            return Err(OrderError::InvalidOperation(
                "an order must keep at least one item; cancel the order instead".to_string(),
            ));
        }

        // The delivery minimum still holds after the removal
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

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::actions::test_support::{espresso, metadata, seed_order, seed_order_with};
    use crate::orders::storage::OrderStorage;
    use shared::money::{Currency, Money};
    use shared::order::{CartItemInput, Fulfillment};
    use shared::policy::VenuePolicy;

    fn tea() -> CartItemInput {
        CartItemInput {
            product_name: "Tea".to_string(),
            unit_price: Money::new(200, Currency::Eur),
            quantity: 1,
            selected_options: Vec::new(),
            note: None,
        }
    }

    #[tokio::test]
    async fn test_remove_item() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order_with(
            &storage,
            Fulfillment::DineIn { table_number: 1 },
            vec![espresso(1), tea()],
            VenuePolicy::new(Currency::Eur),
            |_| {},
        )
        .await;
        let snapshot = storage.get_snapshot(&order_id).unwrap().unwrap();
        let item_id = snapshot.items[1].item_id.clone();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 1);
        let action = RemoveItemAction {
            order_id,
            item_id: item_id.clone(),
        };
        let events = action.execute(&mut ctx, &metadata()).await.unwrap();

        assert_eq!(events[0].event_type, OrderEventType::ItemRemoved);
        if let EventPayload::ItemRemoved {
            item_id: removed,
            product_name,
        } = &events[0].payload
        {
            assert_eq!(removed, &item_id);
            assert_eq!(product_name, "Tea");
        } else {
            panic!("Expected ItemRemoved payload");
        }
    }

    #[tokio::test]
    async fn test_remove_last_item_rejected() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order(&storage, |_| {}).await;
        let item_id = storage.get_snapshot(&order_id).unwrap().unwrap().items[0]
            .item_id
            .clone();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 1);
        let action = RemoveItemAction { order_id, item_id };
        let result = action.execute(&mut ctx, &metadata()).await;
        assert!(matches!(result, Err(OrderError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_remove_unknown_item() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order(&storage, |_| {}).await;

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 1);
        let action = RemoveItemAction {
            order_id,
            item_id: "missing".to_string(),
        };
        let result = action.execute(&mut ctx, &metadata()).await;
        assert!(matches!(result, Err(OrderError::ItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_remove_rejected_after_confirmation() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order_with(
            &storage,
            Fulfillment::DineIn { table_number: 1 },
            vec![espresso(1), tea()],
            VenuePolicy::new(Currency::Eur),
            |s| s.status = shared::order::OrderStatus::Confirmed,
        )
        .await;
        let item_id = storage.get_snapshot(&order_id).unwrap().unwrap().items[0]
            .item_id
            .clone();

        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 1);
        let action = RemoveItemAction { order_id, item_id };
        let result = action.execute(&mut ctx, &metadata()).await;
        assert!(matches!(result, Err(OrderError::InvalidOperation(_))));
    }
}
