//! AdvanceOrderStatus command handler
//!
//! Moves an order one step forward through its status graph. Cancellation
//! is always a valid direct edge from non-terminal states; every other
//! target must be the direct successor of the current status.
//!
//! A target at or behind the current status means the caller validated
//! against a stale read and a concurrent update won the race, so it is
//! reported as a concurrent modification the caller retries by
//! re-reading. A target further ahead is a genuine skip and stays an
//! invalid transition.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, ItemStatus, OrderEvent, OrderEventType, OrderStatus};

/// AdvanceOrderStatus action
#[derive(Debug, Clone)]
pub struct AdvanceOrderStatusAction {
    pub order_id: String,
    pub target: OrderStatus,
}

#[async_trait]
impl CommandHandler for AdvanceOrderStatusAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;
        let status = snapshot.status;

        // Closed orders reject everything except the paid → completed close
        if status == OrderStatus::Completed || status == OrderStatus::Cancelled {
            return Err(OrderError::OrderClosed(self.order_id.clone()));
        }
        if status == OrderStatus::Paid && self.target != OrderStatus::Completed {
            return Err(OrderError::OrderClosed(self.order_id.clone()));
        }

        // Cancellation through the status graph carries no reason
        if self.target == OrderStatus::Cancelled {
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
                    reason: None,
                    final_total: snapshot.pricing.total,
                },
            );
            return Ok(vec![event]);
        }

        // Paid is reached through settlement, which also flips payment state
        if self.target == OrderStatus::Paid {
            return Err(OrderError::InvalidOperation(
                "orders are marked paid through settle_payment".to_string(),
            ));
        }

        let kind = snapshot.fulfillment.kind();
        if status.successor(kind) == Some(self.target) {
            // An order is not done until its items are: no serving while
            // anything is still pending
            if matches!(self.target, OrderStatus::Served | OrderStatus::Delivered) {
                let pending = snapshot.items_at(ItemStatus::Pending);
                if pending > 0 {
                    return Err(OrderError::InvalidTransition(format!(
                        "order {} cannot be {:?} with {} item(s) still pending",
                        self.order_id, self.target, pending
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
                OrderEventType::OrderStatusAdvanced,
                EventPayload::OrderStatusAdvanced {
                    from: status,
                    to: self.target,
                },
            );
            Ok(vec![event])
        } else if self.target.rank() <= status.rank() {
            Err(OrderError::ConcurrentModification(format!(
                "order {} is already {:?}; re-read before retrying",
                self.order_id, status
            )))
        } else {
            Err(OrderError::InvalidTransition(format!(
                "order {} cannot advance from {:?} to {:?}",
                self.order_id, status, self.target
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::actions::test_support::{metadata, seed_order, seed_order_with};
    use crate::orders::storage::OrderStorage;
    use shared::money::Currency;
    use shared::order::Fulfillment;
    use shared::policy::VenuePolicy;

    async fn advance(
        storage: &OrderStorage,
        order_id: &str,
        target: OrderStatus,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let txn = storage.begin_write().unwrap();
        let current = storage.get_current_sequence_txn(&txn).unwrap();
        let mut ctx = CommandContext::new(&txn, storage, current);
        let action = AdvanceOrderStatusAction {
            order_id: order_id.to_string(),
            target,
        };
        action.execute(&mut ctx, &metadata()).await
    }

    #[tokio::test]
    async fn test_advance_pending_to_confirmed() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order(&storage, |_| {}).await;

        let events = advance(&storage, &order_id, OrderStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(events[0].event_type, OrderEventType::OrderStatusAdvanced);
        if let EventPayload::OrderStatusAdvanced { from, to } = &events[0].payload {
            assert_eq!(*from, OrderStatus::Pending);
            assert_eq!(*to, OrderStatus::Confirmed);
        } else {
            panic!("Expected OrderStatusAdvanced payload");
        }
    }

    #[tokio::test]
    async fn test_skip_is_invalid_transition() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order(&storage, |_| {}).await;

        let result = advance(&storage, &order_id, OrderStatus::Ready).await;
        assert!(matches!(result, Err(OrderError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_stale_advance_is_concurrent_modification() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order(&storage, |s| s.status = OrderStatus::Preparing).await;

        // A second caller still holding the pending→confirmed view
        let result = advance(&storage, &order_id, OrderStatus::Confirmed).await;
        assert!(matches!(
            result,
            Err(OrderError::ConcurrentModification(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_edge_always_available_before_terminal() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order(&storage, |s| s.status = OrderStatus::Preparing).await;

        let events = advance(&storage, &order_id, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert_eq!(events[0].event_type, OrderEventType::OrderCancelled);
    }

    #[tokio::test]
    async fn test_delivery_branch() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order_with(
            &storage,
            Fulfillment::Delivery {
                delivery_address: "Calle Mayor 1".to_string(),
            },
            vec![crate::orders::actions::test_support::espresso(1)],
            VenuePolicy::new(Currency::Eur),
            |s| {
                s.status = OrderStatus::Ready;
                for item in &mut s.items {
                    item.status = shared::order::ItemStatus::Served;
                }
            },
        )
        .await;

        // Delivery orders go ready → delivered, not served
        let result = advance(&storage, &order_id, OrderStatus::Served).await;
        assert!(matches!(result, Err(OrderError::InvalidTransition(_))));

        let events = advance(&storage, &order_id, OrderStatus::Delivered)
            .await
            .unwrap();
        if let EventPayload::OrderStatusAdvanced { to, .. } = &events[0].payload {
            assert_eq!(*to, OrderStatus::Delivered);
        } else {
            panic!("Expected OrderStatusAdvanced payload");
        }
    }

    #[tokio::test]
    async fn test_cannot_serve_with_pending_items() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order(&storage, |s| {
            s.status = OrderStatus::Ready;
            // Items left pending on purpose
        })
        .await;

        let result = advance(&storage, &order_id, OrderStatus::Served).await;
        assert!(matches!(result, Err(OrderError::InvalidTransition(_))));
    }

    #[tokio::test]
    async fn test_paid_allows_only_completion() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order(&storage, |s| s.status = OrderStatus::Paid).await;

        let result = advance(&storage, &order_id, OrderStatus::Cancelled).await;
        assert!(matches!(result, Err(OrderError::OrderClosed(_))));

        let events = advance(&storage, &order_id, OrderStatus::Completed)
            .await
            .unwrap();
        if let EventPayload::OrderStatusAdvanced { to, .. } = &events[0].payload {
            assert_eq!(*to, OrderStatus::Completed);
        } else {
            panic!("Expected OrderStatusAdvanced payload");
        }
    }

    #[tokio::test]
    async fn test_completed_is_closed() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order(&storage, |s| s.status = OrderStatus::Completed).await;

        let result = advance(&storage, &order_id, OrderStatus::Completed).await;
        assert!(matches!(result, Err(OrderError::OrderClosed(_))));
    }

    #[tokio::test]
    async fn test_direct_paid_advance_rejected() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let order_id = seed_order(&storage, |s| s.status = OrderStatus::BillRequested).await;

        let result = advance(&storage, &order_id, OrderStatus::Paid).await;
        assert!(matches!(result, Err(OrderError::InvalidOperation(_))));
    }
}
