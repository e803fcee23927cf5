//! Shared helpers for action tests

use crate::orders::actions::CreateOrderAction;
use crate::orders::appliers::EventAction;
use crate::orders::storage::OrderStorage;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, EventApplier};
use shared::money::{Currency, Money};
use shared::order::{CartItemInput, Fulfillment, OrderSnapshot};
use shared::policy::VenuePolicy;

pub(crate) fn metadata() -> CommandMetadata {
    CommandMetadata {
        command_id: uuid::Uuid::new_v4().to_string(),
        operator_id: "op-1".to_string(),
        operator_name: "Test Operator".to_string(),
        timestamp: 1234567890,
    }
}

pub(crate) fn espresso(quantity: i32) -> CartItemInput {
    CartItemInput {
        product_name: "Espresso".to_string(),
        unit_price: Money::new(250, Currency::Eur),
        quantity,
        selected_options: Vec::new(),
        note: None,
    }
}

/// Seed a dine-in order with a default item, apply `mutate` to the
/// snapshot before storing, and return the order id
pub(crate) async fn seed_order(
    storage: &OrderStorage,
    mutate: impl FnOnce(&mut OrderSnapshot),
) -> String {
    seed_order_with(
        storage,
        Fulfillment::DineIn { table_number: 1 },
        vec![espresso(2)],
        VenuePolicy::new(Currency::Eur),
        mutate,
    )
    .await
}

pub(crate) async fn seed_order_with(
    storage: &OrderStorage,
    fulfillment: Fulfillment,
    items: Vec<CartItemInput>,
    policy: VenuePolicy,
    mutate: impl FnOnce(&mut OrderSnapshot),
) -> String {
    let txn = storage.begin_write().unwrap();
    let current = storage.get_current_sequence_txn(&txn).unwrap();
    let mut ctx = CommandContext::new(&txn, storage, current);

    let action = CreateOrderAction {
        order_number: format!("ORDTEST{}", current + 1),
        venue_id: "venue-1".to_string(),
        customer_id: "customer-1".to_string(),
        fulfillment,
        items,
        policy,
        payment_method: None,
        tip: None,
        discount: None,
        split_count: None,
        notes: None,
    };
    let events = action.execute(&mut ctx, &metadata()).await.unwrap();
    let event = &events[0];

    let mut snapshot = OrderSnapshot::new(event.order_id.clone());
    let applier: EventAction = event.into();
    applier.apply(&mut snapshot, event);
    mutate(&mut snapshot);

    storage.store_event(&txn, event).unwrap();
    storage.store_snapshot(&txn, &snapshot).unwrap();
    if snapshot.status.is_terminal() {
        storage.mark_order_inactive(&txn, &snapshot.order_id).unwrap();
    } else {
        storage.mark_order_active(&txn, &snapshot.order_id).unwrap();
    }
    storage.set_sequence(&txn, event.sequence).unwrap();
    txn.commit().unwrap();

    snapshot.order_id
}
