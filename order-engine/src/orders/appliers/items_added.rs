//! ItemsAdded event applier

use super::finalize;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// ItemsAdded applier
pub struct ItemsAddedApplier;

impl EventApplier for ItemsAddedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemsAdded { items } = &event.payload {
            snapshot.items.extend(items.iter().cloned());
            finalize(snapshot, event, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::money::{Currency, Money};
    use shared::order::snapshot::{ItemStatus, OrderItemSnapshot};
    use shared::order::{EventContext, OrderEventType};
    use shared::policy::VenuePolicy;

    fn item(item_id: &str, price_minor: i64, quantity: i32) -> OrderItemSnapshot {
        OrderItemSnapshot {
            item_id: item_id.to_string(),
            product_name: "Product".to_string(),
            unit_price: Money::new(price_minor, Currency::Eur),
            quantity,
            selected_options: Vec::new(),
            status: ItemStatus::Pending,
            note: None,
            line_total: Money::zero(Currency::Eur),
        }
    }

    fn base_snapshot() -> OrderSnapshot {
        let mut snapshot = OrderSnapshot::new("order-1".to_string());
        snapshot.policy = VenuePolicy::new(Currency::Eur);
        snapshot.items.push(item("item-1", 1000, 1));
        snapshot.version = 1;
        snapshot
    }

    fn added_event(seq: u64, version: u64, items: Vec<OrderItemSnapshot>) -> OrderEvent {
        OrderEvent::new(
            seq,
            EventContext {
                order_id: "order-1".to_string(),
                venue_id: "venue-1".to_string(),
                customer_id: "customer-1".to_string(),
                order_version: version,
            },
            "op-1".to_string(),
            "Operator".to_string(),
            "cmd-2".to_string(),
            None,
            OrderEventType::ItemsAdded,
            EventPayload::ItemsAdded { items },
        )
    }

    #[test]
    fn test_items_are_appended_and_totals_refresh() {
        let mut snapshot = base_snapshot();
        let event = added_event(2, 2, vec![item("item-2", 1500, 2)]);
        ItemsAddedApplier.apply(&mut snapshot, &event);

        assert_eq!(snapshot.items.len(), 2);
        assert_eq!(snapshot.items[1].line_total, Money::new(3000, Currency::Eur));
        // 10.00 + 30.00
        assert_eq!(snapshot.pricing.subtotal, Money::new(4000, Currency::Eur));
        assert_eq!(snapshot.version, 2);
        assert_eq!(snapshot.last_sequence, 2);
        assert!(snapshot.verify_checksum());
    }

    #[test]
    fn test_version_and_checksum_updated() {
        let mut snapshot = base_snapshot();
        let before = snapshot.state_checksum.clone();
        let event = added_event(7, 2, vec![item("item-2", 100, 1)]);
        ItemsAddedApplier.apply(&mut snapshot, &event);

        assert_ne!(snapshot.state_checksum, before);
        assert_eq!(snapshot.last_sequence, 7);
    }
}
