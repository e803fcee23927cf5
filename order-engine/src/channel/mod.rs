//! Change propagation channel
//!
//! The engine broadcasts every committed event. Delivery to a live
//! subscriber is at-least-once and ordered per order; the reconciliation
//! rule observers must apply lives in `OrderObserver`: an update whose
//! per-order version is not strictly greater than the last applied one is
//! dropped, and any detected gap flips the observer into
//! needs-full-sync so it re-fetches through the pull path.

use shared::order::{OrderEvent, OrderEventType, OrderSnapshot};
use std::collections::HashMap;
use tokio::sync::broadcast;

use crate::orders::appliers::EventAction;
use crate::orders::sync::SyncResponse;
use crate::orders::traits::EventApplier;

/// Subscription filter; `None` fields match everything
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub order_id: Option<String>,
    pub venue_id: Option<String>,
    pub customer_id: Option<String>,
}

impl EventFilter {
    /// Match all events
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_order(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            ..Self::default()
        }
    }

    pub fn for_venue(venue_id: impl Into<String>) -> Self {
        Self {
            venue_id: Some(venue_id.into()),
            ..Self::default()
        }
    }

    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: Some(customer_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, event: &OrderEvent) -> bool {
        if let Some(order_id) = &self.order_id {
            if &event.order_id != order_id {
                return false;
            }
        }
        if let Some(venue_id) = &self.venue_id {
            if &event.venue_id != venue_id {
                return false;
            }
        }
        if let Some(customer_id) = &self.customer_id {
            if &event.customer_id != customer_id {
                return false;
            }
        }
        true
    }
}

/// A filtered event subscription
///
/// A `Lagged` receive error means the subscriber fell behind the
/// broadcast buffer and must fall back to a sync re-fetch.
pub struct Subscription {
    rx: broadcast::Receiver<OrderEvent>,
    filter: EventFilter,
}

impl Subscription {
    pub fn new(rx: broadcast::Receiver<OrderEvent>, filter: EventFilter) -> Self {
        Self { rx, filter }
    }

    /// Receive the next matching event
    pub async fn recv(&mut self) -> Result<OrderEvent, broadcast::error::RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive of the next matching event
    pub fn try_recv(&mut self) -> Result<OrderEvent, broadcast::error::TryRecvError> {
        loop {
            let event = self.rx.try_recv()?;
            if self.filter.matches(&event) {
                return Ok(event);
            }
        }
    }
}

/// Outcome of feeding one event to an observer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverOutcome {
    /// The event advanced the local view
    Applied,
    /// The event was at or behind the local version and was dropped
    Stale,
    /// An intermediate update was missed; a full sync is required
    Gap,
}

/// Client-side order view maintained from the event stream
///
/// Uses the same appliers as the engine, so an observer that applies
/// every event in order converges on exactly the server's snapshots
/// (verifiable via `state_checksum`).
#[derive(Default)]
pub struct OrderObserver {
    orders: HashMap<String, OrderSnapshot>,
    last_sequence: u64,
    needs_full_sync: bool,
}

impl OrderObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one event into the local view, applying the version rule
    pub fn apply_event(&mut self, event: &OrderEvent) -> ObserverOutcome {
        let outcome = match self.orders.get_mut(&event.order_id) {
            Some(snapshot) => {
                if event.order_version <= snapshot.version {
                    return ObserverOutcome::Stale;
                }
                if event.order_version > snapshot.version + 1 {
                    self.needs_full_sync = true;
                    return ObserverOutcome::Gap;
                }
                let applier: EventAction = event.into();
                applier.apply(snapshot, event);
                ObserverOutcome::Applied
            }
            None => {
                if event.event_type != OrderEventType::OrderCreated || event.order_version != 1 {
                    // First sight of the order mid-stream: the creation
                    // event was missed
                    self.needs_full_sync = true;
                    return ObserverOutcome::Gap;
                }
                let mut snapshot = OrderSnapshot::new(event.order_id.clone());
                let applier: EventAction = event.into();
                applier.apply(&mut snapshot, event);
                self.orders.insert(event.order_id.clone(), snapshot);
                ObserverOutcome::Applied
            }
        };
        self.last_sequence = self.last_sequence.max(event.sequence);
        outcome
    }

    /// Absorb a sync response, replacing state on a full sync
    pub fn apply_sync(&mut self, response: &SyncResponse) {
        if response.requires_full_sync {
            self.orders = response
                .active_orders
                .iter()
                .map(|s| (s.order_id.clone(), s.clone()))
                .collect();
            self.needs_full_sync = false;
            self.last_sequence = response.server_sequence;
            return;
        }
        for event in &response.events {
            self.apply_event(event);
        }
        self.last_sequence = self.last_sequence.max(response.server_sequence);
    }

    pub fn get(&self, order_id: &str) -> Option<&OrderSnapshot> {
        self.orders.get(order_id)
    }

    pub fn orders(&self) -> impl Iterator<Item = &OrderSnapshot> {
        self.orders.values()
    }

    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    pub fn needs_full_sync(&self) -> bool {
        self.needs_full_sync
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::money::{Currency, Money};
    use shared::order::{
        CartItemInput, EventContext, EventPayload, Fulfillment, OrderStatus,
    };
    use shared::policy::VenuePolicy;

    fn created_event(order_id: &str, sequence: u64) -> OrderEvent {
        OrderEvent::new(
            sequence,
            EventContext {
                order_id: order_id.to_string(),
                venue_id: "venue-1".to_string(),
                customer_id: "customer-1".to_string(),
                order_version: 1,
            },
            "op-1".to_string(),
            "Operator".to_string(),
            format!("cmd-{sequence}"),
            None,
            OrderEventType::OrderCreated,
            EventPayload::OrderCreated {
                order_number: format!("ORD{sequence}"),
                fulfillment: Fulfillment::DineIn { table_number: 1 },
                items: vec![crate::orders::reducer::item_from_input(
                    &CartItemInput {
                        product_name: "Espresso".to_string(),
                        unit_price: Money::new(250, Currency::Eur),
                        quantity: 1,
                        selected_options: Vec::new(),
                        note: None,
                    },
                    &VenuePolicy::new(Currency::Eur),
                )
                .unwrap()],
                policy: VenuePolicy::new(Currency::Eur),
                payment_method: None,
                tip: None,
                discount: None,
                split_count: None,
                notes: None,
            },
        )
    }

    fn status_event(order_id: &str, sequence: u64, version: u64, to: OrderStatus) -> OrderEvent {
        OrderEvent::new(
            sequence,
            EventContext {
                order_id: order_id.to_string(),
                venue_id: "venue-1".to_string(),
                customer_id: "customer-1".to_string(),
                order_version: version,
            },
            "op-1".to_string(),
            "Operator".to_string(),
            format!("cmd-{sequence}"),
            None,
            OrderEventType::OrderStatusAdvanced,
            EventPayload::OrderStatusAdvanced {
                from: OrderStatus::Pending,
                to,
            },
        )
    }

    #[test]
    fn test_filter_matching() {
        let event = created_event("order-1", 1);

        assert!(EventFilter::all().matches(&event));
        assert!(EventFilter::for_order("order-1").matches(&event));
        assert!(!EventFilter::for_order("order-2").matches(&event));
        assert!(EventFilter::for_venue("venue-1").matches(&event));
        assert!(EventFilter::for_customer("customer-1").matches(&event));
        assert!(!EventFilter::for_customer("customer-2").matches(&event));
    }

    #[test]
    fn test_observer_applies_in_order() {
        let mut observer = OrderObserver::new();
        assert_eq!(
            observer.apply_event(&created_event("order-1", 1)),
            ObserverOutcome::Applied
        );
        assert_eq!(
            observer.apply_event(&status_event("order-1", 2, 2, OrderStatus::Confirmed)),
            ObserverOutcome::Applied
        );

        let view = observer.get("order-1").unwrap();
        assert_eq!(view.status, OrderStatus::Confirmed);
        assert_eq!(view.version, 2);
        assert_eq!(observer.last_sequence(), 2);
    }

    #[test]
    fn test_observer_drops_stale_and_redelivered_updates() {
        let mut observer = OrderObserver::new();
        observer.apply_event(&created_event("order-1", 1));
        let advance = status_event("order-1", 2, 2, OrderStatus::Confirmed);
        observer.apply_event(&advance);

        // At-least-once delivery: the same event arrives again
        assert_eq!(observer.apply_event(&advance), ObserverOutcome::Stale);
        // An older update arriving late must never regress the status
        let stale = status_event("order-1", 1, 1, OrderStatus::Pending);
        assert_eq!(observer.apply_event(&stale), ObserverOutcome::Stale);
        assert_eq!(
            observer.get("order-1").unwrap().status,
            OrderStatus::Confirmed
        );
    }

    #[test]
    fn test_observer_detects_gap() {
        let mut observer = OrderObserver::new();
        observer.apply_event(&created_event("order-1", 1));

        // Version 3 arrives but version 2 was never seen
        let gap = status_event("order-1", 3, 3, OrderStatus::Preparing);
        assert_eq!(observer.apply_event(&gap), ObserverOutcome::Gap);
        assert!(observer.needs_full_sync());
        // The local view is untouched
        assert_eq!(observer.get("order-1").unwrap().version, 1);
    }

    #[test]
    fn test_observer_detects_missed_creation() {
        let mut observer = OrderObserver::new();
        let mid_stream = status_event("order-9", 5, 4, OrderStatus::Preparing);
        assert_eq!(observer.apply_event(&mid_stream), ObserverOutcome::Gap);
        assert!(observer.needs_full_sync());
    }

    #[test]
    fn test_full_sync_replaces_state() {
        let mut observer = OrderObserver::new();
        observer.apply_event(&created_event("order-1", 1));
        observer.apply_event(&status_event("order-1", 3, 3, OrderStatus::Preparing));
        assert!(observer.needs_full_sync());

        let mut fresh = OrderSnapshot::new("order-1".to_string());
        fresh.status = OrderStatus::Preparing;
        fresh.version = 3;
        let response = SyncResponse::full_sync(vec![fresh], 3, "epoch-1".to_string());
        observer.apply_sync(&response);

        assert!(!observer.needs_full_sync());
        assert_eq!(observer.last_sequence(), 3);
        assert_eq!(
            observer.get("order-1").unwrap().status,
            OrderStatus::Preparing
        );
    }

    #[test]
    fn test_independent_orders_are_unordered() {
        // Events of different orders may interleave arbitrarily
        let mut observer = OrderObserver::new();
        observer.apply_event(&created_event("order-2", 2));
        observer.apply_event(&created_event("order-1", 1));
        assert!(observer.get("order-1").is_some());
        assert!(observer.get("order-2").is_some());
        assert!(!observer.needs_full_sync());
    }
}
