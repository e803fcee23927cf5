//! OrderEngine - command processing and event generation
//!
//! # Command Flow
//!
//! ```text
//! execute_command(cmd)
//!     ├─ 1. Idempotency check (command_id)
//!     ├─ 2. Pre-checks and order-number generation (CreateOrder)
//!     ├─ 3. Begin write transaction
//!     ├─ 4. Optional version guard (expected_version)
//!     ├─ 5. Convert command to action and execute
//!     ├─ 6. Apply events to snapshots via EventApplier
//!     ├─ 7. Persist events and snapshots
//!     ├─ 8. Mark command processed
//!     ├─ 9. Commit transaction
//!     ├─ 10. Broadcast event(s)
//!     └─ 11. Return response
//! ```
//!
//! Write transactions serialize all mutations, so every action validates
//! against the freshest committed state. Lost updates cannot occur;
//! callers racing on the same item or passing a stale `expected_version`
//! get a `ConcurrentModification` error and retry after a re-read.

mod error;
pub use error::*;

use crate::config::EngineConfig;
use crate::orders::actions::CommandAction;
use crate::orders::appliers::EventAction;
use crate::orders::reducer;
use crate::orders::storage::{OrderStorage, StorageError};
use crate::orders::traits::{
    CommandContext, CommandHandler, CommandMetadata, EventApplier, OrderError,
};
use crate::tabs::{self, OpenBill};
use chrono::Utc;
use shared::order::{
    CommandResponse, OrderCommand, OrderCommandPayload, OrderEvent, OrderSnapshot,
};
use std::path::Path;
use tokio::sync::broadcast;

/// OrderEngine for command processing
///
/// The `epoch` field is a unique identifier generated on each startup.
/// Clients use it to detect engine restarts and trigger a full resync.
#[derive(Clone)]
pub struct OrderEngine {
    storage: OrderStorage,
    event_tx: broadcast::Sender<OrderEvent>,
    epoch: String,
    config: EngineConfig,
}

impl std::fmt::Debug for OrderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderEngine")
            .field("storage", &"<OrderStorage>")
            .field("event_tx", &"<broadcast::Sender>")
            .field("epoch", &self.epoch)
            .finish()
    }
}

impl OrderEngine {
    /// Create an engine backed by a database at the given path
    pub fn new(db_path: impl AsRef<Path>, config: EngineConfig) -> EngineResult<Self> {
        let storage = OrderStorage::open(db_path)?;
        Ok(Self::with_storage(storage, config))
    }

    /// Create an engine backed by an in-memory database (tests and demos)
    pub fn open_in_memory(config: EngineConfig) -> EngineResult<Self> {
        let storage = OrderStorage::open_in_memory()?;
        Ok(Self::with_storage(storage, config))
    }

    /// Create an engine around existing storage
    pub fn with_storage(storage: OrderStorage, config: EngineConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_channel_capacity);
        let epoch = uuid::Uuid::new_v4().to_string();
        tracing::info!(epoch = %epoch, "order engine started with new epoch");
        Self {
            storage,
            event_tx,
            epoch,
            config,
        }
    }

    /// Engine instance epoch (unique per process start)
    pub fn epoch(&self) -> &str {
        &self.epoch
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying storage
    pub fn storage(&self) -> &OrderStorage {
        &self.storage
    }

    /// Subscribe to event broadcasts
    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.event_tx.subscribe()
    }

    /// Subscribe with a filter applied on the receiving side
    pub fn subscribe_filtered(&self, filter: crate::channel::EventFilter) -> crate::channel::Subscription {
        crate::channel::Subscription::new(self.event_tx.subscribe(), filter)
    }

    /// Generate the next order number (crash-safe via the storage counter)
    ///
    /// Combines a date stamp with a persisted counter, so two orders
    /// created in the same process tick can never collide.
    fn next_order_number(&self) -> EngineResult<String> {
        let count = self.storage.next_order_count()?;
        let date = Utc::now().format("%Y%m%d");
        Ok(format!(
            "{}{}{}",
            self.config.order_number_prefix,
            date,
            10000 + count
        ))
    }

    /// Execute a command and return the response
    pub fn execute_command(&self, cmd: OrderCommand) -> CommandResponse {
        self.execute_command_with_events(cmd).0
    }

    /// Execute a command and return both the response and generated events
    pub fn execute_command_with_events(
        &self,
        cmd: OrderCommand,
    ) -> (CommandResponse, Vec<OrderEvent>) {
        match self.process_command(cmd.clone()) {
            Ok((response, events)) => {
                // Broadcast only after a successful commit
                for event in &events {
                    if self.event_tx.send(event.clone()).is_err() {
                        tracing::warn!("event broadcast failed: no active receivers");
                        break;
                    }
                }
                (response, events)
            }
            Err(err) => (CommandResponse::error(cmd.command_id, err.into()), vec![]),
        }
    }

    /// Process a command and return the response with its events
    fn process_command(
        &self,
        cmd: OrderCommand,
    ) -> EngineResult<(CommandResponse, Vec<OrderEvent>)> {
        tracing::debug!(command_id = %cmd.command_id, "processing command");

        // 1. Idempotency check (before the transaction)
        if self.storage.is_command_processed(&cmd.command_id)? {
            tracing::warn!(command_id = %cmd.command_id, "duplicate command");
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        // 2. For CreateOrder: pre-check table availability before generating
        //    the order number, so failed opens never consume numbers, then
        //    pre-generate the number outside the write transaction (redb
        //    does not allow nested write transactions)
        if let OrderCommandPayload::CreateOrder {
            venue_id,
            fulfillment,
            ..
        } = &cmd.payload
        {
            if let Some(table_number) = fulfillment.table_number() {
                if let Some(existing) =
                    self.storage.find_active_dine_in(venue_id, table_number)?
                {
                    return Err(OrderError::TableOccupied(format!(
                        "table {} at venue {} is already occupied (order {})",
                        table_number, venue_id, existing
                    ))
                    .into());
                }
            }
        }
        let pre_generated_number = match &cmd.payload {
            OrderCommandPayload::CreateOrder { .. } => {
                let number = self.next_order_number()?;
                tracing::debug!(order_number = %number, "pre-generated order number");
                Some(number)
            }
            _ => None,
        };

        // 3. Begin the write transaction
        let txn = self.storage.begin_write()?;

        // Double-check idempotency within the transaction
        if self.storage.is_command_processed_txn(&txn, &cmd.command_id)? {
            return Ok((CommandResponse::duplicate(cmd.command_id), vec![]));
        }

        let current_sequence = self.storage.get_current_sequence_txn(&txn)?;
        let mut ctx = CommandContext::new(&txn, &self.storage, current_sequence);
        let metadata = CommandMetadata {
            command_id: cmd.command_id.clone(),
            operator_id: cmd.operator_id.clone(),
            operator_name: cmd.operator_name.clone(),
            timestamp: cmd.timestamp,
        };

        // 4. Explicit compare-and-set guard
        if let (Some(expected), Some(order_id)) =
            (cmd.expected_version, cmd.payload.primary_order_id())
        {
            let snapshot = ctx.load_snapshot(order_id)?;
            if snapshot.version != expected {
                return Err(OrderError::ConcurrentModification(format!(
                    "order {} is at version {}, expected {}",
                    order_id, snapshot.version, expected
                ))
                .into());
            }
        }

        // 5. Convert to action and execute
        let action = CommandAction::build(&cmd, pre_generated_number)?;
        let events = futures::executor::block_on(action.execute(&mut ctx, &metadata))?;

        // 6. Apply events to snapshots
        for event in &events {
            let mut snapshot = ctx
                .load_snapshot(&event.order_id)
                .unwrap_or_else(|_| OrderSnapshot::new(event.order_id.clone()));
            let applier: EventAction = event.into();
            applier.apply(&mut snapshot, event);
            ctx.save_snapshot(snapshot);
        }

        // 7. Persist events and snapshots, maintaining the active index
        for event in &events {
            self.storage.store_event(&txn, event)?;
        }
        for snapshot in ctx.modified_snapshots() {
            self.storage.store_snapshot(&txn, snapshot)?;
            if snapshot.status.is_terminal() {
                self.storage.mark_order_inactive(&txn, &snapshot.order_id)?;
            } else {
                self.storage.mark_order_active(&txn, &snapshot.order_id)?;
            }
        }

        // 8. Advance the global sequence
        let max_sequence = events
            .iter()
            .map(|e| e.sequence)
            .max()
            .unwrap_or(current_sequence);
        if max_sequence > current_sequence {
            self.storage.set_sequence(&txn, max_sequence)?;
        }

        // 9. Mark processed and commit
        self.storage.mark_command_processed(&txn, &cmd.command_id)?;
        txn.commit().map_err(StorageError::from)?;

        let order_id = events.first().map(|e| e.order_id.clone());
        tracing::info!(
            command_id = %cmd.command_id,
            order_id = ?order_id,
            event_count = events.len(),
            "command processed"
        );
        Ok((CommandResponse::success(cmd.command_id, order_id), events))
    }

    // ========== Read Paths ==========
    //
    // Pull reads return exactly the shapes the push path carries, so an
    // observer that misses notifications can always fall back to a fetch.

    /// Point read of an order snapshot
    pub fn get_order(&self, order_id: &str) -> EngineResult<Option<OrderSnapshot>> {
        Ok(self.storage.get_snapshot(order_id)?)
    }

    /// Snapshots of all active (non-terminal) orders
    pub fn get_active_orders(&self) -> EngineResult<Vec<OrderSnapshot>> {
        Ok(self.storage.get_active_orders()?)
    }

    /// All of a customer's orders, oldest first
    pub fn list_orders(&self, customer_id: &str) -> EngineResult<Vec<OrderSnapshot>> {
        let mut orders: Vec<_> = self
            .storage
            .get_all_snapshots()?
            .into_iter()
            .filter(|s| s.customer_id == customer_id)
            .collect();
        orders.sort_by_key(|s| s.created_at);
        Ok(orders)
    }

    /// Events with a sequence strictly greater than `since`
    pub fn events_since(&self, since: u64) -> EngineResult<Vec<OrderEvent>> {
        Ok(self.storage.get_events_since(since)?)
    }

    /// An order's full event stream
    pub fn events_for_order(&self, order_id: &str) -> EngineResult<Vec<OrderEvent>> {
        Ok(self.storage.get_events_for_order(order_id)?)
    }

    /// Current global sequence
    pub fn current_sequence(&self) -> EngineResult<u64> {
        Ok(self.storage.get_current_sequence()?)
    }

    /// Rebuild an order snapshot from its event stream
    pub fn rebuild_snapshot(&self, order_id: &str) -> EngineResult<Option<OrderSnapshot>> {
        let events = self.storage.get_events_for_order(order_id)?;
        Ok(reducer::replay(&events))
    }

    /// A customer's open tab at a venue, if any orders are active
    pub fn get_open_bill(
        &self,
        customer_id: &str,
        venue_id: &str,
    ) -> EngineResult<Option<OpenBill>> {
        let orders = self.storage.active_orders_for(customer_id, venue_id)?;
        Ok(tabs::build_open_bill(
            customer_id,
            venue_id,
            orders,
            shared::util::now_millis(),
            self.config.near_limit_ratio,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::money::{Currency, Money};
    use shared::order::{
        CartItemInput, CommandErrorCode, Fulfillment, ItemStatus, OrderStatus, PaymentMethod,
        PaymentStatus, Tip,
    };
    use shared::policy::VenuePolicy;

    fn engine() -> OrderEngine {
        OrderEngine::open_in_memory(EngineConfig::from_env()).unwrap()
    }

    fn cart_item(name: &str, price_minor: i64, quantity: i32) -> CartItemInput {
        CartItemInput {
            product_name: name.to_string(),
            unit_price: Money::new(price_minor, Currency::Eur),
            quantity,
            selected_options: Vec::new(),
            note: None,
        }
    }

    fn create_cmd(table: u32) -> OrderCommand {
        OrderCommand::new(
            "customer-1",
            "Customer",
            OrderCommandPayload::CreateOrder {
                venue_id: "venue-1".to_string(),
                customer_id: "customer-1".to_string(),
                fulfillment: Fulfillment::DineIn {
                    table_number: table,
                },
                items: vec![cart_item("Espresso", 250, 2)],
                policy: VenuePolicy::new(Currency::Eur),
                payment_method: None,
                tip: None,
                discount: None,
                split_count: None,
                notes: None,
            },
        )
    }

    fn advance_cmd(order_id: &str, target: OrderStatus) -> OrderCommand {
        OrderCommand::new(
            "staff-1",
            "Staff",
            OrderCommandPayload::AdvanceOrderStatus {
                order_id: order_id.to_string(),
                target,
            },
        )
    }

    #[test]
    fn test_create_order_end_to_end() {
        let engine = engine();
        let response = engine.execute_command(create_cmd(5));
        assert!(response.success, "{:?}", response.error);

        let order_id = response.order_id.unwrap();
        let snapshot = engine.get_order(&order_id).unwrap().unwrap();
        assert_eq!(snapshot.status, OrderStatus::Pending);
        assert_eq!(snapshot.payment_status, PaymentStatus::Unpaid);
        assert_eq!(snapshot.items.len(), 1);
        assert_eq!(snapshot.pricing.total, Money::new(500, Currency::Eur));
        assert!(snapshot.order_number.starts_with("ORD"));
        assert_eq!(snapshot.version, 1);
        assert_eq!(engine.current_sequence().unwrap(), 1);
    }

    #[test]
    fn test_order_numbers_never_collide() {
        let engine = engine();
        let a = engine.execute_command(create_cmd(1));
        let b = engine.execute_command(create_cmd(2));
        let na = engine
            .get_order(&a.order_id.unwrap())
            .unwrap()
            .unwrap()
            .order_number;
        let nb = engine
            .get_order(&b.order_id.unwrap())
            .unwrap()
            .unwrap()
            .order_number;
        assert_ne!(na, nb);
    }

    #[test]
    fn test_duplicate_command_is_idempotent() {
        let engine = engine();
        let cmd = create_cmd(5);
        let first = engine.execute_command(cmd.clone());
        assert!(first.success);

        // Same command id: acknowledged, no second order created
        let second = engine.execute_command(cmd);
        assert!(second.success);
        assert!(second.order_id.is_none());
        assert_eq!(engine.get_active_orders().unwrap().len(), 1);
    }

    #[test]
    fn test_table_occupied_until_cancelled() {
        let engine = engine();
        let first = engine.execute_command(create_cmd(5));
        assert!(first.success);

        let blocked = engine.execute_command(create_cmd(5));
        assert!(!blocked.success);
        assert_eq!(
            blocked.error.unwrap().code,
            CommandErrorCode::TableOccupied
        );

        let cancel = OrderCommand::new(
            "staff-1",
            "Staff",
            OrderCommandPayload::CancelOrder {
                order_id: first.order_id.unwrap(),
                reason: Some("abandoned".to_string()),
            },
        );
        assert!(engine.execute_command(cancel).success);

        let reopened = engine.execute_command(create_cmd(5));
        assert!(reopened.success);
    }

    #[test]
    fn test_expected_version_guard() {
        let engine = engine();
        let created = engine.execute_command(create_cmd(5));
        let order_id = created.order_id.unwrap();

        let stale = advance_cmd(&order_id, OrderStatus::Confirmed).with_expected_version(7);
        let response = engine.execute_command(stale);
        assert!(!response.success);
        assert_eq!(
            response.error.unwrap().code,
            CommandErrorCode::ConcurrentModification
        );

        let fresh = advance_cmd(&order_id, OrderStatus::Confirmed).with_expected_version(1);
        assert!(engine.execute_command(fresh).success);
    }

    #[test]
    fn test_events_are_broadcast_after_commit() {
        let engine = engine();
        let mut rx = engine.subscribe();

        let response = engine.execute_command(create_cmd(5));
        let order_id = response.order_id.unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.order_id, order_id);
        assert_eq!(event.sequence, 1);
        assert_eq!(event.order_version, 1);
    }

    #[test]
    fn test_failed_command_emits_nothing() {
        let engine = engine();
        let mut rx = engine.subscribe();

        let response = engine.execute_command(advance_cmd("missing", OrderStatus::Confirmed));
        assert!(!response.success);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_full_lifecycle_to_settlement() {
        let engine = engine();
        let created = engine.execute_command(create_cmd(5));
        let order_id = created.order_id.unwrap();
        let item_id = engine.get_order(&order_id).unwrap().unwrap().items[0]
            .item_id
            .clone();

        for target in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
        ] {
            assert!(engine.execute_command(advance_cmd(&order_id, target)).success);
        }

        // Kitchen finishes the item
        for target in [ItemStatus::Preparing, ItemStatus::Ready, ItemStatus::Served] {
            let cmd = OrderCommand::new(
                "kitchen-1",
                "Kitchen",
                OrderCommandPayload::AdvanceItemStatus {
                    order_id: order_id.clone(),
                    item_id: item_id.clone(),
                    target,
                },
            );
            let response = engine.execute_command(cmd);
            assert!(response.success, "{:?}", response.error);
        }

        for target in [OrderStatus::Ready, OrderStatus::Served] {
            assert!(engine.execute_command(advance_cmd(&order_id, target)).success);
        }

        let request = OrderCommand::new(
            "customer-1",
            "Customer",
            OrderCommandPayload::RequestBill {
                order_ids: vec![order_id.clone()],
            },
        );
        assert!(engine.execute_command(request).success);

        let settle = OrderCommand::new(
            "customer-1",
            "Customer",
            OrderCommandPayload::SettlePayment {
                order_ids: vec![order_id.clone()],
                method: PaymentMethod::Card,
            },
        );
        assert!(engine.execute_command(settle).success);

        let snapshot = engine.get_order(&order_id).unwrap().unwrap();
        assert_eq!(snapshot.status, OrderStatus::Paid);
        assert_eq!(snapshot.payment_status, PaymentStatus::Paid);
        assert_eq!(snapshot.payment_method, Some(PaymentMethod::Card));
        // Paid orders leave the active set
        assert!(engine.get_active_orders().unwrap().is_empty());
    }

    #[test]
    fn test_billing_adjustment_recomputes_totals() {
        let engine = engine();
        let created = engine.execute_command(create_cmd(5));
        let order_id = created.order_id.unwrap();

        let adjust = OrderCommand::new(
            "customer-1",
            "Customer",
            OrderCommandPayload::AdjustBilling {
                order_id: order_id.clone(),
                tip: Some(Tip::amount(Money::from_major(1, Currency::Eur))),
                discount: None,
                split_count: Some(2),
            },
        );
        assert!(engine.execute_command(adjust).success);

        let snapshot = engine.get_order(&order_id).unwrap().unwrap();
        // 5.00 + 1.00 tip = 6.00, split 2 → 3.00 per head
        assert_eq!(snapshot.pricing.total, Money::new(600, Currency::Eur));
        assert_eq!(
            snapshot.pricing.per_head,
            Some(Money::new(300, Currency::Eur))
        );
        assert_eq!(snapshot.version, 2);
    }

    #[test]
    fn test_read_paths_are_idempotent() {
        let engine = engine();
        let created = engine.execute_command(create_cmd(5));
        let order_id = created.order_id.unwrap();

        let first = engine.get_order(&order_id).unwrap().unwrap();
        let second = engine.get_order(&order_id).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rebuild_matches_stored_snapshot() {
        let engine = engine();
        let created = engine.execute_command(create_cmd(5));
        let order_id = created.order_id.unwrap();
        engine
            .execute_command(advance_cmd(&order_id, OrderStatus::Confirmed));

        let stored = engine.get_order(&order_id).unwrap().unwrap();
        let rebuilt = engine.rebuild_snapshot(&order_id).unwrap().unwrap();
        assert_eq!(stored.state_checksum, rebuilt.state_checksum);
        assert_eq!(stored, rebuilt);
    }
}
