//! redb-based storage layer for order event sourcing
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `events` | `(order_id, sequence)` | `OrderEvent` | Event stream (append-only) |
//! | `snapshots` | `order_id` | `OrderSnapshot` | Snapshot cache |
//! | `active_orders` | `order_id` | `()` | Active order index |
//! | `processed_commands` | `command_id` | `()` | Idempotency check |
//! | `counters` | `"seq"` / `"order_count"` | `u64` | Global sequence, order numbering |
//!
//! # Durability
//!
//! redb commits are persistent as soon as `commit()` returns, with
//! copy-on-write atomic swaps, so the database file stays consistent
//! across unexpected shutdowns. Write transactions serialize all
//! mutations, which is what makes command processing safe under
//! concurrent callers.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use shared::order::{OrderEvent, OrderSnapshot};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Event stream: key = (order_id, sequence), value = JSON-serialized OrderEvent
const EVENTS_TABLE: TableDefinition<(&str, u64), &[u8]> = TableDefinition::new("events");

/// Snapshots: key = order_id, value = JSON-serialized OrderSnapshot
const SNAPSHOTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("snapshots");

/// Active orders: key = order_id, value = empty (existence check)
const ACTIVE_ORDERS_TABLE: TableDefinition<&str, ()> = TableDefinition::new("active_orders");

/// Processed commands: key = command_id, value = empty (idempotency)
const PROCESSED_COMMANDS_TABLE: TableDefinition<&str, ()> =
    TableDefinition::new("processed_commands");

/// Counters: key = "seq" or "order_count", value = u64
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const SEQUENCE_KEY: &str = "seq";
const ORDER_COUNT_KEY: &str = "order_count";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Order storage backed by redb
#[derive(Clone)]
pub struct OrderStorage {
    db: Arc<Database>,
}

impl OrderStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    /// Open an in-memory database (tests and demos)
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        let storage = Self { db: Arc::new(db) };
        storage.init_tables()?;
        Ok(storage)
    }

    fn init_tables(&self) -> StorageResult<()> {
        let txn = self.db.begin_write()?;
        {
            let _ = txn.open_table(EVENTS_TABLE)?;
            let _ = txn.open_table(SNAPSHOTS_TABLE)?;
            let _ = txn.open_table(ACTIVE_ORDERS_TABLE)?;
            let _ = txn.open_table(PROCESSED_COMMANDS_TABLE)?;

            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            if counters.get(SEQUENCE_KEY)?.is_none() {
                counters.insert(SEQUENCE_KEY, 0u64)?;
            }
            if counters.get(ORDER_COUNT_KEY)?.is_none() {
                counters.insert(ORDER_COUNT_KEY, 0u64)?;
            }
        }
        txn.commit()?;
        Ok(())
    }

    /// Begin a write transaction
    ///
    /// Blocks until any in-flight write transaction commits, serializing
    /// all mutations.
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    // ========== Sequence Operations ==========

    /// Current global sequence (committed state)
    pub fn get_current_sequence(&self) -> StorageResult<u64> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(COUNTERS_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Current global sequence as seen by a write transaction
    pub fn get_current_sequence_txn(&self, txn: &WriteTransaction) -> StorageResult<u64> {
        let table = txn.open_table(COUNTERS_TABLE)?;
        Ok(table
            .get(SEQUENCE_KEY)?
            .map(|guard| guard.value())
            .unwrap_or(0))
    }

    /// Persist the global sequence within a transaction
    pub fn set_sequence(&self, txn: &WriteTransaction, sequence: u64) -> StorageResult<()> {
        let mut table = txn.open_table(COUNTERS_TABLE)?;
        table.insert(SEQUENCE_KEY, sequence)?;
        Ok(())
    }

    /// Increment and return the order counter (crash-safe, own transaction)
    pub fn next_order_count(&self) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let next = {
            let mut table = txn.open_table(COUNTERS_TABLE)?;
            let current = table
                .get(ORDER_COUNT_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            let next = current + 1;
            table.insert(ORDER_COUNT_KEY, next)?;
            next
        };
        txn.commit()?;
        Ok(next)
    }

    // ========== Command Idempotency ==========

    pub fn is_command_processed(&self, command_id: &str) -> StorageResult<bool> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    pub fn is_command_processed_txn(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<bool> {
        let table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        Ok(table.get(command_id)?.is_some())
    }

    pub fn mark_command_processed(
        &self,
        txn: &WriteTransaction,
        command_id: &str,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(PROCESSED_COMMANDS_TABLE)?;
        table.insert(command_id, ())?;
        Ok(())
    }

    // ========== Events ==========

    /// Append an event within a transaction
    pub fn store_event(&self, txn: &WriteTransaction, event: &OrderEvent) -> StorageResult<()> {
        let bytes = serde_json::to_vec(event)?;
        let mut table = txn.open_table(EVENTS_TABLE)?;
        table.insert((event.order_id.as_str(), event.sequence), bytes.as_slice())?;
        Ok(())
    }

    /// All events for an order, ordered by sequence
    pub fn get_events_for_order(&self, order_id: &str) -> StorageResult<Vec<OrderEvent>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(EVENTS_TABLE)?;
        let mut events = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            if key.value().0 == order_id {
                events.push(serde_json::from_slice(value.value())?);
            }
        }
        events.sort_by_key(|e: &OrderEvent| e.sequence);
        Ok(events)
    }

    /// All events with a sequence strictly greater than `since`, ordered
    pub fn get_events_since(&self, since: u64) -> StorageResult<Vec<OrderEvent>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(EVENTS_TABLE)?;
        let mut events = Vec::new();
        for entry in table.iter()? {
            let (key, value) = entry?;
            if key.value().1 > since {
                events.push(serde_json::from_slice(value.value())?);
            }
        }
        events.sort_by_key(|e: &OrderEvent| e.sequence);
        Ok(events)
    }

    // ========== Snapshots ==========

    /// Store a snapshot within a transaction
    pub fn store_snapshot(
        &self,
        txn: &WriteTransaction,
        snapshot: &OrderSnapshot,
    ) -> StorageResult<()> {
        let bytes = serde_json::to_vec(snapshot)?;
        let mut table = txn.open_table(SNAPSHOTS_TABLE)?;
        table.insert(snapshot.order_id.as_str(), bytes.as_slice())?;
        Ok(())
    }

    /// Load a snapshot from committed state
    pub fn get_snapshot(&self, order_id: &str) -> StorageResult<Option<OrderSnapshot>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SNAPSHOTS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Load a snapshot as seen by a write transaction (includes its own
    /// uncommitted writes)
    pub fn get_snapshot_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<OrderSnapshot>> {
        let table = txn.open_table(SNAPSHOTS_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// All stored snapshots (active and closed)
    pub fn get_all_snapshots(&self) -> StorageResult<Vec<OrderSnapshot>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(SNAPSHOTS_TABLE)?;
        let mut snapshots = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            snapshots.push(serde_json::from_slice(value.value())?);
        }
        Ok(snapshots)
    }

    // ========== Active Order Index ==========

    pub fn mark_order_active(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        table.insert(order_id, ())?;
        Ok(())
    }

    pub fn mark_order_inactive(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<()> {
        let mut table = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        table.remove(order_id)?;
        Ok(())
    }

    pub fn get_active_order_ids(&self) -> StorageResult<Vec<String>> {
        let txn = self.db.begin_read()?;
        let table = txn.open_table(ACTIVE_ORDERS_TABLE)?;
        let mut ids = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            ids.push(key.value().to_string());
        }
        Ok(ids)
    }

    /// Snapshots of all active (non-terminal) orders
    pub fn get_active_orders(&self) -> StorageResult<Vec<OrderSnapshot>> {
        let mut orders = Vec::new();
        for id in self.get_active_order_ids()? {
            if let Some(snapshot) = self.get_snapshot(&id)? {
                orders.push(snapshot);
            }
        }
        orders.sort_by_key(|s| s.created_at);
        Ok(orders)
    }

    /// Find the active dine-in order occupying a table, if any
    pub fn find_active_dine_in(
        &self,
        venue_id: &str,
        table_number: u32,
    ) -> StorageResult<Option<String>> {
        for snapshot in self.get_active_orders()? {
            if snapshot.venue_id == venue_id
                && snapshot.fulfillment.table_number() == Some(table_number)
            {
                return Ok(Some(snapshot.order_id));
            }
        }
        Ok(None)
    }

    /// Active orders for a customer at a venue (the customer's open tab)
    pub fn active_orders_for(
        &self,
        customer_id: &str,
        venue_id: &str,
    ) -> StorageResult<Vec<OrderSnapshot>> {
        Ok(self
            .get_active_orders()?
            .into_iter()
            .filter(|s| s.customer_id == customer_id && s.venue_id == venue_id)
            .collect())
    }
}
