//! Core traits and errors of the command/event pipeline
//!
//! Commands are handled by `CommandHandler` actions that validate against
//! current state and produce events; `EventApplier`s fold events into
//! snapshots and must stay pure so replay is deterministic.

use crate::orders::appliers::{
    BillRequestedApplier, BillingAdjustedApplier, EventAction, ItemModifiedApplier,
    ItemRemovedApplier, ItemStatusAdvancedApplier, ItemsAddedApplier, OrderCancelledApplier,
    OrderCreatedApplier, OrderStatusAdvancedApplier, PaymentSettledApplier,
};
use crate::orders::storage::{OrderStorage, StorageError};
use async_trait::async_trait;
use enum_dispatch::enum_dispatch;
use redb::WriteTransaction;
use shared::money::MoneyError;
use shared::order::{CommandErrorCode, OrderEvent, OrderSnapshot};
use std::collections::HashMap;
use thiserror::Error;

/// Action-level errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("order is closed: {0}")]
    OrderClosed(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("item not found: {0}")]
    ItemNotFound(String),

    #[error("cart is empty")]
    EmptyCart,

    #[error("missing fulfillment details: {0}")]
    MissingFulfillmentDetails(String),

    #[error("minimum order not met: {0}")]
    MinimumOrderNotMet(String),

    #[error("table occupied: {0}")]
    TableOccupied(String),

    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),

    #[error("partial settlement not supported: {0}")]
    PartialSettlementNotSupported(String),

    #[error("currency mismatch: {0}")]
    CurrencyMismatch(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl OrderError {
    /// Wire-level error code for this error
    pub fn code(&self) -> CommandErrorCode {
        match self {
            OrderError::OrderNotFound(_) => CommandErrorCode::OrderNotFound,
            OrderError::OrderClosed(_) => CommandErrorCode::OrderClosed,
            OrderError::InvalidTransition(_) => CommandErrorCode::InvalidTransition,
            OrderError::ItemNotFound(_) => CommandErrorCode::ItemNotFound,
            OrderError::EmptyCart => CommandErrorCode::EmptyCart,
            OrderError::MissingFulfillmentDetails(_) => {
                CommandErrorCode::MissingFulfillmentDetails
            }
            OrderError::MinimumOrderNotMet(_) => CommandErrorCode::MinimumOrderNotMet,
            OrderError::TableOccupied(_) => CommandErrorCode::TableOccupied,
            OrderError::ConcurrentModification(_) => CommandErrorCode::ConcurrentModification,
            OrderError::PartialSettlementNotSupported(_) => {
                CommandErrorCode::PartialSettlementNotSupported
            }
            OrderError::CurrencyMismatch(_) => CommandErrorCode::CurrencyMismatch,
            OrderError::InvalidOperation(_) => CommandErrorCode::InvalidOperation,
            OrderError::Storage(_) => CommandErrorCode::InternalError,
        }
    }
}

impl From<MoneyError> for OrderError {
    fn from(err: MoneyError) -> Self {
        match err {
            MoneyError::CurrencyMismatch { .. } => OrderError::CurrencyMismatch(err.to_string()),
            MoneyError::AmountOverflow => OrderError::InvalidOperation(err.to_string()),
        }
    }
}

impl From<StorageError> for OrderError {
    fn from(err: StorageError) -> Self {
        OrderError::Storage(err.to_string())
    }
}

/// Metadata extracted from the triggering command
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub command_id: String,
    pub operator_id: String,
    pub operator_name: String,
    /// Client timestamp (Unix milliseconds)
    pub timestamp: i64,
}

/// Per-command execution context
///
/// Gives actions a consistent view of state: snapshots modified earlier in
/// the same command shadow the stored ones, and sequence numbers are
/// allocated monotonically from the transaction's starting point.
pub struct CommandContext<'a> {
    txn: &'a WriteTransaction,
    storage: &'a OrderStorage,
    next_seq: u64,
    snapshots: HashMap<String, OrderSnapshot>,
}

impl<'a> CommandContext<'a> {
    pub fn new(txn: &'a WriteTransaction, storage: &'a OrderStorage, current_sequence: u64) -> Self {
        Self {
            txn,
            storage,
            next_seq: current_sequence,
            snapshots: HashMap::new(),
        }
    }

    /// Load an order snapshot, preferring uncommitted modifications from
    /// this command
    pub fn load_snapshot(&self, order_id: &str) -> Result<OrderSnapshot, OrderError> {
        if let Some(snapshot) = self.snapshots.get(order_id) {
            return Ok(snapshot.clone());
        }
        self.storage
            .get_snapshot_txn(self.txn, order_id)?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    /// Record a modified snapshot for persistence at commit time
    pub fn save_snapshot(&mut self, snapshot: OrderSnapshot) {
        self.snapshots.insert(snapshot.order_id.clone(), snapshot);
    }

    /// Snapshots modified during this command
    pub fn modified_snapshots(&self) -> impl Iterator<Item = &OrderSnapshot> {
        self.snapshots.values()
    }

    /// Allocate the next global sequence number
    pub fn next_sequence(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Active dine-in order occupying a table, if any
    pub fn find_active_dine_in(
        &self,
        venue_id: &str,
        table_number: u32,
    ) -> Result<Option<String>, OrderError> {
        Ok(self.storage.find_active_dine_in(venue_id, table_number)?)
    }

    /// Active orders forming a customer's open tab at a venue
    pub fn active_orders_for(
        &self,
        customer_id: &str,
        venue_id: &str,
    ) -> Result<Vec<OrderSnapshot>, OrderError> {
        Ok(self.storage.active_orders_for(customer_id, venue_id)?)
    }
}

/// Command handler - validates against current state and produces events
#[async_trait]
pub trait CommandHandler {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError>;
}

/// Event applier - folds one event type into a snapshot
///
/// Appliers are pure: the same event stream always produces the same
/// snapshot, which keeps replay and client-side reductions deterministic.
#[enum_dispatch]
pub trait EventApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent);
}
