//! Synchronization API for observer reconnection
//!
//! Observers that lose their subscription catch up here:
//!
//! 1. Client reconnects with its last known sequence
//! 2. The engine calculates the gap
//! 3. Small gap: incremental events; large gap: full snapshot sync
//!
//! The response carries the engine `epoch`; if it changed, the engine
//! restarted and the client must full-sync regardless of the gap.

use crate::orders::manager::{EngineResult, OrderEngine};
use serde::{Deserialize, Serialize};
use shared::order::{OrderEvent, OrderSnapshot};

/// Sync request from a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    /// Client's last known sequence number
    pub since_sequence: u64,
}

/// Sync response to a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Events since the requested sequence (incremental sync)
    pub events: Vec<OrderEvent>,
    /// Current active order snapshots (full sync)
    pub active_orders: Vec<OrderSnapshot>,
    /// Engine's current sequence number
    pub server_sequence: u64,
    /// Whether full sync is required (gap too large)
    pub requires_full_sync: bool,
    /// Engine instance epoch; a change means the engine restarted
    pub server_epoch: String,
}

impl SyncResponse {
    pub fn full_sync(
        active_orders: Vec<OrderSnapshot>,
        server_sequence: u64,
        epoch: String,
    ) -> Self {
        Self {
            events: vec![],
            active_orders,
            server_sequence,
            requires_full_sync: true,
            server_epoch: epoch,
        }
    }

    pub fn incremental(events: Vec<OrderEvent>, server_sequence: u64, epoch: String) -> Self {
        Self {
            events,
            active_orders: vec![],
            server_sequence,
            requires_full_sync: false,
            server_epoch: epoch,
        }
    }
}

/// Sync service for handling reconnection
pub struct SyncService {
    engine: OrderEngine,
}

impl SyncService {
    pub fn new(engine: OrderEngine) -> Self {
        Self { engine }
    }

    /// Handle a sync request
    pub fn sync(&self, request: SyncRequest) -> EngineResult<SyncResponse> {
        let server_sequence = self.engine.current_sequence()?;
        let epoch = self.engine.epoch().to_string();

        // Up to date already
        if request.since_sequence >= server_sequence {
            return Ok(SyncResponse::incremental(vec![], server_sequence, epoch));
        }

        let gap = server_sequence - request.since_sequence;
        let max_events = self.engine.config().max_incremental_events;
        if gap > max_events as u64 {
            let active_orders = self.engine.get_active_orders()?;
            return Ok(SyncResponse::full_sync(active_orders, server_sequence, epoch));
        }

        let events = self.engine.events_since(request.since_sequence)?;
        if events.len() > max_events {
            let active_orders = self.engine.get_active_orders()?;
            return Ok(SyncResponse::full_sync(active_orders, server_sequence, epoch));
        }

        Ok(SyncResponse::incremental(events, server_sequence, epoch))
    }

    /// Verify a stored snapshot against one rebuilt from its events
    pub fn verify_snapshot(&self, order_id: &str) -> EngineResult<bool> {
        let stored = self.engine.get_order(order_id)?;
        let rebuilt = self.engine.rebuild_snapshot(order_id)?;

        match (stored, rebuilt) {
            (Some(s), Some(r)) => Ok(s.state_checksum == r.state_checksum
                && s.status == r.status
                && s.items.len() == r.items.len()
                && s.pricing.total == r.pricing.total
                && s.last_sequence == r.last_sequence),
            (None, None) => Ok(true),
            _ => Ok(false),
        }
    }

    /// Verify every active order's snapshot
    pub fn verify_all_snapshots(&self) -> EngineResult<Vec<(String, bool)>> {
        let mut results = Vec::new();
        for order in self.engine.get_active_orders()? {
            let is_valid = self.verify_snapshot(&order.order_id)?;
            results.push((order.order_id, is_valid));
        }
        Ok(results)
    }
}
