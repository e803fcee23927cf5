//! Order engine module
//!
//! Command processing with event sourcing:
//!
//! - **actions**: one `CommandHandler` per operation, validating against
//!   current state and producing events
//! - **appliers**: pure `EventApplier`s folding events into snapshots
//! - **manager**: the `OrderEngine` orchestrating idempotency, execution,
//!   persistence and broadcast
//! - **storage**: redb persistence for events, snapshots and indices
//! - **reducer**: input conversion and event replay
//! - **sync**: reconnection synchronization API

pub mod actions;
pub mod appliers;
pub mod manager;
pub mod reducer;
pub mod storage;
pub mod sync;
pub mod traits;

// Re-exports
pub use manager::{EngineError, EngineResult, OrderEngine};
pub use reducer::replay;
pub use storage::OrderStorage;
pub use sync::{SyncRequest, SyncResponse, SyncService};
pub use traits::OrderError;
