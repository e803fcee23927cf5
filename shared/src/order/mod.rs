//! Order model
//!
//! Types for the order event-sourcing pipeline:
//! - Commands: requests from clients to modify orders
//! - Events: immutable facts recorded after command processing
//! - Snapshots: computed order state from the event stream

pub mod command;
pub mod event;
pub mod snapshot;
pub mod types;

// Re-exports
pub use command::{OrderCommand, OrderCommandPayload};
pub use event::{EventContext, EventPayload, OrderEvent, OrderEventType};
pub use snapshot::{BillBreakdown, ItemStatus, OrderItemSnapshot, OrderSnapshot, OrderStatus};
pub use types::*;
