//! Order lifecycle and billing engine
//!
//! The engine owns the order aggregate: the entity model and its
//! invariants, the status state machines at order and item granularity,
//! the billing calculator, the open-bill aggregation of a customer's
//! active orders at a venue, and the change-propagation channel that
//! keeps every observer consistent while state mutates concurrently.
//!
//! # Architecture
//!
//! ```text
//! Command → OrderEngine → Event(s) → Storage (redb)
//!                ↓                        ↓
//!            Broadcast             Snapshot Update
//!                ↓
//!         All Subscribers
//! ```
//!
//! Commands validate against the current snapshot and produce immutable
//! events; appliers fold events into snapshots; everything persists in a
//! single transaction and broadcasts after commit.

pub mod billing;
pub mod channel;
pub mod config;
pub mod logger;
pub mod orders;
pub mod tabs;

pub use config::EngineConfig;
pub use orders::manager::{EngineError, EngineResult, OrderEngine};
pub use tabs::OpenBill;
