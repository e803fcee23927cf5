//! Engine configuration
//!
//! All settings can be overridden through environment variables:
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | EVENT_CHANNEL_CAPACITY | 65536 | Broadcast channel capacity |
//! | NEAR_LIMIT_RATIO | 0.8 | Spending-limit warning threshold |
//! | MAX_INCREMENTAL_EVENTS | 1000 | Sync gap before full resync |
//! | ORDER_NUMBER_PREFIX | ORD | Order number prefix |

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Event broadcast channel capacity
    pub event_channel_capacity: usize,
    /// Tab usage ratio at which `near_limit` is reported
    pub near_limit_ratio: f64,
    /// Maximum events returned in an incremental sync
    pub max_incremental_events: usize,
    /// Prefix for generated order numbers
    pub order_number_prefix: String,
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();
        Self {
            event_channel_capacity: std::env::var("EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(65536),
            near_limit_ratio: std::env::var("NEAR_LIMIT_RATIO")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0.8),
            max_incremental_events: std::env::var("MAX_INCREMENTAL_EVENTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            order_number_prefix: std::env::var("ORDER_NUMBER_PREFIX")
                .unwrap_or_else(|_| "ORD".into()),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
