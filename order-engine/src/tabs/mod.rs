//! Open-bill aggregation
//!
//! A customer's concurrently active orders at one venue are presented as
//! a single logical tab: one grand total, one derived status (the tab is
//! only as done as its least-ready order), and an informational
//! spending-limit report. The aggregator never blocks anything on an
//! exceeded limit; that decision belongs to the calling workflow.

use crate::orders::manager::OrderEngine;
use crate::orders::traits::OrderError;
use serde::{Deserialize, Serialize};
use shared::money::Money;
use shared::order::{
    CommandResponse, OrderCommand, OrderCommandPayload, OrderSnapshot, OrderStatus, PaymentMethod,
};

/// Spending-limit usage report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpendingReport {
    pub limit: Money,
    /// `grand_total / limit`
    pub usage_ratio: f64,
    /// Usage at or above the configured warning threshold
    pub near_limit: bool,
    /// Usage at or above the limit itself
    pub over_limit: bool,
}

/// A customer's open tab at a venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenBill {
    pub customer_id: String,
    pub venue_id: String,
    /// Constituent active orders, oldest first
    pub orders: Vec<OrderSnapshot>,
    /// Sum of the constituent orders' totals
    pub grand_total: Money,
    /// Time since the earliest order was created (milliseconds)
    pub elapsed_ms: i64,
    /// Least-advanced status among the constituent orders
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spending: Option<SpendingReport>,
}

impl OpenBill {
    pub fn order_ids(&self) -> Vec<String> {
        self.orders.iter().map(|o| o.order_id.clone()).collect()
    }

    /// Request the bill for the whole tab at once
    pub fn request_bill(
        &self,
        engine: &OrderEngine,
        operator_id: impl Into<String>,
        operator_name: impl Into<String>,
    ) -> CommandResponse {
        engine.execute_command(OrderCommand::new(
            operator_id,
            operator_name,
            OrderCommandPayload::RequestBill {
                order_ids: self.order_ids(),
            },
        ))
    }

    /// Settle the whole tab at once; partial settlement is not supported
    pub fn settle_payment(
        &self,
        engine: &OrderEngine,
        method: PaymentMethod,
        operator_id: impl Into<String>,
        operator_name: impl Into<String>,
    ) -> CommandResponse {
        engine.execute_command(OrderCommand::new(
            operator_id,
            operator_name,
            OrderCommandPayload::SettlePayment {
                order_ids: self.order_ids(),
                method,
            },
        ))
    }
}

/// Aggregate active orders into an open bill
///
/// Returns `None` when the customer has no active orders at the venue.
/// The spending limit comes from the most recently created order's frozen
/// policy, the closest view of the venue's current configuration.
pub fn build_open_bill(
    customer_id: &str,
    venue_id: &str,
    mut orders: Vec<OrderSnapshot>,
    now_millis: i64,
    near_limit_ratio: f64,
) -> Result<Option<OpenBill>, OrderError> {
    if orders.is_empty() {
        return Ok(None);
    }
    orders.sort_by_key(|o| o.created_at);

    let mut grand_total = Money::zero(orders[0].pricing.total.currency());
    for order in &orders {
        grand_total = grand_total.add(order.pricing.total)?;
    }

    let earliest = orders[0].created_at;
    let status = orders
        .iter()
        .map(|o| o.status)
        .min_by_key(|s| s.rank())
        .unwrap_or(OrderStatus::Pending);

    let spending = orders
        .last()
        .and_then(|o| o.policy.spending_limit)
        .map(|limit| {
            let usage_ratio = if limit.minor_units() > 0 {
                grand_total.minor_units() as f64 / limit.minor_units() as f64
            } else {
                0.0
            };
            SpendingReport {
                limit,
                usage_ratio,
                near_limit: usage_ratio >= near_limit_ratio,
                over_limit: usage_ratio >= 1.0,
            }
        });

    Ok(Some(OpenBill {
        customer_id: customer_id.to_string(),
        venue_id: venue_id.to_string(),
        orders,
        grand_total,
        elapsed_ms: (now_millis - earliest).max(0),
        status,
        spending,
    }))
}
