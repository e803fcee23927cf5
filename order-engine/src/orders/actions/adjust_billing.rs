//! AdjustBilling command handler
//!
//! Replaces tip, discount or split-count inputs on an open order. Fields
//! left as `None` keep their current value; the whole bill is recomputed
//! by the applier from the merged inputs.

use async_trait::async_trait;

use crate::billing::{self, validation};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::money::Money;
use shared::order::{EventPayload, OrderEvent, OrderEventType, Tip};

/// AdjustBilling action
#[derive(Debug, Clone)]
pub struct AdjustBillingAction {
    pub order_id: String,
    pub tip: Option<Tip>,
    pub discount: Option<Money>,
    pub split_count: Option<u32>,
}

#[async_trait]
impl CommandHandler for AdjustBillingAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        if snapshot.status.is_terminal() {
            return Err(OrderError::OrderClosed(self.order_id.clone()));
        }
        if self.tip.is_none() && self.discount.is_none() && self.split_count.is_none() {
            return Err(OrderError::InvalidOperation(
                "no billing adjustments supplied".to_string(),
            ));
        }

        if let Some(tip) = &self.tip {
            validation::validate_tip(tip, &snapshot.policy)?;
        }
        if let Some(discount) = self.discount {
            validation::validate_discount(discount, &snapshot.policy)?;
        }
        if let Some(split_count) = self.split_count {
            validation::validate_split_count(split_count)?;
        }

        // Validate the prospective bill with the merged inputs
        let tip = self.tip.clone().or_else(|| snapshot.tip.clone());
        let discount = self.discount.or(snapshot.discount);
        let split_count = self.split_count.or(snapshot.split_count);
        billing::compute_bill(
            &snapshot.items,
            &snapshot.policy,
            snapshot.fulfillment.kind(),
            tip.as_ref(),
            discount,
            split_count,
        )?;

        let sequence = ctx.next_sequence();
        let event = OrderEvent::new(
            sequence,
            snapshot.event_context(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::BillingAdjusted,
            EventPayload::BillingAdjusted {
                tip: self.tip.clone(),
                discount: self.discount,
                split_count: self.split_count,
            },
        );

        Ok(vec![event])
    }
}
