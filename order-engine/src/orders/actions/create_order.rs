//! CreateOrder command handler
//!
//! Validates the cart, the fulfillment details and the dine-in
//! single-active-order-per-table invariant, runs the billing calculator
//! once and emits the creation event.

use async_trait::async_trait;

use crate::billing::{self, validation};
use crate::orders::reducer;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::money::Money;
use shared::order::{
    CartItemInput, EventContext, EventPayload, Fulfillment, OrderEvent, OrderEventType,
    PaymentMethod, Tip,
};
use shared::policy::VenuePolicy;

/// CreateOrder action
#[derive(Debug, Clone)]
pub struct CreateOrderAction {
    /// Server-generated order number (pre-generated outside the txn)
    pub order_number: String,
    pub venue_id: String,
    pub customer_id: String,
    pub fulfillment: Fulfillment,
    pub items: Vec<CartItemInput>,
    pub policy: VenuePolicy,
    pub payment_method: Option<PaymentMethod>,
    pub tip: Option<Tip>,
    pub discount: Option<Money>,
    pub split_count: Option<u32>,
    pub notes: Option<String>,
}

#[async_trait]
impl CommandHandler for CreateOrderAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. An order cannot be created without items
        if self.items.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        // 2. Policy sanity
        self.policy
            .validate()
            .map_err(|field| OrderError::InvalidOperation(format!("invalid venue policy: {field}")))?;

        // 3. Fulfillment-specific required fields
        match &self.fulfillment {
            Fulfillment::DineIn { .. } => {}
            Fulfillment::Takeaway { customer_contact } => {
                if customer_contact.trim().is_empty() {
                    return Err(OrderError::MissingFulfillmentDetails(
                        "customer contact is required for takeaway orders".to_string(),
                    ));
                }
            }
            Fulfillment::Delivery { delivery_address } => {
                if delivery_address.trim().is_empty() {
                    return Err(OrderError::MissingFulfillmentDetails(
                        "delivery address is required for delivery orders".to_string(),
                    ));
                }
            }
        }

        // 4. Billing inputs
        if let Some(tip) = &self.tip {
            validation::validate_tip(tip, &self.policy)?;
        }
        if let Some(discount) = self.discount {
            validation::validate_discount(discount, &self.policy)?;
        }
        if let Some(split_count) = self.split_count {
            validation::validate_split_count(split_count)?;
        }

        // 5. One active dine-in order per table (authoritative check; the
        //    engine also pre-checks before generating the order number)
        if let Some(table_number) = self.fulfillment.table_number() {
            if let Some(existing) = ctx.find_active_dine_in(&self.venue_id, table_number)? {
                return Err(OrderError::TableOccupied(format!(
                    "table {} at venue {} is already occupied (order {})",
                    table_number, self.venue_id, existing
                )));
            }
        }

        // 6. Convert cart inputs to item snapshots
        let mut items = Vec::with_capacity(self.items.len());
        for input in &self.items {
            validation::validate_cart_item(input, &self.policy)?;
            items.push(reducer::item_from_input(input, &self.policy)?);
        }

        // 7. Initial pricing and the delivery minimum gate
        let bill = billing::compute_bill(
            &items,
            &self.policy,
            self.fulfillment.kind(),
            self.tip.as_ref(),
            self.discount,
            self.split_count,
        )?;
        billing::enforce_delivery_minimum(bill.subtotal, &self.policy, self.fulfillment.kind())?;

        // 8. Emit the creation event
        let order_id = uuid::Uuid::new_v4().to_string();
        let sequence = ctx.next_sequence();
        let event = OrderEvent::new(
            sequence,
            EventContext {
                order_id,
                venue_id: self.venue_id.clone(),
                customer_id: self.customer_id.clone(),
                order_version: 1,
            },
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::OrderCreated,
            EventPayload::OrderCreated {
                order_number: self.order_number.clone(),
                fulfillment: self.fulfillment.clone(),
                items,
                policy: self.policy.clone(),
                payment_method: self.payment_method,
                tip: self.tip.clone(),
                discount: self.discount,
                split_count: self.split_count,
                notes: self.notes.clone(),
            },
        );

        Ok(vec![event])
    }
}
