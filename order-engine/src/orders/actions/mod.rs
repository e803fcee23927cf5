//! Command action implementations
//!
//! Each action implements the `CommandHandler` trait and handles one
//! specific command type. Actions only read state and emit events; all
//! mutation happens in the appliers, so a failed action leaves every
//! order untouched.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{OrderCommand, OrderCommandPayload, OrderEvent};

mod add_items;
mod adjust_billing;
#[cfg(test)]
pub(crate) mod test_support;
mod advance_item_status;
mod advance_order_status;
mod cancel_order;
mod create_order;
mod modify_item;
mod remove_item;
mod request_bill;
mod settle_payment;

pub use add_items::AddItemsAction;
pub use adjust_billing::AdjustBillingAction;
pub use advance_item_status::AdvanceItemStatusAction;
pub use advance_order_status::AdvanceOrderStatusAction;
pub use cancel_order::CancelOrderAction;
pub use create_order::CreateOrderAction;
pub use modify_item::ModifyItemAction;
pub use remove_item::RemoveItemAction;
pub use request_bill::RequestBillAction;
pub use settle_payment::SettlePaymentAction;

/// CommandAction enum - dispatches to concrete action implementations
pub enum CommandAction {
    CreateOrder(CreateOrderAction),
    AddItems(AddItemsAction),
    ModifyItem(ModifyItemAction),
    RemoveItem(RemoveItemAction),
    AdvanceOrderStatus(AdvanceOrderStatusAction),
    AdvanceItemStatus(AdvanceItemStatusAction),
    AdjustBilling(AdjustBillingAction),
    CancelOrder(CancelOrderAction),
    RequestBill(RequestBillAction),
    SettlePayment(SettlePaymentAction),
}

#[async_trait]
impl CommandHandler for CommandAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        match self {
            CommandAction::CreateOrder(action) => action.execute(ctx, metadata).await,
            CommandAction::AddItems(action) => action.execute(ctx, metadata).await,
            CommandAction::ModifyItem(action) => action.execute(ctx, metadata).await,
            CommandAction::RemoveItem(action) => action.execute(ctx, metadata).await,
            CommandAction::AdvanceOrderStatus(action) => action.execute(ctx, metadata).await,
            CommandAction::AdvanceItemStatus(action) => action.execute(ctx, metadata).await,
            CommandAction::AdjustBilling(action) => action.execute(ctx, metadata).await,
            CommandAction::CancelOrder(action) => action.execute(ctx, metadata).await,
            CommandAction::RequestBill(action) => action.execute(ctx, metadata).await,
            CommandAction::SettlePayment(action) => action.execute(ctx, metadata).await,
        }
    }
}

impl CommandAction {
    /// Convert an OrderCommand into its action
    ///
    /// This is the ONLY place with a match on `OrderCommandPayload`. The
    /// order number for `CreateOrder` is pre-generated by the engine
    /// outside the write transaction and injected here.
    pub fn build(
        cmd: &OrderCommand,
        order_number: Option<String>,
    ) -> Result<CommandAction, OrderError> {
        Ok(match &cmd.payload {
            OrderCommandPayload::CreateOrder {
                venue_id,
                customer_id,
                fulfillment,
                items,
                policy,
                payment_method,
                tip,
                discount,
                split_count,
                notes,
            } => {
                let order_number = order_number.ok_or_else(|| {
                    OrderError::InvalidOperation(
                        "order number must be pre-generated for CreateOrder".to_string(),
                    )
                })?;
                CommandAction::CreateOrder(CreateOrderAction {
                    order_number,
                    venue_id: venue_id.clone(),
                    customer_id: customer_id.clone(),
                    fulfillment: fulfillment.clone(),
                    items: items.clone(),
                    policy: policy.clone(),
                    payment_method: *payment_method,
                    tip: tip.clone(),
                    discount: *discount,
                    split_count: *split_count,
                    notes: notes.clone(),
                })
            }
            OrderCommandPayload::AddItems { order_id, items } => {
                CommandAction::AddItems(AddItemsAction {
                    order_id: order_id.clone(),
                    items: items.clone(),
                })
            }
            OrderCommandPayload::ModifyItem {
                order_id,
                item_id,
                changes,
            } => CommandAction::ModifyItem(ModifyItemAction {
                order_id: order_id.clone(),
                item_id: item_id.clone(),
                changes: changes.clone(),
            }),
            OrderCommandPayload::RemoveItem { order_id, item_id } => {
                CommandAction::RemoveItem(RemoveItemAction {
                    order_id: order_id.clone(),
                    item_id: item_id.clone(),
                })
            }
            OrderCommandPayload::AdvanceOrderStatus { order_id, target } => {
                CommandAction::AdvanceOrderStatus(AdvanceOrderStatusAction {
                    order_id: order_id.clone(),
                    target: *target,
                })
            }
            OrderCommandPayload::AdvanceItemStatus {
                order_id,
                item_id,
                target,
            } => CommandAction::AdvanceItemStatus(AdvanceItemStatusAction {
                order_id: order_id.clone(),
                item_id: item_id.clone(),
                target: *target,
            }),
            OrderCommandPayload::AdjustBilling {
                order_id,
                tip,
                discount,
                split_count,
            } => CommandAction::AdjustBilling(AdjustBillingAction {
                order_id: order_id.clone(),
                tip: tip.clone(),
                discount: *discount,
                split_count: *split_count,
            }),
            OrderCommandPayload::CancelOrder { order_id, reason } => {
                CommandAction::CancelOrder(CancelOrderAction {
                    order_id: order_id.clone(),
                    reason: reason.clone(),
                })
            }
            OrderCommandPayload::RequestBill { order_ids } => {
                CommandAction::RequestBill(RequestBillAction {
                    order_ids: order_ids.clone(),
                })
            }
            OrderCommandPayload::SettlePayment { order_ids, method } => {
                CommandAction::SettlePayment(SettlePaymentAction {
                    order_ids: order_ids.clone(),
                    method: *method,
                })
            }
        })
    }
}
