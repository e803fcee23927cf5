//! Bill computation
//!
//! Deterministic, pure derivation of a `BillBreakdown` from the item list
//! and the order's frozen venue policy:
//!
//! 1. `subtotal = Σ line_total`
//! 2. `tax = subtotal × tax_rate`
//! 3. `service_charge = subtotal × service_charge_rate`
//! 4. `tip = explicit amount, else subtotal × tip rate`
//! 5. `delivery_fee` for delivery orders
//! 6. `total = subtotal + tax + service_charge + tip + delivery_fee − discount`, clamped ≥ 0
//! 7. `per_head = ceil(total / split_count)` when splitting
//!
//! Per-head amounts use minor-unit ceiling division, so the sum of shares
//! never under-collects; the over-collection is at most `split_count − 1`
//! minor units and no remainder owner is designated.

use crate::orders::traits::OrderError;
use shared::money::Money;
use shared::order::snapshot::{BillBreakdown, OrderItemSnapshot, OrderSnapshot};
use shared::order::types::{FulfillmentKind, Tip};
use shared::policy::VenuePolicy;

/// Line total: `(unit_price + Σ option modifiers) × quantity`
pub fn line_total(item: &OrderItemSnapshot) -> Result<Money, OrderError> {
    let mut unit = item.unit_price;
    for option in &item.selected_options {
        unit = unit.add(option.price_modifier)?;
    }
    Ok(unit.times(i64::from(item.quantity))?)
}

/// Compute the full bill breakdown
pub fn compute_bill(
    items: &[OrderItemSnapshot],
    policy: &VenuePolicy,
    fulfillment: FulfillmentKind,
    tip: Option<&Tip>,
    discount: Option<Money>,
    split_count: Option<u32>,
) -> Result<BillBreakdown, OrderError> {
    let currency = policy.currency;

    let mut subtotal = Money::zero(currency);
    for item in items {
        subtotal = subtotal.add(line_total(item)?)?;
    }

    let tax = subtotal.percentage(policy.tax_rate);
    let service_charge = subtotal.percentage(policy.service_charge_rate);
    let tip = tip
        .map(|t| t.resolve(subtotal))
        .unwrap_or_else(|| Money::zero(currency));
    let delivery_fee = if fulfillment == FulfillmentKind::Delivery {
        policy.delivery_base_fee
    } else {
        Money::zero(currency)
    };
    let discount = discount.unwrap_or_else(|| Money::zero(currency));

    let total = subtotal
        .add(tax)?
        .add(service_charge)?
        .add(tip)?
        .add(delivery_fee)?
        .sub(discount)?
        .max_zero();

    let per_head = match split_count {
        Some(n) if n > 1 => Some(total.split_ceil(n)),
        _ => None,
    };

    Ok(BillBreakdown {
        subtotal,
        tax,
        service_charge,
        tip,
        delivery_fee,
        discount,
        total,
        per_head,
    })
}

/// Reject delivery orders whose subtotal is below the venue minimum
pub fn enforce_delivery_minimum(
    subtotal: Money,
    policy: &VenuePolicy,
    fulfillment: FulfillmentKind,
) -> Result<(), OrderError> {
    if fulfillment == FulfillmentKind::Delivery
        && subtotal.minor_units() < policy.minimum_order_amount.minor_units()
    {
        return Err(OrderError::MinimumOrderNotMet(format!(
            "subtotal {} is below the delivery minimum {}",
            subtotal, policy.minimum_order_amount
        )));
    }
    Ok(())
}

/// Refresh every line total and the pricing breakdown of a snapshot
pub fn recalculate(snapshot: &mut OrderSnapshot) -> Result<(), OrderError> {
    for index in 0..snapshot.items.len() {
        snapshot.items[index].line_total = line_total(&snapshot.items[index])?;
    }
    snapshot.pricing = compute_bill(
        &snapshot.items,
        &snapshot.policy,
        snapshot.fulfillment.kind(),
        snapshot.tip.as_ref(),
        snapshot.discount,
        snapshot.split_count,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::money::Currency;
    use shared::order::snapshot::ItemStatus;
    use shared::order::types::ItemOption;

    fn item(name: &str, price_minor: i64, quantity: i32) -> OrderItemSnapshot {
        OrderItemSnapshot {
            item_id: format!("item-{name}"),
            product_name: name.to_string(),
            unit_price: Money::new(price_minor, Currency::Eur),
            quantity,
            selected_options: Vec::new(),
            status: ItemStatus::Pending,
            note: None,
            line_total: Money::zero(Currency::Eur),
        }
    }

    fn policy() -> VenuePolicy {
        VenuePolicy::new(Currency::Eur)
    }

    #[test]
    fn test_line_total_with_options() {
        let mut it = item("pizza", 1200, 2);
        it.selected_options = vec![
            ItemOption {
                option_name: "Size".to_string(),
                choice_name: "Large".to_string(),
                price_modifier: Money::new(300, Currency::Eur),
            },
            ItemOption {
                option_name: "Topping".to_string(),
                choice_name: "Extra Cheese".to_string(),
                price_modifier: Money::new(150, Currency::Eur),
            },
        ];
        // (12.00 + 3.00 + 1.50) × 2 = 33.00
        assert_eq!(line_total(&it).unwrap(), Money::new(3300, Currency::Eur));
    }

    #[test]
    fn test_subtotal_and_tax() {
        // Items [{price 100, qty 2}], tax 8% → subtotal 200, tax 16, total 216
        let items = vec![item("a", 10000, 2)];
        let mut policy = policy();
        policy.tax_rate = 0.08;

        let bill =
            compute_bill(&items, &policy, FulfillmentKind::DineIn, None, None, None).unwrap();
        assert_eq!(bill.subtotal, Money::from_major(200, Currency::Eur));
        assert_eq!(bill.tax, Money::from_major(16, Currency::Eur));
        assert_eq!(bill.total, Money::from_major(216, Currency::Eur));
        assert_eq!(bill.per_head, None);
    }

    #[test]
    fn test_tip_rate_and_split() {
        // Same order, tip 15% → tip 30, total 246; split 3 → per_head 82
        let items = vec![item("a", 10000, 2)];
        let mut policy = policy();
        policy.tax_rate = 0.08;

        let tip = Tip::percent(0.15);
        let bill = compute_bill(
            &items,
            &policy,
            FulfillmentKind::DineIn,
            Some(&tip),
            None,
            Some(3),
        )
        .unwrap();
        assert_eq!(bill.tip, Money::from_major(30, Currency::Eur));
        assert_eq!(bill.total, Money::from_major(246, Currency::Eur));
        assert_eq!(bill.per_head, Some(Money::from_major(82, Currency::Eur)));
    }

    #[test]
    fn test_explicit_tip_wins_over_rate() {
        let items = vec![item("a", 10000, 1)];
        let tip = Tip {
            rate: Some(0.15),
            amount: Some(Money::from_major(5, Currency::Eur)),
        };
        let bill = compute_bill(
            &items,
            &policy(),
            FulfillmentKind::DineIn,
            Some(&tip),
            None,
            None,
        )
        .unwrap();
        assert_eq!(bill.tip, Money::from_major(5, Currency::Eur));
    }

    #[test]
    fn test_delivery_fee_only_for_delivery() {
        let items = vec![item("a", 10000, 1)];
        let mut policy = policy();
        policy.delivery_base_fee = Money::from_major(4, Currency::Eur);

        let delivery = compute_bill(
            &items,
            &policy,
            FulfillmentKind::Delivery,
            None,
            None,
            None,
        )
        .unwrap();
        assert_eq!(delivery.delivery_fee, Money::from_major(4, Currency::Eur));
        assert_eq!(delivery.total, Money::from_major(104, Currency::Eur));

        let dine_in =
            compute_bill(&items, &policy, FulfillmentKind::DineIn, None, None, None).unwrap();
        assert_eq!(dine_in.delivery_fee, Money::zero(Currency::Eur));
        assert_eq!(dine_in.total, Money::from_major(100, Currency::Eur));
    }

    #[test]
    fn test_discount_clamps_total_at_zero() {
        let items = vec![item("a", 1000, 1)];
        let bill = compute_bill(
            &items,
            &policy(),
            FulfillmentKind::DineIn,
            None,
            Some(Money::from_major(50, Currency::Eur)),
            None,
        )
        .unwrap();
        assert_eq!(bill.total, Money::zero(Currency::Eur));
        assert!(bill.total.is_non_negative());
    }

    #[test]
    fn test_split_never_under_collects() {
        let items = vec![item("a", 9999, 1)];
        for n in 2..=8u32 {
            let bill = compute_bill(
                &items,
                &policy(),
                FulfillmentKind::DineIn,
                None,
                None,
                Some(n),
            )
            .unwrap();
            let per_head = bill.per_head.unwrap();
            assert!(per_head.minor_units() * i64::from(n) >= bill.total.minor_units());
            assert!(per_head.minor_units() * i64::from(n - 1) < bill.total.minor_units());
        }
    }

    #[test]
    fn test_split_of_one_is_not_a_split() {
        let items = vec![item("a", 10000, 1)];
        let bill = compute_bill(
            &items,
            &policy(),
            FulfillmentKind::DineIn,
            None,
            None,
            Some(1),
        )
        .unwrap();
        assert_eq!(bill.per_head, None);
    }

    #[test]
    fn test_delivery_minimum_enforced() {
        let mut policy = policy();
        policy.minimum_order_amount = Money::from_major(100, Currency::Eur);

        let below = Money::from_major(80, Currency::Eur);
        let result = enforce_delivery_minimum(below, &policy, FulfillmentKind::Delivery);
        assert!(matches!(result, Err(OrderError::MinimumOrderNotMet(_))));

        // Minimum only applies to delivery
        assert!(enforce_delivery_minimum(below, &policy, FulfillmentKind::DineIn).is_ok());
        assert!(enforce_delivery_minimum(below, &policy, FulfillmentKind::Takeaway).is_ok());

        let at = Money::from_major(100, Currency::Eur);
        assert!(enforce_delivery_minimum(at, &policy, FulfillmentKind::Delivery).is_ok());
    }

    #[test]
    fn test_currency_mismatch_surfaces() {
        let mut it = item("a", 1000, 1);
        it.selected_options = vec![ItemOption {
            option_name: "Size".to_string(),
            choice_name: "Large".to_string(),
            price_modifier: Money::new(100, Currency::Usd),
        }];
        let result = compute_bill(&[it], &policy(), FulfillmentKind::DineIn, None, None, None);
        assert!(matches!(result, Err(OrderError::CurrencyMismatch(_))));
    }

    #[test]
    fn test_total_reconciliation_invariant() {
        // total == subtotal + tax + service + tip + delivery − discount for
        // a breakdown that stays non-negative
        let items = vec![item("a", 12345, 3), item("b", 678, 2)];
        let mut policy = policy();
        policy.tax_rate = 0.10;
        policy.service_charge_rate = 0.05;
        policy.delivery_base_fee = Money::new(299, Currency::Eur);

        let tip = Tip::amount(Money::new(500, Currency::Eur));
        let discount = Money::new(1000, Currency::Eur);
        let bill = compute_bill(
            &items,
            &policy,
            FulfillmentKind::Delivery,
            Some(&tip),
            Some(discount),
            None,
        )
        .unwrap();

        let expected = bill.subtotal.minor_units()
            + bill.tax.minor_units()
            + bill.service_charge.minor_units()
            + bill.tip.minor_units()
            + bill.delivery_fee.minor_units()
            - bill.discount.minor_units();
        assert_eq!(bill.total.minor_units(), expected);
    }
}
