use crate::models::{LineItem, Order};

/// The fulfillable total of an order in minor units. This is the one
/// total routine: every display, charge and recomputation goes through
/// it, because out-of-stock overrides change the result.
pub fn effective_total(order: &Order) -> i64 {
    order
        .items
        .iter()
        .filter(|i| !i.product_name.is_empty())
        .map(LineItem::effective_subtotal_minor)
        .sum()
}

/// Merchandise amount still owed by the customer.
pub fn merchandise_outstanding(order: &Order) -> i64 {
    match &order.plan {
        Some(plan) => {
            let mut due = 0;
            if !plan.deposit_paid {
                due += plan.deposit_amount_minor;
            }
            if !plan.second_payment_paid {
                due += plan.second_payment_amount_minor;
            }
            due
        }
        None => {
            if order.merchandise_paid {
                0
            } else {
                effective_total(order)
            }
        }
    }
}

/// Outstanding delivery fee. Zero while no custom price is assigned;
/// in-zone orders never owe a separate fee.
pub fn delivery_outstanding(order: &Order) -> i64 {
    if order.delivery.paid {
        return 0;
    }
    order.delivery.custom_price_minor.unwrap_or(0)
}
