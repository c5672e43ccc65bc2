use crate::models::Order;
use crate::totals;

/// Deposit captured at preorder creation, as a percentage of the
/// fulfillable total at that time.
pub fn deposit_for(total_minor: i64, deposit_percent: u8) -> i64 {
    total_minor * i64::from(deposit_percent) / 100
}

/// Re-derive the remainder after an availability edit. The deposit is
/// immutable once captured; only the second payment moves, floored at
/// zero when the fulfillable total drops below the deposit.
pub fn recompute_second_payment(order: &mut Order) {
    let total = totals::effective_total(order);
    if let Some(plan) = order.plan.as_mut() {
        if plan.second_payment_paid {
            return;
        }
        plan.second_payment_amount_minor = (total - plan.deposit_amount_minor).max(0);
    }
}

/// Whether all merchandise money for the order has been collected.
pub fn merchandise_settled(order: &Order) -> bool {
    match &order.plan {
        Some(plan) => plan.deposit_paid && plan.second_payment_paid,
        None => order.merchandise_paid,
    }
}

/// The gate the fulfillment flow checks before final delivery: all
/// merchandise collected, and the delivery fee either covered by a
/// fixed zone or paid separately.
pub fn is_fully_settled(order: &Order) -> bool {
    merchandise_settled(order) && (order.delivery.zone_id.is_some() || order.delivery.paid)
}
