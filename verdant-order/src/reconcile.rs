use crate::engine::SettlementError;
use crate::models::Order;
use uuid::Uuid;
use verdant_ledger::{EntryKind, LedgerEntry, LedgerStore};

/// Amount actually collected from the customer for this order so far:
/// balance debits recorded in the ledger plus externally confirmed
/// collections (card/QR intents, cash at handover), delivery fee
/// included.
pub fn collected_total(order: &Order, order_entries: &[LedgerEntry]) -> i64 {
    let from_balance: i64 = order_entries
        .iter()
        .filter(|e| e.kind == EntryKind::OrderPayment)
        .map(|e| -e.amount_minor)
        .sum();
    from_balance + order.external_collected_minor()
}

/// Compensate the customer for a cancelled or rejected order. Runs under
/// the order's lock, exactly once per order: the compensating credit and
/// the cashback reversal are each detected by their `related_order_id`
/// marker, so a retried request writes nothing new.
pub(crate) async fn reconcile(
    order: &Order,
    ledger: &dyn LedgerStore,
) -> Result<(), SettlementError> {
    let entries = ledger.entries_for_order(order.id).await;

    let already_refunded = entries.iter().any(|e| e.kind == EntryKind::Deposit);
    if !already_refunded {
        let collected = collected_total(order, &entries);
        if collected > 0 {
            ledger
                .append(LedgerEntry::new(
                    order.customer_id,
                    EntryKind::Deposit,
                    collected,
                    refund_description(order.id),
                    Some(order.id),
                ))
                .await?;
            tracing::info!(order_id = %order.id, amount_minor = collected, "order refunded");
        }
    }

    let earned: i64 = entries
        .iter()
        .filter(|e| e.kind == EntryKind::CashbackEarned)
        .map(|e| e.amount_minor)
        .sum();
    let already_reversed = entries.iter().any(|e| e.kind == EntryKind::CashbackCancelled);
    if earned > 0 && !already_reversed {
        ledger
            .append(LedgerEntry::new(
                order.customer_id,
                EntryKind::CashbackCancelled,
                -earned,
                format!("Cashback reversal for order {}", order.id),
                Some(order.id),
            ))
            .await?;
        tracing::info!(order_id = %order.id, amount_minor = earned, "cashback reversed");
    }

    Ok(())
}

fn refund_description(order_id: Uuid) -> String {
    format!("Refund for order {order_id}")
}
