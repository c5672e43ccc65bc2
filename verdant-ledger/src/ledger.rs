use crate::entry::{EntryKind, LedgerEntry};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Invalid ledger amount: {0}")]
    InvalidAmount(i64),
}

/// Append-only store of balance/cashback events. A customer's balance is
/// never stored as a mutable field; it is always the fold over their
/// entries of the matching pool.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Append an entry unconditionally.
    async fn append(&self, entry: LedgerEntry) -> Result<LedgerEntry, LedgerError>;

    /// Debit a customer's balance for an order, failing if the current
    /// balance does not cover the amount. The balance read and the
    /// append are serialized per customer.
    async fn debit_balance_checked(
        &self,
        customer_id: Uuid,
        amount_minor: i64,
        description: String,
        order_id: Uuid,
    ) -> Result<LedgerEntry, LedgerError>;

    async fn entries_for_customer(&self, customer_id: Uuid) -> Vec<LedgerEntry>;

    async fn entries_for_order(&self, order_id: Uuid) -> Vec<LedgerEntry>;

    async fn balance(&self, customer_id: Uuid) -> i64;

    async fn cashback(&self, customer_id: Uuid) -> i64;
}

/// In-memory ledger. Entries live in one append-only log; per-customer
/// mutexes serialize the check-then-append of conditional debits.
pub struct MoneyLedger {
    entries: RwLock<Vec<LedgerEntry>>,
    customer_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl MoneyLedger {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            customer_locks: Mutex::new(HashMap::new()),
        }
    }

    async fn customer_lock(&self, customer_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.customer_locks.lock().await;
        locks
            .entry(customer_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn fold(&self, customer_id: Uuid, pool: fn(&EntryKind) -> bool) -> i64 {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.customer_id == customer_id && pool(&e.kind))
            .map(|e| e.amount_minor)
            .sum()
    }
}

impl Default for MoneyLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerStore for MoneyLedger {
    async fn append(&self, entry: LedgerEntry) -> Result<LedgerEntry, LedgerError> {
        if entry.amount_minor == 0 {
            return Err(LedgerError::InvalidAmount(0));
        }

        tracing::debug!(
            customer_id = %entry.customer_id,
            kind = ?entry.kind,
            amount_minor = entry.amount_minor,
            "ledger append"
        );

        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn debit_balance_checked(
        &self,
        customer_id: Uuid,
        amount_minor: i64,
        description: String,
        order_id: Uuid,
    ) -> Result<LedgerEntry, LedgerError> {
        if amount_minor <= 0 {
            return Err(LedgerError::InvalidAmount(amount_minor));
        }

        let lock = self.customer_lock(customer_id).await;
        let _guard = lock.lock().await;

        let available = self.fold(customer_id, EntryKind::affects_balance).await;
        if available < amount_minor {
            return Err(LedgerError::InsufficientBalance {
                required: amount_minor,
                available,
            });
        }

        let entry = LedgerEntry::new(
            customer_id,
            EntryKind::OrderPayment,
            -amount_minor,
            description,
            Some(order_id),
        );
        self.append(entry).await
    }

    async fn entries_for_customer(&self, customer_id: Uuid) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.customer_id == customer_id)
            .cloned()
            .collect()
    }

    async fn entries_for_order(&self, order_id: Uuid) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .await
            .iter()
            .filter(|e| e.related_order_id == Some(order_id))
            .cloned()
            .collect()
    }

    async fn balance(&self, customer_id: Uuid) -> i64 {
        self.fold(customer_id, EntryKind::affects_balance).await
    }

    async fn cashback(&self, customer_id: Uuid) -> i64 {
        self.fold(customer_id, EntryKind::affects_cashback).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn top_up(customer_id: Uuid, amount: i64) -> LedgerEntry {
        LedgerEntry::new(customer_id, EntryKind::Deposit, amount, "Top-up", None)
    }

    #[tokio::test]
    async fn test_balance_is_fold_over_entries() {
        let ledger = MoneyLedger::new();
        let customer = Uuid::new_v4();

        ledger.append(top_up(customer, 10_000)).await.unwrap();
        ledger
            .append(LedgerEntry::new(
                customer,
                EntryKind::Withdraw,
                -2_500,
                "Withdrawal",
                None,
            ))
            .await
            .unwrap();

        assert_eq!(ledger.balance(customer).await, 7_500);
        assert_eq!(ledger.cashback(customer).await, 0);
    }

    #[tokio::test]
    async fn test_cashback_pool_is_separate() {
        let ledger = MoneyLedger::new();
        let customer = Uuid::new_v4();
        let order_id = Uuid::new_v4();

        ledger.append(top_up(customer, 1_000)).await.unwrap();
        ledger
            .append(LedgerEntry::new(
                customer,
                EntryKind::CashbackEarned,
                50,
                "Cashback",
                Some(order_id),
            ))
            .await
            .unwrap();

        assert_eq!(ledger.balance(customer).await, 1_000);
        assert_eq!(ledger.cashback(customer).await, 50);
    }

    #[tokio::test]
    async fn test_checked_debit_rejects_overdraft() {
        let ledger = MoneyLedger::new();
        let customer = Uuid::new_v4();
        let order_id = Uuid::new_v4();

        ledger.append(top_up(customer, 100)).await.unwrap();

        let err = ledger
            .debit_balance_checked(customer, 250, "Order payment".to_string(), order_id)
            .await
            .unwrap_err();

        match err {
            LedgerError::InsufficientBalance {
                required,
                available,
            } => {
                assert_eq!(required, 250);
                assert_eq!(available, 100);
            }
            other => panic!("unexpected error: {other}"),
        }

        // The failed debit must not have written anything.
        assert_eq!(ledger.balance(customer).await, 100);
    }

    #[tokio::test]
    async fn test_checked_debit_tags_order() {
        let ledger = MoneyLedger::new();
        let customer = Uuid::new_v4();
        let order_id = Uuid::new_v4();

        ledger.append(top_up(customer, 500)).await.unwrap();
        ledger
            .debit_balance_checked(customer, 300, "Order payment".to_string(), order_id)
            .await
            .unwrap();

        let entries = ledger.entries_for_order(order_id).await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, EntryKind::OrderPayment);
        assert_eq!(entries[0].amount_minor, -300);
        assert_eq!(ledger.balance(customer).await, 200);
    }

    #[tokio::test]
    async fn test_concurrent_checked_debits_never_overdraft() {
        let ledger = Arc::new(MoneyLedger::new());
        let customer = Uuid::new_v4();

        ledger.append(top_up(customer, 1_000)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .debit_balance_checked(
                        customer,
                        300,
                        "Order payment".to_string(),
                        Uuid::new_v4(),
                    )
                    .await
                    .is_ok()
            }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                succeeded += 1;
            }
        }

        // 1000 / 300 allows exactly three debits through.
        assert_eq!(succeeded, 3);
        assert_eq!(ledger.balance(customer).await, 100);
    }
}
