use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a ledger event. Balance and cashback are separate pools; an
/// entry counts toward exactly one of them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Deposit,
    Withdraw,
    OrderPayment,
    CashbackEarned,
    CashbackUsed,
    CashbackExchange,
    CashbackCancelled,
}

impl EntryKind {
    pub fn affects_balance(&self) -> bool {
        matches!(
            self,
            EntryKind::Deposit | EntryKind::Withdraw | EntryKind::OrderPayment
        )
    }

    pub fn affects_cashback(&self) -> bool {
        !self.affects_balance()
    }
}

/// One balance- or cashback-affecting event for a customer account.
/// Amounts are signed minor units: positive credits the customer,
/// negative debits them. Entries are never updated or deleted;
/// corrections are new compensating entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub kind: EntryKind,
    pub amount_minor: i64,
    pub description: String,
    pub related_order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        customer_id: Uuid,
        kind: EntryKind,
        amount_minor: i64,
        description: impl Into<String>,
        related_order_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            kind,
            amount_minor,
            description: description.into(),
            related_order_id,
            created_at: Utc::now(),
        }
    }
}
