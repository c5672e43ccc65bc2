use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Delivered,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Rejected | OrderStatus::Cancelled
        )
    }

    /// Reachability per the lifecycle graph. Terminal statuses reach
    /// nothing; `delivered` is only reachable through `processing`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, next),
            (Pending, Processing)
                | (Processing, Delivered)
                | (Pending, Rejected)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }
}

/// Who initiated an operation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Customer,
    Admin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Balance,
    Card,
    CashOnDelivery,
    Qr,
}

impl PaymentMethod {
    /// Balance payments settle synchronously against the ledger;
    /// everything else is collected outside and finalized by a
    /// confirmation callback.
    pub fn is_synchronous(&self) -> bool {
        matches!(self, PaymentMethod::Balance)
    }
}

/// Which charge of an order a collection belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChargeKind {
    OrderTotal,
    Deposit,
    SecondPayment,
    Delivery,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChargeStatus {
    Pending,
    Collected,
    Failed,
}

/// A charge collected outside the ledger (card, QR, cash at handover).
/// Recorded when initiated, resolved by the confirmation callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalCharge {
    pub intent_id: String,
    pub kind: ChargeKind,
    pub method: PaymentMethod,
    pub amount_minor: i64,
    pub status: ChargeStatus,
    pub created_at: DateTime<Utc>,
}

/// An individual product within an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub product_name: String,
    pub unit_price_minor: i64,
    pub ordered_quantity: u32,
    pub is_out_of_stock: bool,
    pub available_quantity: Option<u32>,
    pub available_price_minor: Option<i64>,
}

impl LineItem {
    pub fn new(product_name: impl Into<String>, unit_price_minor: i64, quantity: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_name: product_name.into(),
            unit_price_minor,
            ordered_quantity: quantity,
            is_out_of_stock: false,
            available_quantity: None,
            available_price_minor: None,
        }
    }

    /// Quantity actually fulfillable. An out-of-stock line without an
    /// availability override contributes nothing.
    pub fn effective_quantity(&self) -> u32 {
        if self.is_out_of_stock {
            self.available_quantity.unwrap_or(0)
        } else {
            self.ordered_quantity
        }
    }

    pub fn effective_price_minor(&self) -> i64 {
        if self.is_out_of_stock && self.available_quantity.unwrap_or(0) > 0 {
            self.available_price_minor.unwrap_or(self.unit_price_minor)
        } else {
            self.unit_price_minor
        }
    }

    pub fn effective_subtotal_minor(&self) -> i64 {
        i64::from(self.effective_quantity()) * self.effective_price_minor()
    }
}

/// Delivery parameters of an order. `zone_id` is set when the address
/// falls inside a configured fixed-price zone; otherwise an admin must
/// assign `custom_price_minor` before the fee can be collected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryAssignment {
    pub address: String,
    pub zone_id: Option<Uuid>,
    pub custom_price_minor: Option<i64>,
    pub paid: bool,
}

impl DeliveryAssignment {
    pub fn new(address: impl Into<String>, zone_id: Option<Uuid>) -> Self {
        Self {
            address: address.into(),
            zone_id,
            custom_price_minor: None,
            paid: false,
        }
    }

    /// Out-of-zone address still waiting for an admin-assigned price.
    pub fn pricing_pending(&self) -> bool {
        self.zone_id.is_none() && self.custom_price_minor.is_none()
    }
}

/// Two-phase payment state of a preorder: a deposit captured at
/// creation and a remainder recomputed whenever availability changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentPlan {
    pub deposit_amount_minor: i64,
    pub deposit_paid: bool,
    pub second_payment_amount_minor: i64,
    pub second_payment_paid: bool,
}

impl PaymentPlan {
    pub fn new(deposit_amount_minor: i64, total_minor: i64) -> Self {
        Self {
            deposit_amount_minor,
            deposit_paid: false,
            second_payment_amount_minor: (total_minor - deposit_amount_minor).max(0),
            second_payment_paid: false,
        }
    }
}

/// The single source of truth for a customer's purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    pub is_preorder: bool,
    pub payment_method: PaymentMethod,
    pub delivery: DeliveryAssignment,
    pub plan: Option<PaymentPlan>,
    /// Full order total collected (non-preorder flow).
    pub merchandise_paid: bool,
    pub external_charges: Vec<ExternalCharge>,
    pub rejection_reason: Option<String>,
    pub cancellation_reason: Option<String>,
    pub cancelled_by: Option<Actor>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(
        customer_id: Uuid,
        items: Vec<LineItem>,
        payment_method: PaymentMethod,
        is_preorder: bool,
        delivery: DeliveryAssignment,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            customer_id,
            status: OrderStatus::Pending,
            items,
            is_preorder,
            payment_method,
            delivery,
            plan: None,
            merchandise_paid: false,
            external_charges: Vec::new(),
            rejection_reason: None,
            cancellation_reason: None,
            cancelled_by: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update order status
    pub fn set_status(&mut self, new_status: OrderStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }

    pub fn find_item_mut(&mut self, item_id: Uuid) -> Option<&mut LineItem> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    /// The pending external charge of a kind, if one is in flight.
    pub fn pending_charge_mut(&mut self, kind: ChargeKind) -> Option<&mut ExternalCharge> {
        self.external_charges
            .iter_mut()
            .find(|c| c.kind == kind && c.status == ChargeStatus::Pending)
    }

    /// Sum of externally collected money for this order.
    pub fn external_collected_minor(&self) -> i64 {
        self.external_charges
            .iter()
            .filter(|c| c.status == ChargeStatus::Collected)
            .map(|c| c.amount_minor)
            .sum()
    }
}
