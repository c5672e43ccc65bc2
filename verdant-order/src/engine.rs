use crate::locks::OrderLocks;
use crate::models::{
    Actor, ChargeKind, ChargeStatus, DeliveryAssignment, ExternalCharge, LineItem, Order,
    OrderStatus, PaymentMethod, PaymentPlan,
};
use crate::plan;
use crate::reconcile;
use crate::repository::{OrderRepository, RepoError};
use crate::totals;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use verdant_core::payment::PaymentProcessor;
use verdant_core::zones::ZoneDirectory;
use verdant_ledger::{EntryKind, LedgerEntry, LedgerError, LedgerStore};

#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Line item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Rejection requires a reason")]
    RejectionReasonRequired,

    #[error("Customers may only cancel an order while it is pending")]
    IllegalCancellation,

    #[error("Order is in a terminal status")]
    OrderTerminal,

    #[error("Order has no items")]
    EmptyOrder,

    #[error("Invalid quantity: requested {requested}, ordered {ordered}")]
    InvalidQuantity { requested: i64, ordered: u32 },

    #[error("Invalid price: {0}")]
    InvalidPrice(i64),

    #[error("Charge already collected")]
    AlreadyCharged,

    #[error("Payment not due: {0}")]
    PaymentNotDue(&'static str),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: i64, available: i64 },

    #[error("Cash payment is only available for in-zone delivery")]
    CashUnavailable,

    #[error("Custom delivery price requires an out-of-zone address")]
    DeliveryZoneFixed,

    #[error("Delivery fee already paid")]
    DeliveryFeePaid,

    #[error("Delivery price has not been assigned")]
    DeliveryPriceRequired,

    #[error("Concurrent modification of order {0}")]
    ConcurrentModification(Uuid),

    #[error("External payment failed: {0}")]
    ExternalPaymentFailed(String),

    #[error("Zone lookup failed: {0}")]
    ZoneLookup(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<RepoError> for SettlementError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(id) => SettlementError::OrderNotFound(id),
            RepoError::VersionConflict { id, .. } => SettlementError::ConcurrentModification(id),
        }
    }
}

fn map_debit_err(err: LedgerError) -> SettlementError {
    match err {
        LedgerError::InsufficientBalance {
            required,
            available,
        } => SettlementError::InsufficientBalance {
            required,
            available,
        },
        other => SettlementError::Ledger(other),
    }
}

/// Business knobs of the settlement flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRules {
    #[serde(default = "default_deposit_percent")]
    pub deposit_percent: u8,
    #[serde(default = "default_cashback_percent")]
    pub balance_cashback_percent: u8,
}

fn default_deposit_percent() -> u8 {
    50
}

fn default_cashback_percent() -> u8 {
    5
}

impl Default for SettlementRules {
    fn default() -> Self {
        Self {
            deposit_percent: default_deposit_percent(),
            balance_cashback_percent: default_cashback_percent(),
        }
    }
}

// ============================================================================
// Requests and views
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewLineItem {
    pub product_name: String,
    pub unit_price_minor: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub items: Vec<NewLineItem>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub is_preorder: bool,
    pub delivery_address: String,
}

/// An order together with the figures every caller needs: the
/// fulfillable total, what is still owed, and whether fulfillment may
/// proceed to final delivery.
#[derive(Debug, Clone, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub effective_total_minor: i64,
    pub merchandise_outstanding_minor: i64,
    pub delivery_outstanding_minor: i64,
    pub is_fully_settled: bool,
    pub delivery_pricing_pending: bool,
}

impl OrderView {
    pub fn build(order: Order) -> Self {
        let effective_total_minor = totals::effective_total(&order);
        let merchandise_outstanding_minor = totals::merchandise_outstanding(&order);
        let delivery_outstanding_minor = totals::delivery_outstanding(&order);
        let is_fully_settled = plan::is_fully_settled(&order);
        let delivery_pricing_pending = order.delivery.pricing_pending();
        Self {
            order,
            effective_total_minor,
            merchandise_outstanding_minor,
            delivery_outstanding_minor,
            is_fully_settled,
            delivery_pricing_pending,
        }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The operations layer over orders, payment plans and the money
/// ledger. Every mutation of one order runs under that order's lock.
pub struct SettlementEngine {
    orders: Arc<dyn OrderRepository>,
    ledger: Arc<dyn LedgerStore>,
    processor: Arc<dyn PaymentProcessor>,
    zones: Arc<dyn ZoneDirectory>,
    rules: SettlementRules,
    locks: OrderLocks,
}

impl SettlementEngine {
    pub fn new(
        orders: Arc<dyn OrderRepository>,
        ledger: Arc<dyn LedgerStore>,
        processor: Arc<dyn PaymentProcessor>,
        zones: Arc<dyn ZoneDirectory>,
        rules: SettlementRules,
    ) -> Self {
        Self {
            orders,
            ledger,
            processor,
            zones,
            rules,
            locks: OrderLocks::new(),
        }
    }

    /// Create a `pending` order and collect its initial charge: the
    /// deposit for preorders, the full fulfillable total otherwise.
    /// Balance payments settle immediately; card/QR/cash record a
    /// pending collection finalized by the confirmation callback.
    pub async fn create_order(&self, req: NewOrder) -> Result<OrderView, SettlementError> {
        if req.items.is_empty() {
            return Err(SettlementError::EmptyOrder);
        }
        for item in &req.items {
            if item.quantity == 0 {
                return Err(SettlementError::InvalidQuantity {
                    requested: 0,
                    ordered: 0,
                });
            }
            if item.unit_price_minor < 0 {
                return Err(SettlementError::InvalidPrice(item.unit_price_minor));
            }
        }

        let zone = self
            .zones
            .lookup_zone(&req.delivery_address)
            .await
            .map_err(|e| SettlementError::ZoneLookup(e.to_string()))?;
        if req.payment_method == PaymentMethod::CashOnDelivery && zone.is_none() {
            return Err(SettlementError::CashUnavailable);
        }

        let items = req
            .items
            .into_iter()
            .map(|i| LineItem::new(i.product_name, i.unit_price_minor, i.quantity))
            .collect();
        let delivery = DeliveryAssignment::new(req.delivery_address, zone.map(|z| z.id));
        let mut order = Order::new(
            req.customer_id,
            items,
            req.payment_method,
            req.is_preorder,
            delivery,
        );

        let total = totals::effective_total(&order);
        let (kind, amount) = if req.is_preorder {
            let deposit = plan::deposit_for(total, self.rules.deposit_percent);
            order.plan = Some(PaymentPlan::new(deposit, total));
            (ChargeKind::Deposit, deposit)
        } else {
            (ChargeKind::OrderTotal, total)
        };

        self.collect(&mut order, kind, amount, req.payment_method)
            .await?;

        self.orders.insert(order.clone()).await?;
        tracing::info!(
            order_id = %order.id,
            customer_id = %order.customer_id,
            total_minor = total,
            is_preorder = order.is_preorder,
            "order created"
        );
        Ok(OrderView::build(order))
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderView, SettlementError> {
        let order = self.load(order_id).await?;
        Ok(OrderView::build(order))
    }

    pub async fn list_orders(&self, customer_id: Uuid) -> Result<Vec<OrderView>, SettlementError> {
        let orders = self.orders.list_for_customer(customer_id).await?;
        Ok(orders.into_iter().map(OrderView::build).collect())
    }

    /// Move an order along the lifecycle graph. Entering `cancelled` or
    /// `rejected` reconciles the customer's money first; the status is
    /// only persisted once the compensating entries are written.
    pub async fn transition(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<OrderView, SettlementError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;

        if order.status.is_terminal() || !order.status.can_transition_to(new_status) {
            return Err(SettlementError::InvalidTransition {
                from: order.status,
                to: new_status,
            });
        }

        match new_status {
            OrderStatus::Rejected => {
                let reason = reason
                    .filter(|r| !r.trim().is_empty())
                    .ok_or(SettlementError::RejectionReasonRequired)?;
                reconcile::reconcile(&order, self.ledger.as_ref()).await?;
                order.rejection_reason = Some(reason);
            }
            OrderStatus::Cancelled => {
                reconcile::reconcile(&order, self.ledger.as_ref()).await?;
                order.cancellation_reason = reason;
                order.cancelled_by = Some(actor);
            }
            OrderStatus::Processing => {
                if order.delivery.pricing_pending() {
                    tracing::info!(
                        order_id = %order.id,
                        "entering processing with unpriced out-of-zone delivery"
                    );
                }
            }
            _ => {}
        }

        order.set_status(new_status);
        let order = self.orders.update(order).await?;
        tracing::info!(order_id = %order.id, status = ?order.status, actor = ?actor, "order status changed");
        Ok(OrderView::build(order))
    }

    /// Customer-initiated cancellation, allowed only while the order is
    /// still `pending`. Admins cancel through `transition`, which also
    /// reaches `processing` orders.
    pub async fn cancel(
        &self,
        order_id: Uuid,
        actor: Actor,
        reason: Option<String>,
    ) -> Result<OrderView, SettlementError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;

        if order.status != OrderStatus::Pending {
            return Err(SettlementError::IllegalCancellation);
        }

        reconcile::reconcile(&order, self.ledger.as_ref()).await?;
        order.cancellation_reason = reason;
        order.cancelled_by = Some(actor);
        order.set_status(OrderStatus::Cancelled);
        let order = self.orders.update(order).await?;
        tracing::info!(order_id = %order.id, actor = ?actor, "order cancelled");
        Ok(OrderView::build(order))
    }

    /// Assign the courier price for an out-of-zone address. An unpaid
    /// price may be corrected; a collected fee is immutable.
    pub async fn set_delivery_price(
        &self,
        order_id: Uuid,
        price_minor: i64,
    ) -> Result<OrderView, SettlementError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;

        if order.status.is_terminal() {
            return Err(SettlementError::OrderTerminal);
        }
        if price_minor < 0 {
            return Err(SettlementError::InvalidPrice(price_minor));
        }
        if order.delivery.zone_id.is_some() {
            return Err(SettlementError::DeliveryZoneFixed);
        }
        if order.delivery.paid {
            return Err(SettlementError::DeliveryFeePaid);
        }

        order.delivery.custom_price_minor = Some(price_minor);
        order.updated_at = Utc::now();
        let order = self.orders.update(order).await?;
        tracing::info!(order_id = %order.id, price_minor, "delivery price assigned");
        Ok(OrderView::build(order))
    }

    /// Toggle an item's out-of-stock flag. Availability overrides are
    /// kept, so flipping the flag back restores the original line
    /// without re-entering data.
    pub async fn mark_out_of_stock(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        flag: bool,
    ) -> Result<OrderView, SettlementError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;

        if order.status.is_terminal() {
            return Err(SettlementError::OrderTerminal);
        }
        let item = order
            .find_item_mut(item_id)
            .ok_or(SettlementError::ItemNotFound(item_id))?;
        item.is_out_of_stock = flag;

        if order.is_preorder {
            plan::recompute_second_payment(&mut order);
        }
        order.updated_at = Utc::now();
        let order = self.orders.update(order).await?;
        Ok(OrderView::build(order))
    }

    /// Record the partially fulfillable quantity (and optionally a
    /// replacement price) for an out-of-stock line, then re-derive the
    /// order's money figures.
    pub async fn set_availability(
        &self,
        order_id: Uuid,
        item_id: Uuid,
        quantity: i64,
        price_minor: Option<i64>,
    ) -> Result<OrderView, SettlementError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;

        if order.status.is_terminal() {
            return Err(SettlementError::OrderTerminal);
        }
        if let Some(p) = price_minor {
            if p < 0 {
                return Err(SettlementError::InvalidPrice(p));
            }
        }

        {
            let item = order
                .find_item_mut(item_id)
                .ok_or(SettlementError::ItemNotFound(item_id))?;
            if quantity < 0 || quantity > i64::from(item.ordered_quantity) {
                return Err(SettlementError::InvalidQuantity {
                    requested: quantity,
                    ordered: item.ordered_quantity,
                });
            }
            item.available_quantity = Some(quantity as u32);
            item.available_price_minor = Some(price_minor.unwrap_or(item.unit_price_minor));
        }

        if order.is_preorder {
            plan::recompute_second_payment(&mut order);
        }
        order.updated_at = Utc::now();
        let order = self.orders.update(order).await?;
        tracing::info!(order_id = %order.id, item_id = %item_id, quantity, "item availability updated");
        Ok(OrderView::build(order))
    }

    /// Collect a preorder's deposit. Normally this happens at creation;
    /// the operation exists so a deposit whose external collection
    /// failed can be charged again.
    pub async fn charge_deposit(
        &self,
        order_id: Uuid,
        method: PaymentMethod,
    ) -> Result<OrderView, SettlementError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;

        if order.status.is_terminal() {
            return Err(SettlementError::OrderTerminal);
        }
        let plan_state = order
            .plan
            .as_ref()
            .ok_or(SettlementError::PaymentNotDue("order is not a preorder"))?;
        if plan_state.deposit_paid {
            return Err(SettlementError::AlreadyCharged);
        }

        let amount = plan_state.deposit_amount_minor;
        self.collect(&mut order, ChargeKind::Deposit, amount, method)
            .await?;
        let order = self.orders.update(order).await?;
        Ok(OrderView::build(order))
    }

    /// Collect the remainder of a preorder, due once the deposit has
    /// cleared.
    pub async fn charge_second_payment(
        &self,
        order_id: Uuid,
        method: PaymentMethod,
    ) -> Result<OrderView, SettlementError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;

        if order.status.is_terminal() {
            return Err(SettlementError::OrderTerminal);
        }
        let plan_state = order
            .plan
            .as_ref()
            .ok_or(SettlementError::PaymentNotDue("order is not a preorder"))?;
        if !plan_state.deposit_paid {
            return Err(SettlementError::PaymentNotDue(
                "deposit has not been collected",
            ));
        }
        if plan_state.second_payment_paid {
            return Err(SettlementError::AlreadyCharged);
        }

        let amount = plan_state.second_payment_amount_minor;
        self.collect(&mut order, ChargeKind::SecondPayment, amount, method)
            .await?;
        let order = self.orders.update(order).await?;
        Ok(OrderView::build(order))
    }

    /// Collect the admin-assigned delivery fee of an out-of-zone order.
    pub async fn charge_delivery(
        &self,
        order_id: Uuid,
        method: PaymentMethod,
    ) -> Result<OrderView, SettlementError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;

        if order.status.is_terminal() {
            return Err(SettlementError::OrderTerminal);
        }
        if order.delivery.paid {
            return Err(SettlementError::AlreadyCharged);
        }
        let price = order
            .delivery
            .custom_price_minor
            .ok_or(SettlementError::DeliveryPriceRequired)?;

        self.collect(&mut order, ChargeKind::Delivery, price, method)
            .await?;
        let order = self.orders.update(order).await?;
        Ok(OrderView::build(order))
    }

    /// Inbound result of an external collection (card/QR gateway
    /// callback, or the courier confirming cash at handover). A failure
    /// marks the intent dead and changes nothing else; the charge may be
    /// re-initiated.
    pub async fn confirm_external_payment(
        &self,
        order_id: Uuid,
        kind: ChargeKind,
        success: bool,
    ) -> Result<OrderView, SettlementError> {
        let _guard = self.locks.acquire(order_id).await;
        let mut order = self.load(order_id).await?;

        if order.status.is_terminal() {
            return Err(SettlementError::OrderTerminal);
        }

        {
            let charge = order.pending_charge_mut(kind).ok_or(
                SettlementError::PaymentNotDue("no pending external charge of this kind"),
            )?;
            charge.status = if success {
                ChargeStatus::Collected
            } else {
                ChargeStatus::Failed
            };
        }

        if success {
            apply_collection(&mut order, kind);
            tracing::info!(order_id = %order.id, kind = ?kind, "external payment confirmed");
        } else {
            tracing::warn!(order_id = %order.id, kind = ?kind, "external payment failed");
        }

        let order = self.orders.update(order).await?;
        Ok(OrderView::build(order))
    }

    async fn load(&self, order_id: Uuid) -> Result<Order, SettlementError> {
        self.orders
            .get(order_id)
            .await?
            .ok_or(SettlementError::OrderNotFound(order_id))
    }

    /// Route one charge of an order. Balance settles synchronously
    /// against the ledger and earns cashback; other methods register a
    /// pending collection resolved by `confirm_external_payment`. A
    /// zero-amount charge just marks its phase collected.
    async fn collect(
        &self,
        order: &mut Order,
        kind: ChargeKind,
        amount_minor: i64,
        method: PaymentMethod,
    ) -> Result<(), SettlementError> {
        if amount_minor == 0 {
            apply_collection(order, kind);
            return Ok(());
        }

        if method.is_synchronous() {
            self.ledger
                .debit_balance_checked(
                    order.customer_id,
                    amount_minor,
                    charge_description(kind, order.id),
                    order.id,
                )
                .await
                .map_err(map_debit_err)?;
            apply_collection(order, kind);
            self.earn_cashback(order, amount_minor).await?;
        } else {
            // A stale unconfirmed intent for the same phase is
            // superseded rather than left racing the new one.
            if let Some(stale) = order.pending_charge_mut(kind) {
                stale.status = ChargeStatus::Failed;
            }

            let intent_id = if method == PaymentMethod::CashOnDelivery {
                format!("cod_{}", Uuid::new_v4().simple())
            } else {
                self.processor
                    .initiate_charge(order.customer_id, amount_minor, order.id)
                    .await
                    .map_err(|e| SettlementError::ExternalPaymentFailed(e.to_string()))?
                    .id
            };

            order.external_charges.push(ExternalCharge {
                intent_id,
                kind,
                method,
                amount_minor,
                status: ChargeStatus::Pending,
                created_at: Utc::now(),
            });
            order.updated_at = Utc::now();
        }

        Ok(())
    }

    async fn earn_cashback(
        &self,
        order: &Order,
        charged_minor: i64,
    ) -> Result<(), SettlementError> {
        let amount = charged_minor * i64::from(self.rules.balance_cashback_percent) / 100;
        if amount > 0 {
            self.ledger
                .append(LedgerEntry::new(
                    order.customer_id,
                    EntryKind::CashbackEarned,
                    amount,
                    format!("Cashback for order {}", order.id),
                    Some(order.id),
                ))
                .await?;
        }
        Ok(())
    }
}

fn apply_collection(order: &mut Order, kind: ChargeKind) {
    match kind {
        ChargeKind::Deposit => {
            if let Some(plan_state) = order.plan.as_mut() {
                plan_state.deposit_paid = true;
            }
        }
        ChargeKind::SecondPayment => {
            if let Some(plan_state) = order.plan.as_mut() {
                plan_state.second_payment_paid = true;
            }
        }
        ChargeKind::OrderTotal => order.merchandise_paid = true,
        ChargeKind::Delivery => order.delivery.paid = true,
    }
    order.updated_at = Utc::now();
}

fn charge_description(kind: ChargeKind, order_id: Uuid) -> String {
    match kind {
        ChargeKind::OrderTotal => format!("Payment for order {order_id}"),
        ChargeKind::Deposit => format!("Preorder deposit for order {order_id}"),
        ChargeKind::SecondPayment => format!("Second payment for order {order_id}"),
        ChargeKind::Delivery => format!("Delivery fee for order {order_id}"),
    }
}
