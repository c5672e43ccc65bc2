pub mod engine;
pub mod gateway;
pub mod locks;
pub mod models;
pub mod plan;
pub mod reconcile;
pub mod repository;
pub mod totals;

pub use engine::{NewLineItem, NewOrder, OrderView, SettlementEngine, SettlementError, SettlementRules};
pub use gateway::MockPaymentProcessor;
pub use models::{
    Actor, ChargeKind, ChargeStatus, DeliveryAssignment, ExternalCharge, LineItem, Order,
    OrderStatus, PaymentMethod, PaymentPlan,
};
pub use repository::{OrderRepository, RepoError};
pub use totals::effective_total;
