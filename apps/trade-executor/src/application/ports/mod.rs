//! Ports (driven side).
//!
//! - `BrokerPort`: order placement, status, prices, balances
//! - `StateBackend`: durable ledger storage
//! - `NotifierPort`: human-readable event delivery
//! - `DecisionSourcePort`: recommendations for the daily routine
//! - `Clock`: wall-clock time

mod broker_port;
mod clock_port;
mod decision_source_port;
mod notifier_port;
mod state_backend_port;

#[cfg(test)]
pub use broker_port::MockBrokerPort;
pub use broker_port::{
    Balance, BrokerError, BrokerOrder, BrokerOrderStatus, BrokerPort, Holding, PlaceOrderRequest,
};
pub use clock_port::{Clock, ManualClock, SystemClock};
pub use decision_source_port::{DecisionBatch, DecisionSourceError, DecisionSourcePort};
pub use notifier_port::{Notification, NotifierPort, NotifyError, notify_detached};
pub use state_backend_port::{PersistenceError, StateBackend};
