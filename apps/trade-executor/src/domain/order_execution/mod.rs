//! Order execution context: order lifecycle and idempotency.

mod idempotency;
mod order;

pub use idempotency::IdempotencyKey;
pub use order::{Fill, Order, OrderResult, OrderSide, OrderStatus};
