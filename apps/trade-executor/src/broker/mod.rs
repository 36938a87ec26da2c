//! Broker retry policy shared by the coordinator and the HTTP adapters.

mod retry;

pub use retry::{BrokerRetryPolicy, ExponentialBackoffCalculator, is_retryable_status};
