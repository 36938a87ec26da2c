//! Infrastructure Layer
//!
//! Adapters for the application ports: broker clients, state backends,
//! notifiers, the decision source and the HTTP command surface.

pub mod broker;
pub mod decision_source;
pub mod http;
pub mod notifier;
pub mod persistence;
