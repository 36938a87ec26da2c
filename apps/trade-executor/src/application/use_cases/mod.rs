//! Use cases.

mod reconcile;

pub use reconcile::{ReconcileUseCase, ReconciliationReport};
