//! Notifier adapters.

mod logging;
mod webhook;

pub use logging::LogNotifier;
pub use webhook::WebhookNotifier;
