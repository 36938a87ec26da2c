//! Notifier that only logs.

use async_trait::async_trait;

use crate::application::ports::{Notification, NotifierPort, NotifyError};

/// Writes notifications to the tracing log. Used when no webhook is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotifierPort for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            target: "notifications",
            kind = notification.kind(),
            message = %notification.message(),
            "Notification"
        );
        Ok(())
    }
}
