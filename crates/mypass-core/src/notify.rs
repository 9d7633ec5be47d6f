//! Transient user notifications.

/// Fire-and-forget messages for the user (a toast on mobile, a line on a
/// terminal). Delivery is not confirmed and never retried.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Sends notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(target: "mypass::notify", "{}", message);
    }
}
