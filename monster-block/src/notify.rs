//! Where recovered failures are reported.
//!
//! The view builder never fails on a bad roll formula; it substitutes a
//! default and tells the host through a [`Notifier`] so the user sees it.

/// Sink for user-facing error notifications.
pub trait Notifier {
    fn error(&self, message: &str);
}

/// Default sink: emits the message as a `tracing` error event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn error(&self, message: &str) {
        tracing::error!(target: "monster_block::notify", "{message}");
    }
}
