use crate::errors::Error;

/// Host-facing hooks.
///
/// Both are invoked from the runtime's worker threads (receiver and dispatch
/// loop), so implementations must be cheap and must not block.
pub trait HostCallbacks: Send + Sync {
    fn on_received(&self, username: &str, message: &str);
    fn on_error(&self, error: &Error);
}
