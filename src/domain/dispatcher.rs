//! Seams between the store and the analytics collaborators.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::access_event::AccessEvent;

/// Errors raised by an individual analytics sink.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("endpoint responded with status {0}")]
    Status(u16),
}

/// A destination for access events (access log, webhook, analytics SaaS).
///
/// Failures are reported to the caller, which logs and drops them; a sink is
/// never retried.
#[async_trait]
pub trait EventDispatcher: Send + Sync {
    /// Short provider name used in log fields.
    fn name(&self) -> &'static str;

    async fn send(&self, event: &AccessEvent) -> Result<(), DispatchError>;
}

/// Fire-and-forget sink consumed by the store on every successful lookup.
///
/// Must never block: implementations drop the event when they cannot take it.
#[cfg_attr(test, mockall::automock)]
pub trait AccessNotifier: Send + Sync {
    fn notify(&self, event: AccessEvent);
}
