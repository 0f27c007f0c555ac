//! Access event sinks.
//!
//! - [`AccessLogDispatcher`] - Combined Log Format lines (tracing and file)
//! - [`WebhookDispatcher`] - JSON POST of the raw event
//! - [`PlausibleDispatcher`] - Plausible `pageview` events

pub mod access_log;
pub mod plausible;
pub mod webhook;

pub use access_log::AccessLogDispatcher;
pub use plausible::PlausibleDispatcher;
pub use webhook::WebhookDispatcher;
