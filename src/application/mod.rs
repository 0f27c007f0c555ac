//! Application layer: the write-back store and its collaborators.
//!
//! Consumes the repository and dispatcher traits from [`crate::domain`] and
//! exposes the API used by HTTP handlers.
//!
//! # Components
//!
//! - [`store::Store`] - Write-back cache, flush pipeline and expiry reaper
//! - [`services::AnalyticsService`] - Lossy fan-out of access events

pub mod services;
pub mod store;
