//! # Snaplink
//!
//! A short-code lookup service with a write-back in-memory cache over SQLite.
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture principles with clear layer separation:
//!
//! - **Domain Layer** ([`domain`]) - Entities, clock and repository/dispatcher traits
//! - **Application Layer** ([`application`]) - Write-back store and analytics fan-out
//! - **Infrastructure Layer** ([`infrastructure`]) - SQLite repository and analytics sinks
//! - **API Layer** ([`api`]) - REST API handlers, DTOs, and middleware
//!
//! ## Features
//!
//! - Redirects served from memory; the database is never on the read path
//! - Batched, retried persistence of new records
//! - Lazy and periodic removal of expired records
//! - Access analytics to a log file, webhook or Plausible
//! - Per-IP rate limiting and structured logging
//!
//! ## Quick Start
//!
//! ```bash
//! export DATABASE_URL="sqlite://snaplink.db?mode=rwc"
//! export PUBLIC_URL="http://localhost:3000"
//!
//! cargo run
//! ```
//!
//! ## Durability
//!
//! A create is acknowledged once cached. Records not yet flushed are lost on
//! a crash; a graceful shutdown drains them first.
//!
//! ## Configuration
//!
//! Service configuration is loaded from environment variables via [`config::Config`].
//! See [`config`] module for available options.

pub mod api;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod state;
pub mod telemetry;
pub mod utils;

pub mod config;
pub mod server;

pub mod routes;

pub use error::{AppError, StoreError};
pub use state::AppState;

/// Commonly used types for external consumers.
///
/// Re-exports frequently used types to simplify imports for library users
/// and integration tests.
pub mod prelude {
    pub use crate::application::store::{Store, StoreConfig};
    pub use crate::domain::access_event::RequestMeta;
    pub use crate::domain::clock::{Clock, ManualClock, SystemClock};
    pub use crate::domain::entities::{NewRecord, Record};
    pub use crate::domain::repositories::RecordRepository;
    pub use crate::error::{AppError, StoreError};
    pub use crate::state::AppState;
}
