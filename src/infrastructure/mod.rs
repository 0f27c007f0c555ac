//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain layer.
//!
//! # Modules
//!
//! - [`persistence`] - SQLite repository implementations
//! - [`analytics`] - Access event dispatchers

pub mod analytics;
pub mod persistence;
