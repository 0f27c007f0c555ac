//! Repository trait definitions for the domain layer.
//!
//! The traits here abstract data access so the store can run against SQLite
//! in production and against mocks in unit tests.
//!
//! # Available Repositories
//!
//! - [`RecordRepository`] - Durable record table
//!
//! # Testing
//!
//! See integration tests in `tests/repository_*.rs` for usage examples.

pub mod record_repository;

pub use record_repository::RecordRepository;

#[cfg(test)]
pub use record_repository::MockRecordRepository;
