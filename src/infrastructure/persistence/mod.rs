//! SQLite repository implementations.
//!
//! Queries are built at runtime with SQLx and always bind their parameters.
//!
//! # Repositories
//!
//! - [`SqliteRecordRepository`] - Durable record table

pub mod sqlite_record_repository;

pub use sqlite_record_repository::SqliteRecordRepository;
