//! Core domain entities representing the business data model.
//!
//! # Entity Types
//!
//! - [`Record`] - A short code mapped to its target
//!
//! Creation goes through [`NewRecord`], which is turned into a [`Record`]
//! once a code has been assigned.

pub mod record;

pub use record::{NewRecord, Record};
