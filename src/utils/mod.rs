//! Utility functions shared across the application.
//!
//! - [`code_generator`] - Short code generation and slug validation

pub mod code_generator;
