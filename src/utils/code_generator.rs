//! Short code generation and slug validation utilities.
//!
//! Generation knows nothing about existing codes; collision checking is the
//! write-back cache's job.

use crate::error::StoreError;
use rand::Rng;
use rand::distr::Alphanumeric;

/// Maximum length of a caller-supplied slug.
const MAX_SLUG_LENGTH: usize = 64;

/// Reserved codes that cannot be used as slugs.
///
/// These collide with fixed routes of the HTTP surface.
const RESERVED_CODES: &[&str] = &["api", "health", "metrics", "admin"];

/// Generates a random code of `length` characters drawn uniformly from
/// `[A-Za-z0-9]`.
///
/// # Examples
///
/// ```ignore
/// let code = generate_code(6);
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn generate_code(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Validates a caller-supplied slug.
///
/// # Rules
///
/// - Length: 1-64 characters
/// - Allowed characters: ASCII letters, digits, hyphens, underscores
/// - Cannot be a reserved route name
///
/// # Errors
///
/// Returns [`StoreError::Validation`] if any rule is violated.
pub fn validate_slug(slug: &str) -> Result<(), StoreError> {
    if slug.is_empty() || slug.len() > MAX_SLUG_LENGTH {
        return Err(StoreError::Validation(format!(
            "slug must be 1-{MAX_SLUG_LENGTH} characters, got {}",
            slug.len()
        )));
    }

    if !slug
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StoreError::Validation(format!(
            "slug can only contain letters, digits, hyphens and underscores: {slug}"
        )));
    }

    if RESERVED_CODES.contains(&slug) {
        return Err(StoreError::Validation(format!("slug is reserved: {slug}")));
    }

    Ok(())
}
