//! DTOs for the shorten endpoints.

use crate::domain::entities::NewRecord;
use crate::error::ErrorInfo;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use validator::Validate;

/// Allowed slug characters; reserved names are rejected by the store.
static SLUG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").unwrap_or_else(|e| unreachable!("invalid slug regex: {e}"))
});

/// Request to shorten a single URL.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ShortenRequest {
    /// The target URL (must be a valid absolute URL).
    #[validate(url(message = "Invalid URL format"))]
    pub url: String,

    #[validate(length(max = 255))]
    pub title: Option<String>,

    /// Optional custom code.
    #[validate(length(min = 1, max = 64))]
    #[validate(regex(path = "*SLUG_REGEX", message = "Invalid slug format"))]
    pub slug: Option<String>,

    /// Lifetime in seconds; absent means the link never expires.
    #[validate(range(min = 1, message = "Expiry must be at least one second"))]
    pub expiry_in_secs: Option<i64>,
}

impl From<ShortenRequest> for NewRecord {
    fn from(req: ShortenRequest) -> Self {
        NewRecord {
            target: req.url,
            title: req.title,
            slug: req.slug,
            ttl: req.expiry_in_secs.map(chrono::Duration::seconds),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShortenResponse {
    pub code: String,
    pub short_url: String,
}

/// Request to shorten many URLs at once.
#[derive(Debug, Deserialize, Validate)]
pub struct BulkShortenRequest {
    #[validate(length(min = 1, max = 1000, message = "Between 1 and 1000 URLs per request"))]
    pub urls: Vec<ShortenRequest>,
}

/// Response containing batch processing results.
#[derive(Debug, Serialize)]
pub struct BulkShortenResponse {
    pub summary: BatchSummary,
    pub items: Vec<ShortenResultItem>,
}

/// Individual result for a URL in the batch.
///
/// Uses untagged enum for cleaner JSON structure (no discriminator field).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ShortenResultItem {
    Success {
        url: String,
        code: String,
        short_url: String,
    },
    Error {
        url: String,
        error: ErrorInfo,
    },
}

/// Summary statistics for batch processing.
#[derive(Debug, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}
