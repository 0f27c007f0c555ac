//! Record entity mapping a short code to its target.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// A stored mapping from a short code to a target value.
///
/// `expires_at` of `None` means the record never expires. A record whose
/// `expires_at` is at or before "now" is logically deleted even if it is
/// still present in the cache or the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub code: String,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Record {
    /// Creates a new Record instance.
    pub fn new(
        code: String,
        target: String,
        title: Option<String>,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            code,
            target,
            title,
            created_at,
            expires_at,
        }
    }

    /// Returns true if the record has passed its expiry time at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|e| now >= e)
    }
}

/// Input data for creating a new record.
///
/// `slug` pins the code; without it a code is generated. A `ttl` of `None`
/// (or zero) creates a record that never expires.
#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    pub target: String,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub ttl: Option<Duration>,
}

impl NewRecord {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Materializes the record under `code`, stamping it with `now`.
    ///
    /// Empty titles collapse to `None`; non-positive TTLs mean "never expires".
    pub fn into_record(self, code: String, now: DateTime<Utc>) -> Record {
        let title = self.title.filter(|t| !t.is_empty());
        let expires_at = self
            .ttl
            .filter(|ttl| *ttl > Duration::zero())
            .map(|ttl| now + ttl);

        Record::new(code, self.target, title, now, expires_at)
    }
}
