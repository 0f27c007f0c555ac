//! DTOs for listing stored records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entities::Record;

/// One record as returned by the list endpoint.
#[derive(Debug, Serialize)]
pub struct RecordItem {
    pub code: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub short_url: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl RecordItem {
    pub fn new(record: Record, short_url: String) -> Self {
        Self {
            code: record.code,
            url: record.target,
            title: record.title,
            short_url,
            created_at: record.created_at,
            expires_at: record.expires_at,
        }
    }
}

/// A page of records plus the total count of live records.
#[derive(Debug, Serialize)]
pub struct RecordListResponse {
    pub urls: Vec<RecordItem>,
    pub page: i64,
    pub per_page: i64,
    pub count: i64,
}
