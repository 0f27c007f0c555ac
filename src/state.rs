//! Shared application state injected into every handler.

use std::sync::Arc;

use crate::application::store::Store;
use crate::infrastructure::persistence::SqliteRecordRepository;

/// Concrete store type served over HTTP.
pub type RecordStore = Store<SqliteRecordRepository>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    /// Externally visible base URL, without trailing slash.
    pub public_url: String,
}

impl AppState {
    pub fn new(store: Arc<RecordStore>, public_url: impl Into<String>) -> Self {
        Self {
            store,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Full short URL for a code.
    pub fn short_url(&self, code: &str) -> String {
        format!("{}/{}", self.public_url, code)
    }
}
