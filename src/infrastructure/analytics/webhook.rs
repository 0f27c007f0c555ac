//! Generic JSON webhook sink.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};

use crate::domain::access_event::AccessEvent;
use crate::domain::dispatcher::{DispatchError, EventDispatcher};

/// POSTs every access event as JSON to a fixed endpoint.
pub struct WebhookDispatcher {
    client: Client,
    endpoint: String,
}

impl WebhookDispatcher {
    /// Builds the client with the default headers and a per-request timeout.
    ///
    /// `Content-Type: application/json` is added unless `headers` sets it.
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        headers: &[(String, String)],
    ) -> anyhow::Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            default_headers.insert(
                HeaderName::from_bytes(name.as_bytes())?,
                HeaderValue::from_str(value)?,
            );
        }
        if !default_headers.contains_key(CONTENT_TYPE) {
            default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl EventDispatcher for WebhookDispatcher {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, event: &AccessEvent) -> Result<(), DispatchError> {
        let response = self.client.post(&self.endpoint).json(event).send().await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(DispatchError::Status(status.as_u16()));
        }

        Ok(())
    }
}
