//! Plausible Analytics events API sink.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use serde::Serialize;

use crate::domain::access_event::AccessEvent;
use crate::domain::dispatcher::{DispatchError, EventDispatcher};

#[derive(Debug, Serialize)]
struct PageView<'a> {
    name: &'static str,
    domain: &'a str,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    referrer: Option<&'a str>,
}

/// Reports each redirect as a `pageview`.
///
/// The visitor's User-Agent and IP are forwarded so Plausible can count
/// unique visitors.
pub struct PlausibleDispatcher {
    client: Client,
    endpoint: String,
    public_url: String,
}

impl PlausibleDispatcher {
    /// `public_url` is the externally visible base; page URLs are
    /// `{public_url}/{code}`.
    pub fn new(
        endpoint: impl Into<String>,
        public_url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn page_view<'a>(&self, event: &'a AccessEvent) -> PageView<'a> {
        PageView {
            name: "pageview",
            domain: event.host.as_deref().unwrap_or_default(),
            url: format!("{}/{}", self.public_url, event.code),
            referrer: event.referer.as_deref(),
        }
    }
}

#[async_trait]
impl EventDispatcher for PlausibleDispatcher {
    fn name(&self) -> &'static str {
        "plausible"
    }

    async fn send(&self, event: &AccessEvent) -> Result<(), DispatchError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&self.page_view(event));

        if let Some(ua) = &event.user_agent {
            request = request.header(USER_AGENT, ua);
        }
        if let Some(ip) = &event.ip {
            request = request.header("X-Forwarded-For", ip);
        }

        let response = request.send().await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(DispatchError::Status(status.as_u16()));
        }

        Ok(())
    }
}
