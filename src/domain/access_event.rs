//! Access event model for asynchronous redirect analytics.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata about the requester of a lookup.
///
/// Every field is optional so lookups made outside an HTTP request (tests,
/// internal callers) can pass [`RequestMeta::default`].
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub host: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
}

impl RequestMeta {
    pub fn new(
        host: Option<&str>,
        ip: Option<String>,
        user_agent: Option<&str>,
        referer: Option<&str>,
    ) -> Self {
        Self {
            host: host.map(|s| s.to_string()),
            ip,
            user_agent: user_agent.map(|s| s.to_string()),
            referer: referer.map(|s| s.to_string()),
        }
    }
}

/// An in-memory representation of a successful lookup.
///
/// Emitted once per resolved code and handed to the analytics queue. The
/// queue is bounded and lossy, so nothing downstream may rely on receiving
/// every event.
#[derive(Debug, Clone, Serialize)]
pub struct AccessEvent {
    pub code: String,
    pub target: String,
    pub host: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AccessEvent {
    pub fn new(code: String, target: String, meta: RequestMeta, timestamp: DateTime<Utc>) -> Self {
        Self {
            code,
            target,
            host: meta.host,
            ip: meta.ip,
            user_agent: meta.user_agent,
            referer: meta.referer,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_event_creation_full() {
        let meta = RequestMeta::new(
            Some("s.example.com"),
            Some("192.168.1.1".to_string()),
            Some("Mozilla/5.0"),
            Some("https://google.com"),
        );
        let now = Utc::now();

        let event = AccessEvent::new(
            "abc123".to_string(),
            "https://example.com".to_string(),
            meta,
            now,
        );

        assert_eq!(event.code, "abc123");
        assert_eq!(event.target, "https://example.com");
        assert_eq!(event.host.as_deref(), Some("s.example.com"));
        assert_eq!(event.ip.as_deref(), Some("192.168.1.1"));
        assert_eq!(event.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(event.referer.as_deref(), Some("https://google.com"));
        assert_eq!(event.timestamp, now);
    }

    #[test]
    fn test_access_event_creation_minimal() {
        let event = AccessEvent::new(
            "xyz".to_string(),
            "https://rust-lang.org".to_string(),
            RequestMeta::default(),
            Utc::now(),
        );

        assert!(event.host.is_none());
        assert!(event.ip.is_none());
        assert!(event.user_agent.is_none());
        assert!(event.referer.is_none());
    }

    #[test]
    fn test_access_event_serializes_fields() {
        let event = AccessEvent::new(
            "code1".to_string(),
            "https://example.com".to_string(),
            RequestMeta::new(None, Some("10.0.0.1".to_string()), Some("Safari"), None),
            Utc::now(),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["code"], "code1");
        assert_eq!(json["target"], "https://example.com");
        assert_eq!(json["ip"], "10.0.0.1");
        assert!(json["referer"].is_null());
    }
}
