//! Combined Log Format access log.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::domain::access_event::AccessEvent;
use crate::domain::dispatcher::{DispatchError, EventDispatcher};

/// Writes one Combined Log Format line per access event.
///
/// Lines always go to the `access_log` tracing target; with a path they are
/// also appended to that file.
pub struct AccessLogDispatcher {
    path: Option<PathBuf>,
}

impl AccessLogDispatcher {
    /// Creates the dispatcher, creating the log file's parent directory.
    pub async fn new(path: Option<&Path>) -> Result<Self, DispatchError> {
        if let Some(parent) = path.and_then(Path::parent)
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        Ok(Self {
            path: path.map(Path::to_path_buf),
        })
    }

    fn format_line(event: &AccessEvent) -> String {
        format!(
            "{ip} - - [{time}] \"GET /{code} HTTP/1.1\" 302 - \"{referer}\" \"{ua}\"",
            ip = event.ip.as_deref().unwrap_or("-"),
            time = event.timestamp.format("%d/%b/%Y:%H:%M:%S %z"),
            code = event.code,
            referer = event.referer.as_deref().unwrap_or("-"),
            ua = event.user_agent.as_deref().unwrap_or("-"),
        )
    }
}

#[async_trait]
impl EventDispatcher for AccessLogDispatcher {
    fn name(&self) -> &'static str {
        "accesslog"
    }

    async fn send(&self, event: &AccessEvent) -> Result<(), DispatchError> {
        let line = Self::format_line(event);
        tracing::info!(target: "access_log", "{line}");

        if let Some(path) = &self.path {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(format!("{line}\n").as_bytes()).await?;
        }

        Ok(())
    }
}
