use std::fs;
use std::path::{Path, PathBuf};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use super::errors::StatusError;
use super::types::RawStatusEvent;

/// Watches the status file and hands every new record to a callback.
///
/// The directory is watched rather than the file, because the hook replaces
/// the file by rename. Identical consecutive contents are delivered once.
pub struct StatusFileWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
}

impl std::fmt::Debug for StatusFileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusFileWatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl StatusFileWatcher {
    pub fn spawn<F>(path: &Path, mut on_event: F) -> Result<Self, StatusError>
    where
        F: FnMut(RawStatusEvent) + Send + 'static,
    {
        let watch_error = |message: String| StatusError::WatchFailed {
            path: path.display().to_string(),
            message,
        };
        let dir = path
            .parent()
            .ok_or_else(|| watch_error("status file has no parent directory".to_string()))?
            .to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| watch_error(e.to_string()))?;

        let target = path.to_path_buf();
        let file_name = path.file_name().map(|n| n.to_os_string());
        let mut last: Option<String> = None;

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    warn!(event = "core.status.watch_error", error = %e);
                    return;
                }
            };
            if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                return;
            }
            if !event
                .paths
                .iter()
                .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name)
            {
                return;
            }
            let content = match fs::read_to_string(&target) {
                Ok(content) => content,
                Err(e) => {
                    debug!(event = "core.status.read_skipped", error = %e);
                    return;
                }
            };
            if last.as_deref() == Some(content.as_str()) {
                return;
            }
            match parse_record(&content) {
                Ok(record) => {
                    last = Some(content);
                    on_event(record);
                }
                Err(e) => warn!(event = "core.status.malformed_file", error = %e),
            }
        })
        .map_err(|e| watch_error(e.to_string()))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| watch_error(e.to_string()))?;

        info!(event = "core.status.watch_started", path = %path.display());
        Ok(Self {
            _watcher: watcher,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn parse_record(content: &str) -> Result<RawStatusEvent, StatusError> {
    serde_json::from_str(content).map_err(|e| StatusError::Malformed {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::status::hook::write_status_file;

    fn record(status: &str) -> RawStatusEvent {
        RawStatusEvent {
            status: status.to_string(),
            cwd: "/src/app".to_string(),
            session_id: None,
            column_id: None,
            timestamp: Some(1),
        }
    }

    #[test]
    fn test_parse_record_rejects_garbage() {
        assert!(parse_record("{").is_err());
        assert_eq!(parse_record(r#"{"status":"done","cwd":"/x"}"#).unwrap().status, "done");
    }

    #[tokio::test]
    async fn test_watcher_forwards_rewritten_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("claude-status.json");
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _watcher = StatusFileWatcher::spawn(&path, move |record| {
            let _ = tx.send(record);
        })
        .unwrap();

        write_status_file(&path, &record("working")).unwrap();

        let received = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.status, "working");
    }
}
