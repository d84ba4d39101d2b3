//! One OS-level change-notification registration per subscriber session.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::ServerError;

/// What a watcher reports to its owning session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// The watched resource was modified.
    Changed {
        /// Wall-clock milliseconds since the Unix epoch at observation time.
        timestamp_ms: u64,
    },
    /// The registration broke or the resource disappeared mid-session.
    /// Fatal to the owning session, never to the server.
    Failed { reason: String },
}

/// A single-path, non-recursive watch registration.
///
/// Each session owns exactly one; watchers are never shared or deduplicated
/// across subscribers. Events are bridged into a tokio channel so the session
/// can `select!` on them next to connection I/O.
#[derive(Debug)]
pub struct FileWatcher {
    inner: Option<RecommendedWatcher>,
    path: PathBuf,
}

impl FileWatcher {
    /// Begin observing `path`, forwarding events into `events`.
    ///
    /// Fails up front if the target does not exist — a subscriber must never
    /// be told it is watching nothing.
    pub fn start(
        path: &Path,
        events: mpsc::UnboundedSender<WatchEvent>,
    ) -> Result<Self, ServerError> {
        if !path.exists() {
            return Err(ServerError::WatchTargetMissing {
                path: path.to_path_buf(),
            });
        }

        let mut inner: RecommendedWatcher = recommended_watcher(move |event| {
            if let Some(watch_event) = classify(event) {
                // The session may already be gone; a dead channel just means
                // nobody is listening anymore.
                let _ = events.send(watch_event);
            }
        })?;
        inner.watch(path, RecursiveMode::NonRecursive)?;

        Ok(Self {
            inner: Some(inner),
            path: path.to_path_buf(),
        })
    }

    /// Cancel the registration. Idempotent; no events fire after the first
    /// call returns.
    pub fn stop(&mut self) {
        if let Some(mut inner) = self.inner.take() {
            let _ = inner.unwatch(&self.path);
            tracing::debug!(path = %self.path.display(), "watcher cancelled");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.is_none()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn classify(event: notify::Result<Event>) -> Option<WatchEvent> {
    match event {
        Ok(event) => match event.kind {
            EventKind::Modify(_) | EventKind::Create(_) => Some(WatchEvent::Changed {
                timestamp_ms: unix_millis_now(),
            }),
            EventKind::Remove(_) => Some(WatchEvent::Failed {
                reason: "watch target removed".to_string(),
            }),
            _ => None,
        },
        Err(err) => Some(WatchEvent::Failed {
            reason: err.to_string(),
        }),
    }
}

fn unix_millis_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
