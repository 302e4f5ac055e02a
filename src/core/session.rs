//! The process-wide sign-in session.
//!
//! All token reads, writes and evictions go through [`SessionStore`].
//! Concurrent writers race with last-write-wins semantics.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, warn};

pub const TOKEN_FILE: &str = "token";
const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn,
    Ended,
}

pub struct SessionStore {
    token: RwLock<Option<String>>,
    path: Option<PathBuf>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionStore {
    /// A session that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self {
            token: RwLock::new(None),
            path: None,
            events: broadcast::channel(CHANNEL_CAPACITY).0,
        }
    }

    /// A session persisted to `dir/token`, picking up any token already there.
    pub fn persistent<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let path = dir.as_ref().join(TOKEN_FILE);
        let token = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read session file: {}", path.display()))?;
            Some(raw.trim().to_string()).filter(|t| !t.is_empty())
        } else {
            None
        };
        debug!(
            "Loaded session from {} (signed in: {})",
            path.display(),
            token.is_some()
        );

        Ok(Self {
            token: RwLock::new(token),
            path: Some(path),
            events: broadcast::channel(CHANNEL_CAPACITY).0,
        })
    }

    pub fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.get().is_some()
    }

    /// Stores `token` and notifies subscribers. The in-memory token is
    /// replaced even when persisting it fails.
    pub fn set(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.clone());
        let _ = self.events.send(SessionEvent::SignedIn);

        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            std::fs::write(path, token)
                .with_context(|| format!("Failed to write session file: {}", path.display()))?;
        }
        Ok(())
    }

    /// Evicts the token. Returns whether one was present; subscribers hear
    /// [`SessionEvent::Ended`] only in that case, so racing evictions notify
    /// once.
    pub fn clear(&self) -> bool {
        let previous = self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        if let Some(path) = &self.path {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(error = %e, "Failed to remove session file {}", path.display());
                }
            }
        }

        if previous.is_some() {
            let _ = self.events.send(SessionEvent::Ended);
            true
        } else {
            false
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}
