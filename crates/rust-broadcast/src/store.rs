//! Persistence of sessions, groups and history.
//!
//! The engine works entirely in memory. A [`Store`] lets it pick up where a
//! previous process left off: the engine loads a [`Snapshot`] once at
//! construction and saves a fresh one after every change.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BroadcastError, Result};
use crate::registry::Group;
use crate::result::BroadcastResult;
use crate::types::Session;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything the engine persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version.
    pub version: u32,
    /// Registered sessions.
    pub sessions: Vec<Session>,
    /// Stored groups.
    pub groups: Vec<Group>,
    /// Retained broadcast results, oldest first.
    pub history: Vec<BroadcastResult>,
    /// First session ID not yet handed out. Zero if unknown.
    #[serde(default)]
    pub next_session_id: u64,
    /// First group ID not yet handed out. Zero if unknown.
    #[serde(default)]
    pub next_group_id: u64,
    /// Number of the next ad-hoc `broadcast-N` ID. Zero if unknown.
    #[serde(default)]
    pub next_broadcast_id: u64,
}

impl Snapshot {
    /// Where session numbering resumes.
    ///
    /// Falls back to the sessions mentioned in history for snapshots that
    /// did not record a counter.
    #[must_use]
    pub fn resume_session_id(&self) -> u64 {
        let seen = self
            .history
            .iter()
            .flat_map(|r| &r.results)
            .map(|r| r.session_id.as_u64())
            .chain(self.sessions.iter().map(|s| s.id.as_u64()))
            .max()
            .unwrap_or(0);
        self.next_session_id.max(seen + 1)
    }

    /// Where group numbering resumes, counting groups seen only in history.
    #[must_use]
    pub fn resume_group_id(&self) -> u64 {
        let seen = self
            .history
            .iter()
            .filter_map(|r| r.broadcast_id.sequence("group"))
            .chain(self.groups.iter().map(|g| g.id.as_u64()))
            .max()
            .unwrap_or(0);
        self.next_group_id.max(seen + 1)
    }

    /// Where ad-hoc broadcast numbering resumes.
    #[must_use]
    pub fn resume_broadcast_id(&self) -> u64 {
        let seen = self
            .history
            .iter()
            .filter_map(|r| r.broadcast_id.sequence("broadcast"))
            .max()
            .unwrap_or(0);
        self.next_broadcast_id.max(seen + 1)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            sessions: Vec::new(),
            groups: Vec::new(),
            history: Vec::new(),
            next_session_id: 1,
            next_group_id: 1,
            next_broadcast_id: 1,
        }
    }
}

/// Somewhere to keep snapshots.
pub trait Store: Send + Sync {
    /// Load the last saved snapshot, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if stored data exists but cannot be read.
    fn load(&self) -> Result<Option<Snapshot>>;

    /// Replace the stored snapshot.
    ///
    /// May block. The engine calls this inline from its synchronous
    /// mutating methods and on tokio's blocking pool after a broadcast,
    /// never directly on an async worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be written.
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn load(&self) -> Result<Option<Snapshot>> {
        (**self).load()
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        (**self).save(snapshot)
    }
}

/// A store shared with the blocking pool.
///
/// Each save carries a revision. A save whose revision is not newer than
/// the last one written is dropped, so a late blocking task cannot replace
/// newer state with older state.
#[derive(Clone)]
pub(crate) struct SharedStore {
    store: Arc<dyn Store>,
    written: Arc<Mutex<u64>>,
}

impl SharedStore {
    pub(crate) fn new(store: impl Store + 'static) -> Self {
        Self {
            store: Arc::new(store),
            written: Arc::new(Mutex::new(0)),
        }
    }

    /// Save `snapshot` unless a newer revision is already stored.
    ///
    /// Returns whether the store was written.
    pub(crate) fn save_revision(&self, revision: u64, snapshot: &Snapshot) -> Result<bool> {
        let mut written = self.written.lock().unwrap_or_else(PoisonError::into_inner);
        if *written >= revision {
            debug!(revision, written = *written, "Skipping superseded snapshot");
            return Ok(false);
        }
        self.store.save(snapshot)?;
        *written = revision;
        Ok(true)
    }
}

/// A store that keeps the last snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshot: Mutex<Option<Snapshot>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-loaded with a snapshot.
    #[must_use]
    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot: Mutex::new(Some(snapshot)),
        }
    }

    /// Get the last saved snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.snapshot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Store for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        Ok(self.snapshot())
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot.clone());
        Ok(())
    }
}

/// A store backed by a pretty-printed JSON file.
///
/// Writes go to a temporary file next to the target which is then renamed
/// over it, so a reader never sees a half-written snapshot.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store for the given file. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Store for JsonFileStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BroadcastError::io_context(
                    format!("reading {}", self.path.display()),
                    e,
                ));
            }
        };
        let snapshot: Snapshot = serde_json::from_str(&content)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(BroadcastError::config(format!(
                "unsupported snapshot version {} in {}",
                snapshot.version,
                self.path.display()
            )));
        }
        debug!(path = %self.path.display(), sessions = snapshot.sessions.len(), "Snapshot loaded");
        Ok(Some(snapshot))
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            BroadcastError::with_io_context(
                fs::create_dir_all(parent),
                format!("creating {}", parent.display()),
            )?;
        }

        let content = serde_json::to_string_pretty(snapshot)?;
        let temp_path = self.path.with_extension("json.tmp");
        BroadcastError::with_io_context(
            fs::write(&temp_path, content),
            format!("writing {}", temp_path.display()),
        )?;
        BroadcastError::with_io_context(
            fs::rename(&temp_path, &self.path),
            format!("replacing {}", self.path.display()),
        )?;
        Ok(())
    }
}
