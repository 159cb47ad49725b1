//! JSONL-backed [`SessionStore`].
//!
//! Layout under the store root: `<namespace>/<session_id>.jsonl` for the
//! event log and `<namespace>/<session_id>.meta.json` for the sidecar,
//! where `<namespace>` is one of the three shapes in
//! [`helm_core::session::Namespace`]. The namespace is resolved once per
//! call from the caller-supplied pair; reads under a different pair than
//! the one written simply miss.
//!
//! INVARIANT: appends to one session are serialized by an in-process
//! per-session mutex. Appends to different sessions are unordered with
//! respect to each other.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use helm_core::events::CanonicalEvent;
use helm_core::session::{Namespace, SessionMetadata};
use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::errors::{Result, StoreError};
use crate::record::PersistedEvent;

/// Durable append-only session event store.
pub struct SessionStore {
    root: PathBuf,
    write_locks: Mutex<HashMap<PathBuf, Weak<Mutex<()>>>>,
}

impl SessionStore {
    /// Create a store rooted at `root`. The directory is created lazily on
    /// first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Store root directory.
    #[must_use]
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    // ─────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────

    /// Append one event to a session's log.
    ///
    /// Resolves the namespace, creates directories on first write, persists
    /// one JSON line, and returns after the line is flushed. The metadata
    /// sidecar is written alongside the first append.
    #[instrument(skip(self, event), fields(session_id, event_type = event.event_type()))]
    pub fn append(
        &self,
        session_id: &str,
        event: &CanonicalEvent,
        app: Option<&str>,
        workspace: Option<&str>,
    ) -> Result<PersistedEvent> {
        let namespace = self.resolve(session_id, app, workspace)?;
        let log_path = self.log_path(&namespace, session_id);
        let record = PersistedEvent::from_event(session_id, event)?;

        let lock = self.write_lock_for(&log_path);
        let _guard = lock.lock();

        if let Some(dir) = log_path.parent() {
            fs::create_dir_all(dir)?;
        }
        let meta_path = self.meta_path(&namespace, session_id);
        if !meta_path.exists() {
            self.write_metadata(
                &meta_path,
                &SessionMetadata {
                    session_id: session_id.to_string(),
                    workspace: workspace.map(str::to_string),
                    app: app.map(str::to_string),
                    created_at: record.timestamp,
                    task_id: None,
                },
            )?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&log_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        debug!(record_id = %record.id, "event persisted");
        Ok(record)
    }

    /// Remove a session's log and metadata. Returns whether anything was
    /// deleted.
    #[instrument(skip(self), fields(session_id))]
    pub fn delete(
        &self,
        session_id: &str,
        app: Option<&str>,
        workspace: Option<&str>,
    ) -> Result<bool> {
        let namespace = self.resolve(session_id, app, workspace)?;
        let log_path = self.log_path(&namespace, session_id);
        let meta_path = self.meta_path(&namespace, session_id);

        let lock = self.write_lock_for(&log_path);
        let existed = {
            let _guard = lock.lock();
            let log_existed = remove_if_present(&log_path)?;
            let _ = remove_if_present(&meta_path)?;
            log_existed
        };
        if existed {
            let _ = self.write_locks.lock().remove(&log_path);
        }
        Ok(existed)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────

    /// All persisted events for a session, in append order.
    pub fn read_all(
        &self,
        session_id: &str,
        app: Option<&str>,
        workspace: Option<&str>,
    ) -> Result<Vec<PersistedEvent>> {
        let namespace = self.resolve(session_id, app, workspace)?;
        self.read_log(&namespace, session_id)
    }

    /// Events with `timestamp >= ts`. The boundary is inclusive so a reader
    /// resuming from its last seen timestamp never misses a record written
    /// in the same millisecond (at-least-once, duplicates possible).
    pub fn read_since(
        &self,
        session_id: &str,
        ts: i64,
        app: Option<&str>,
        workspace: Option<&str>,
    ) -> Result<Vec<PersistedEvent>> {
        let mut events = self.read_all(session_id, app, workspace)?;
        events.retain(|record| record.timestamp >= ts);
        Ok(events)
    }

    /// Session ids present in the namespace, unordered. An absent namespace
    /// directory is an empty namespace, not an error.
    pub fn list(&self, app: Option<&str>, workspace: Option<&str>) -> Result<Vec<String>> {
        let Some(namespace) = Namespace::resolve(app, workspace) else {
            return Ok(Vec::new());
        };
        let dir = self.root.join(namespace.dir());
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "jsonl")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                sessions.push(stem.to_string());
            }
        }
        Ok(sessions)
    }

    /// Session metadata sidecar.
    pub fn metadata(
        &self,
        session_id: &str,
        app: Option<&str>,
        workspace: Option<&str>,
    ) -> Result<SessionMetadata> {
        let namespace = self.resolve(session_id, app, workspace)?;
        self.read_metadata(&namespace, session_id)
    }

    /// Find the task a session was started for.
    ///
    /// Answers from the metadata sidecar when already known; otherwise
    /// scans the log for the first record whose payload carries a `taskId`
    /// marker, back-fills the sidecar, and returns it. A session with no
    /// marker yields `None`.
    #[instrument(skip(self), fields(session_id))]
    pub fn derive_task_id(
        &self,
        session_id: &str,
        app: Option<&str>,
        workspace: Option<&str>,
    ) -> Result<Option<String>> {
        let namespace = self.resolve(session_id, app, workspace)?;
        let mut metadata = self.read_metadata(&namespace, session_id)?;
        if metadata.task_id.is_some() {
            return Ok(metadata.task_id);
        }

        let records = self.read_log(&namespace, session_id)?;
        let Some(task_id) = records.iter().find_map(|record| {
            record
                .payload
                .get("taskId")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        }) else {
            return Ok(None);
        };

        metadata.task_id = Some(task_id.clone());
        let meta_path = self.meta_path(&namespace, session_id);
        let lock = self.write_lock_for(&self.log_path(&namespace, session_id));
        let _guard = lock.lock();
        self.write_metadata(&meta_path, &metadata)?;
        debug!(task_id = %task_id, "task id back-filled");
        Ok(Some(task_id))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn resolve(
        &self,
        session_id: &str,
        app: Option<&str>,
        workspace: Option<&str>,
    ) -> Result<Namespace> {
        Namespace::resolve(app, workspace)
            .ok_or_else(|| StoreError::MissingNamespace(session_id.to_string()))
    }

    fn log_path(&self, namespace: &Namespace, session_id: &str) -> PathBuf {
        self.root
            .join(namespace.dir())
            .join(format!("{session_id}.jsonl"))
    }

    fn meta_path(&self, namespace: &Namespace, session_id: &str) -> PathBuf {
        self.root
            .join(namespace.dir())
            .join(format!("{session_id}.meta.json"))
    }

    fn write_lock_for(&self, log_path: &PathBuf) -> Arc<Mutex<()>> {
        let mut locks = self.write_locks.lock();

        // Opportunistically prune dead weak refs when the map grows.
        if locks.len() > 128 {
            locks.retain(|_, weak| weak.strong_count() > 0);
        }

        if let Some(existing) = locks.get(log_path).and_then(Weak::upgrade) {
            return existing;
        }
        let lock = Arc::new(Mutex::new(()));
        let _ = locks.insert(log_path.clone(), Arc::downgrade(&lock));
        lock
    }

    fn read_log(&self, namespace: &Namespace, session_id: &str) -> Result<Vec<PersistedEvent>> {
        let log_path = self.log_path(namespace, session_id);
        let file = match File::open(&log_path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::SessionNotFound(session_id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<PersistedEvent>(&line) {
                Ok(record) => records.push(record),
                // A torn final line from a crashed writer is skipped, not fatal.
                Err(err) => warn!(session_id, error = %err, "skipping corrupt log line"),
            }
        }
        Ok(records)
    }

    fn read_metadata(&self, namespace: &Namespace, session_id: &str) -> Result<SessionMetadata> {
        let meta_path = self.meta_path(namespace, session_id);
        let text = match fs::read_to_string(&meta_path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::SessionNotFound(session_id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&text)?)
    }

    fn write_metadata(&self, meta_path: &PathBuf, metadata: &SessionMetadata) -> Result<()> {
        let file = File::create(meta_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, metadata)?;
        writer.flush()?;
        Ok(())
    }
}

fn remove_if_present(path: &PathBuf) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
