//! Session metadata and storage namespacing.
//!
//! A session's event log lives under a namespace derived from the
//! `(workspace, app)` pair supplied when the session is first written.
//! Three layout shapes are supported, including the legacy app-only form.
//! The shape is resolved once at creation and never migrated — reads under
//! a different pair simply miss.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Storage layout for a session's event log.
///
/// An explicit enum rather than per-call inference, so a session cannot
/// silently change location mid-lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// `workspace/app/session` — the current full shape.
    WorkspaceApp {
        /// Workspace identifier.
        workspace: String,
        /// Application identifier.
        app: String,
    },
    /// `workspace/session` — app omitted.
    WorkspaceOnly {
        /// Workspace identifier.
        workspace: String,
    },
    /// `app/session` — workspace omitted (legacy).
    AppOnly {
        /// Application identifier.
        app: String,
    },
}

impl Namespace {
    /// Resolve a namespace from an optional `(app, workspace)` pair.
    ///
    /// Returns `None` when both are absent — such sessions have no
    /// namespaced home and are rejected by the store.
    #[must_use]
    pub fn resolve(app: Option<&str>, workspace: Option<&str>) -> Option<Self> {
        match (workspace, app) {
            (Some(workspace), Some(app)) => Some(Self::WorkspaceApp {
                workspace: workspace.to_string(),
                app: app.to_string(),
            }),
            (Some(workspace), None) => Some(Self::WorkspaceOnly {
                workspace: workspace.to_string(),
            }),
            (None, Some(app)) => Some(Self::AppOnly {
                app: app.to_string(),
            }),
            (None, None) => None,
        }
    }

    /// Relative directory for this namespace under a store root.
    #[must_use]
    pub fn dir(&self) -> PathBuf {
        match self {
            Self::WorkspaceApp { workspace, app } => PathBuf::from(workspace).join(app),
            Self::WorkspaceOnly { workspace } => PathBuf::from(workspace),
            Self::AppOnly { app } => PathBuf::from(app),
        }
    }
}

/// Metadata describing a session, fixed at creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    /// Session identifier.
    pub session_id: String,
    /// Workspace the session belongs to, when namespaced by one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    /// Application the session belongs to, when namespaced by one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app: Option<String>,
    /// Creation time, epoch milliseconds.
    pub created_at: i64,
    /// Task the session was started for, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}
