//! Turns drop-zone and file-picker gestures into upload submissions.
//!
//! Each file in a gesture becomes its own upload through
//! [`Session::submit_upload`]; a file that cannot be captured from disk is
//! reported on the timeline and back to the caller without touching its
//! siblings.

use std::path::PathBuf;

use super::documents::LocalFile;
use super::error::SessionError;
use super::session::{PendingRequest, Session};

/// What the host should do with the native event after the adapter handled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct EventDisposition {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventDisposition {
    /// Swallow the event so the host does not navigate to the dropped file.
    pub const CONSUMED: Self = Self {
        prevent_default: true,
        stop_propagation: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Enter,
    Over,
    Leave,
}

/// Outcome of forwarding a gesture's files.
#[derive(Debug, Default)]
pub struct FileBatch {
    pub uploads: Vec<PendingRequest>,
    pub unreadable: Vec<SessionError>,
}

impl FileBatch {
    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty() && self.unreadable.is_empty()
    }
}

/// Reads every path, keeping the ones that could be captured.
pub async fn capture_files(paths: &[PathBuf]) -> (Vec<LocalFile>, Vec<SessionError>) {
    let mut files = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();

    for path in paths {
        match LocalFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(error) => {
                tracing::warn!(path = %path.display(), error = %error, "skipping unreadable file");
                unreadable.push(error);
            }
        }
    }

    (files, unreadable)
}

async fn forward_paths(session: &Session, paths: &[PathBuf]) -> FileBatch {
    let (files, unreadable) = capture_files(paths).await;
    for error in &unreadable {
        session.report_unreadable(error);
    }
    FileBatch {
        uploads: session.submit_uploads(files),
        unreadable,
    }
}

/// Drop target that tracks whether a drag is hovering over it.
pub struct DropZone {
    session: Session,
    drag_active: bool,
}

impl DropZone {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            drag_active: false,
        }
    }

    pub fn is_drag_active(&self) -> bool {
        self.drag_active
    }

    pub fn on_drag(&mut self, phase: DragPhase) -> EventDisposition {
        self.drag_active = match phase {
            DragPhase::Enter | DragPhase::Over => true,
            DragPhase::Leave => false,
        };
        EventDisposition::CONSUMED
    }

    /// Forwards files the host already captured.
    pub fn on_drop(&mut self, files: Vec<LocalFile>) -> (EventDisposition, Vec<PendingRequest>) {
        self.drag_active = false;
        tracing::debug!(file_count = files.len(), "files dropped");
        (EventDisposition::CONSUMED, self.session.submit_uploads(files))
    }

    /// Forwards dropped paths, reading each from disk first.
    pub async fn on_drop_paths(&mut self, paths: &[PathBuf]) -> (EventDisposition, FileBatch) {
        self.drag_active = false;
        tracing::debug!(file_count = paths.len(), "paths dropped");
        (EventDisposition::CONSUMED, forward_paths(&self.session, paths).await)
    }
}

/// File chooser whose selection only counts when it differs from the last one.
///
/// Call [`FilePicker::trigger`] before each prompt so picking the same file
/// again is still seen as a new selection.
pub struct FilePicker {
    session: Session,
    value: Vec<PathBuf>,
}

impl FilePicker {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            value: Vec::new(),
        }
    }

    pub fn trigger(&mut self) {
        self.value.clear();
    }

    pub fn value(&self) -> &[PathBuf] {
        &self.value
    }

    /// Applies a selection; an unchanged or empty selection forwards nothing.
    pub async fn on_change(&mut self, selection: Vec<PathBuf>) -> FileBatch {
        if selection.is_empty() || selection == self.value {
            tracing::debug!("file picker selection unchanged");
            return FileBatch::default();
        }

        self.value = selection;
        forward_paths(&self.session, &self.value).await
    }
}
