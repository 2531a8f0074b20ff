//! Per-file transfer status and the aggregate view of the current selection.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::descriptor::FileDescriptor;
use crate::error::StatusError;

/// Lifecycle of one file within a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransferStatus {
    Pending,
    Reading,
    Uploading,
    Succeeded,
    Failed,
}

impl TransferStatus {
    /// Returns true for `Succeeded` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferStatus::Succeeded | TransferStatus::Failed)
    }

    /// Whether `next` directly follows `self` in the allowed sequence.
    pub fn can_advance_to(self, next: TransferStatus) -> bool {
        use TransferStatus::*;
        matches!(
            (self, next),
            (Pending, Reading)
                | (Reading, Uploading)
                | (Reading, Failed)
                | (Uploading, Succeeded)
                | (Uploading, Failed)
        )
    }

    /// Indicator shown next to the file.
    pub fn marker(self) -> StatusMarker {
        match self {
            TransferStatus::Pending | TransferStatus::Reading | TransferStatus::Uploading => {
                StatusMarker::Spinner
            }
            TransferStatus::Succeeded => StatusMarker::Success,
            TransferStatus::Failed => StatusMarker::Failure,
        }
    }
}

/// Status indicator rendered per row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusMarker {
    Spinner,
    Success,
    Failure,
}

/// Addresses one file's entry within one selection.
///
/// Keys from an older selection stay valid values but no longer match the
/// tracker, which is how stale pipeline writes are recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryKey {
    generation: u64,
    index: usize,
}

impl EntryKey {
    /// Selection the entry belongs to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Position of the file within its selection.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// Result of a status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The transition was recorded and published.
    Applied,
    /// The key belongs to a replaced selection; nothing changed.
    Stale,
}

/// One file as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRow {
    pub name: String,
    pub display_size: String,
    pub status: TransferStatus,
    pub marker: StatusMarker,
}

/// Render model of the current selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeView {
    pub generation: u64,
    pub count_label: String,
    pub rows: Vec<FileRow>,
}

impl Default for IntakeView {
    fn default() -> Self {
        Self {
            generation: 0,
            count_label: count_label(0),
            rows: Vec::new(),
        }
    }
}

/// Label shown above the file list.
pub fn count_label(count: usize) -> String {
    format!("{count} Files Selected")
}

struct Entry {
    descriptor: FileDescriptor,
    status: TransferStatus,
}

struct TrackerInner {
    generation: u64,
    entries: Vec<Entry>,
}

impl TrackerInner {
    fn render(&self) -> IntakeView {
        IntakeView {
            generation: self.generation,
            count_label: count_label(self.entries.len()),
            rows: self
                .entries
                .iter()
                .map(|e| FileRow {
                    name: e.descriptor.name().to_string(),
                    display_size: e.descriptor.display_size(),
                    status: e.status,
                    marker: e.status.marker(),
                })
                .collect(),
        }
    }
}

/// Owns the status of every file in the current selection.
///
/// Every change is published as a fresh [`IntakeView`] on a watch channel.
/// A [`reset`](Self::reset) starts a new generation; writes carrying a key
/// from an earlier generation are dropped.
pub struct StatusTracker {
    inner: Mutex<TrackerInner>,
    view_tx: watch::Sender<IntakeView>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTracker {
    /// Creates an empty tracker at generation 0.
    pub fn new() -> Self {
        let (view_tx, _) = watch::channel(IntakeView::default());
        Self {
            inner: Mutex::new(TrackerInner {
                generation: 0,
                entries: Vec::new(),
            }),
            view_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replaces the selection with `descriptors`, all `Pending`.
    ///
    /// Returns one key per descriptor, in order. The new view is published
    /// before this returns, so no per-file write can precede it.
    pub fn reset(&self, descriptors: &[FileDescriptor]) -> Vec<EntryKey> {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.entries = descriptors
            .iter()
            .map(|d| Entry {
                descriptor: d.clone(),
                status: TransferStatus::Pending,
            })
            .collect();

        let generation = inner.generation;
        debug!(generation, files = descriptors.len(), "selection reset");
        self.view_tx.send_replace(inner.render());

        (0..descriptors.len())
            .map(|index| EntryKey { generation, index })
            .collect()
    }

    /// Moves one file to `next`.
    ///
    /// Writes for a replaced selection return [`Advance::Stale`] and leave the
    /// view untouched. Transitions outside the allowed sequence are rejected.
    pub fn advance(&self, key: EntryKey, next: TransferStatus) -> Result<Advance, StatusError> {
        let mut inner = self.lock();
        if key.generation != inner.generation {
            trace!(
                key_generation = key.generation,
                current = inner.generation,
                index = key.index,
                "dropping stale status write"
            );
            return Ok(Advance::Stale);
        }

        let entry = inner
            .entries
            .get_mut(key.index)
            .ok_or(StatusError::UnknownEntry {
                generation: key.generation,
                index: key.index,
            })?;
        if !entry.status.can_advance_to(next) {
            return Err(StatusError::InvalidTransition {
                from: entry.status,
                to: next,
            });
        }
        entry.status = next;

        self.view_tx.send_replace(inner.render());
        Ok(Advance::Applied)
    }

    /// Current status of an entry, or `None` for stale or unknown keys.
    pub fn status(&self, key: EntryKey) -> Option<TransferStatus> {
        let inner = self.lock();
        if key.generation != inner.generation {
            return None;
        }
        inner.entries.get(key.index).map(|e| e.status)
    }

    /// Current generation id.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> IntakeView {
        self.lock().render()
    }

    /// Receiver notified on every published view.
    pub fn subscribe(&self) -> watch::Receiver<IntakeView> {
        self.view_tx.subscribe()
    }
}
