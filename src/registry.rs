//! Upload task registry: the ordered list of tracked entries
//!
//! Every effective mutation publishes a fresh snapshot on a `watch` channel and a
//! `RegistryEvent` on a `broadcast` channel, so a renderer can either redraw from the
//! latest list or react to individual changes.

use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};

use crate::entry::{EntryPatch, EntryStatus, EntryView, UploadEntry};
use crate::preview::PreviewStore;

/// Capacity of the registry event channel; slow subscribers observe `Lagged`.
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Entry id already tracked: {0}")]
    DuplicateId(String),
    #[error("Registry has been torn down")]
    TornDown,
}

/// Change notification payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RegistryEvent {
    Appended {
        ids: Vec<String>,
    },
    Updated {
        id: String,
        rebound_from: Option<String>,
        status: EntryStatus,
        progress: u8,
    },
    Removed {
        id: String,
    },
    TornDown {
        released: usize,
    },
}

/// Entry counts for a list header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub total: usize,
    pub uploading: usize,
    pub uploaded: usize,
    pub failed: usize,
}

pub struct Registry {
    entries: Vec<UploadEntry>,
    previews: Arc<dyn PreviewStore>,
    snapshot_tx: watch::Sender<Vec<UploadEntry>>,
    events_tx: broadcast::Sender<RegistryEvent>,
    torn_down: bool,
}

impl Registry {
    pub fn new(previews: Arc<dyn PreviewStore>) -> Self {
        let (snapshot_tx, _) = watch::channel(Vec::new());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            entries: Vec::new(),
            previews,
            snapshot_tx,
            events_tx,
            torn_down: false,
        }
    }

    /// Insert entries at the end, keeping their order. Nothing is inserted if any id
    /// is already tracked or repeats within `entries`.
    pub fn append(&mut self, entries: Vec<UploadEntry>) -> Result<(), RegistryError> {
        if self.torn_down {
            return Err(RegistryError::TornDown);
        }
        if entries.is_empty() {
            return Ok(());
        }

        let mut seen: HashSet<&str> = self.entries.iter().map(|e| e.id.as_str()).collect();
        for entry in &entries {
            if !seen.insert(entry.id.as_str()) {
                return Err(RegistryError::DuplicateId(entry.id.clone()));
            }
        }

        let ids: Vec<String> = entries.iter().map(|e| e.id.clone()).collect();
        self.entries.extend(entries);
        info!("registry_append: {} entries, {} tracked", ids.len(), self.entries.len());
        self.publish(RegistryEvent::Appended { ids });
        Ok(())
    }

    /// Merge `patch` into the entry with `id`. Unknown ids are ignored, which covers
    /// events that arrive after the entry was removed. Returns whether anything changed.
    pub fn update(&mut self, id: &str, patch: EntryPatch) -> bool {
        let Some(index) = self.position(id) else {
            debug!("registry_update: {} not tracked, dropping", id);
            return false;
        };

        let mut patch = patch;
        if let Some(new_id) = patch.id.as_deref() {
            let taken = self
                .entries
                .iter()
                .enumerate()
                .any(|(i, e)| i != index && e.id == new_id);
            if taken {
                warn!(
                    "registry_update: {} cannot take id {} already held by another entry",
                    id, new_id
                );
                patch.id = None;
            }
        }

        let entry = &mut self.entries[index];
        if !entry.apply(&patch) {
            return false;
        }

        let rebound_from = (entry.id != id).then(|| id.to_string());
        if let Some(previous) = &rebound_from {
            info!("registry_rebind: {} -> {}", previous, entry.id);
        }
        let event = RegistryEvent::Updated {
            id: entry.id.clone(),
            rebound_from,
            status: entry.status(),
            progress: entry.progress,
        };
        self.publish(event);
        true
    }

    /// Remove the entry with `id`, releasing its local preview handle.
    pub fn remove(&mut self, id: &str) -> Option<UploadEntry> {
        let index = self.position(id)?;
        let entry = self.entries.remove(index);
        if let Some(handle) = entry.preview.local_handle() {
            self.previews.revoke(handle);
        }
        info!("registry_remove: {}", id);
        self.publish(RegistryEvent::Removed { id: id.to_string() });
        Some(entry)
    }

    pub fn get(&self, id: &str) -> Option<&UploadEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> Vec<UploadEntry> {
        self.entries.clone()
    }

    pub fn views(&self) -> Vec<EntryView> {
        self.entries.iter().map(UploadEntry::view).collect()
    }

    pub fn summary(&self) -> RegistrySummary {
        self.entries
            .iter()
            .fold(RegistrySummary::default(), |mut summary, entry| {
                summary.total += 1;
                match entry.status() {
                    EntryStatus::Uploading => summary.uploading += 1,
                    EntryStatus::Uploaded => summary.uploaded += 1,
                    EntryStatus::Failed => summary.failed += 1,
                }
                summary
            })
    }

    /// Latest snapshot, updated after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<Vec<UploadEntry>> {
        self.snapshot_tx.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events_tx.subscribe()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Drop every entry and release all live preview handles. Later calls release
    /// nothing. Returns the number of handles released.
    pub fn teardown(&mut self) -> usize {
        if self.torn_down {
            return 0;
        }
        self.torn_down = true;

        let released = self.release_all();
        info!("registry_teardown: released {} previews", released);
        self.publish(RegistryEvent::TornDown { released });
        released
    }

    fn release_all(&mut self) -> usize {
        let mut released = 0;
        for entry in self.entries.drain(..) {
            if let Some(handle) = entry.preview.local_handle() {
                self.previews.revoke(handle);
                released += 1;
            }
        }
        released
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    fn publish(&self, event: RegistryEvent) {
        self.snapshot_tx.send_replace(self.entries.clone());
        let _ = self.events_tx.send(event);
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let released = self.release_all();
        if released > 0 {
            debug!("registry_drop: released {} previews", released);
        }
    }
}

/// Registry shared between the orchestrator, its upload tasks, and renderers.
///
/// Each call holds the lock for the whole operation, so observers never see a
/// partially applied mutation.
#[derive(Clone)]
pub struct SharedRegistry {
    inner: Arc<Mutex<Registry>>,
    previews: Arc<dyn PreviewStore>,
}

impl SharedRegistry {
    pub fn new(previews: Arc<dyn PreviewStore>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry::new(previews.clone()))),
            previews,
        }
    }

    pub fn previews(&self) -> &Arc<dyn PreviewStore> {
        &self.previews
    }

    pub async fn append(&self, entries: Vec<UploadEntry>) -> Result<(), RegistryError> {
        self.inner.lock().await.append(entries)
    }

    pub async fn update(&self, id: &str, patch: EntryPatch) -> bool {
        self.inner.lock().await.update(id, patch)
    }

    pub async fn remove(&self, id: &str) -> Option<UploadEntry> {
        self.inner.lock().await.remove(id)
    }

    pub async fn get(&self, id: &str) -> Option<UploadEntry> {
        self.inner.lock().await.get(id).cloned()
    }

    pub async fn snapshot(&self) -> Vec<UploadEntry> {
        self.inner.lock().await.snapshot()
    }

    pub async fn views(&self) -> Vec<EntryView> {
        self.inner.lock().await.views()
    }

    pub async fn summary(&self) -> RegistrySummary {
        self.inner.lock().await.summary()
    }

    pub async fn subscribe(&self) -> watch::Receiver<Vec<UploadEntry>> {
        self.inner.lock().await.subscribe()
    }

    pub async fn events(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.lock().await.events()
    }

    pub async fn teardown(&self) -> usize {
        self.inner.lock().await.teardown()
    }
}
