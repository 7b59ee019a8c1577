//! Upload orchestration: selection -> entries -> upload tasks -> registry updates
//!
//! Each selected file gets its own tokio task. The task owns the raw file, forwards
//! progress messages from the store into the registry, and applies exactly one
//! terminal update (uploaded or failed). Tasks never wait on each other.

use futures_util::future::join_all;
use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::entry::{EntryPatch, UploadEntry};
use crate::registry::{RegistryError, SharedRegistry};
use crate::selection::SelectedFile;
use crate::store::{RemoteStore, StoreError};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Uploads started by one selection.
pub struct UploadBatch {
    ids: Vec<String>,
    handles: Vec<JoinHandle<()>>,
}

impl UploadBatch {
    /// Local ids of the new entries, in selection order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Wait for every upload in the batch to resolve.
    pub async fn join(self) {
        for result in join_all(self.handles).await {
            if let Err(e) = result {
                warn!("upload task panicked: {}", e);
            }
        }
    }
}

pub struct Orchestrator<S: RemoteStore + 'static> {
    store: Arc<S>,
    registry: SharedRegistry,
}

impl<S: RemoteStore + 'static> Clone for Orchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<S: RemoteStore + 'static> Orchestrator<S> {
    pub fn new(store: Arc<S>, registry: SharedRegistry) -> Self {
        Self { store, registry }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Track and start uploading a batch of selected files.
    ///
    /// All entries are appended in selection order before any upload starts.
    pub async fn handle_selection(
        &self,
        files: Vec<SelectedFile>,
    ) -> Result<UploadBatch, OrchestratorError> {
        let previews = self.registry.previews();
        let mut entries = Vec::with_capacity(files.len());
        let mut jobs = Vec::with_capacity(files.len());

        for file in files {
            let preview = previews.create(&file);
            let entry = UploadEntry::selected(Uuid::new_v4().to_string(), &file, preview);
            jobs.push((entry.id.clone(), file));
            entries.push(entry);
        }

        if let Err(e) = self.registry.append(entries.clone()).await {
            for entry in &entries {
                if let Some(handle) = entry.preview.local_handle() {
                    previews.revoke(handle);
                }
            }
            return Err(e.into());
        }

        let mut ids = Vec::with_capacity(jobs.len());
        let mut handles = Vec::with_capacity(jobs.len());
        for (entry_id, file) in jobs {
            ids.push(entry_id.clone());
            handles.push(tokio::spawn(run_upload(
                self.store.clone(),
                self.registry.clone(),
                entry_id,
                file,
            )));
        }

        Ok(UploadBatch { ids, handles })
    }

    /// Delete remotely, then drop the entry. On failure the entry stays as it was.
    ///
    /// `id` is the registry key; the store is addressed by the entry's remote id.
    pub async fn handle_deletion(&self, id: &str) -> Result<(), OrchestratorError> {
        let store_id = match self.registry.get(id).await {
            Some(entry) => entry.store_id().to_string(),
            None => id.to_string(),
        };

        if let Err(e) = self.store.delete(&store_id).await {
            warn!("delete_failed: {} (remote {}) error={}", id, store_id, e);
            return Err(e.into());
        }

        if self.registry.remove(id).await.is_none() {
            warn!("delete: {} was removed remotely but no longer tracked", id);
        }
        Ok(())
    }

    /// Seed the registry with every stored file. Either all records are added or none.
    pub async fn load_history(&self) -> Result<usize, OrchestratorError> {
        let records = match self.store.list().await {
            Ok(records) => records,
            Err(e) => {
                warn!("load_history failed: {}", e);
                return Err(e.into());
            }
        };

        let entries: Vec<UploadEntry> = records
            .into_iter()
            .map(UploadEntry::from_history)
            .collect();
        let count = entries.len();
        self.registry.append(entries).await?;
        info!("load_history: {} entries", count);
        Ok(count)
    }

    /// Release every preview handle and drop all entries. No remote effect.
    pub async fn teardown(&self) -> usize {
        self.registry.teardown().await
    }
}

async fn run_upload<S: RemoteStore + ?Sized>(
    store: Arc<S>,
    registry: SharedRegistry,
    entry_id: String,
    file: SelectedFile,
) {
    info!(
        "upload_start: {} name={} size={}",
        entry_id,
        file.name(),
        file.size()
    );

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let upload = store.create(file.into_upload(), progress_tx);
    tokio::pin!(upload);

    let result = loop {
        tokio::select! {
            biased;
            Some(progress) = progress_rx.recv() => {
                registry
                    .update(&entry_id, EntryPatch::progress(progress.percent()))
                    .await;
            }
            result = &mut upload => break result,
        }
    };

    // Reports queued right before resolution still precede the terminal update
    while let Ok(progress) = progress_rx.try_recv() {
        registry
            .update(&entry_id, EntryPatch::progress(progress.percent()))
            .await;
    }

    match result {
        Ok(created) => {
            info!("upload_status: {} -> uploaded as {}", entry_id, created.id);
            registry
                .update(&entry_id, EntryPatch::uploaded(created.id, created.url))
                .await;
        }
        Err(e) => {
            warn!("upload_status: {} -> error={}", entry_id, e);
            registry.update(&entry_id, EntryPatch::failed()).await;
        }
    }
}
