//! Client-side upload manager
//!
//! Selected files become tracked entries in a [`Registry`], each is uploaded to the
//! posts store by its own task, and progress, success, and failure flow back into the
//! registry. Renderers subscribe to registry snapshots or events.

pub mod entry;
pub mod orchestrator;
pub mod preview;
pub mod registry;
pub mod selection;
pub mod size;
pub mod store;

pub use entry::{EntryPatch, EntrySource, EntryStatus, EntryView, Preview, UploadEntry};
pub use orchestrator::{Orchestrator, OrchestratorError, UploadBatch};
pub use preview::{LocalPreviews, PreviewHandle, PreviewStore};
pub use registry::{Registry, RegistryError, RegistryEvent, RegistrySummary, SharedRegistry};
pub use selection::SelectedFile;
pub use size::readable_size;
pub use store::{RemoteStore, StoreError, StoreResult};

pub use posts_client::{ClientConfig, PostsClient};

use std::sync::Arc;

/// Orchestrator talking to the HTTP posts store, with in-process previews.
pub fn connect(config: &ClientConfig) -> Result<Orchestrator<PostsClient>, StoreError> {
    let client = PostsClient::new(config)?;
    let registry = SharedRegistry::new(Arc::new(LocalPreviews::new()));
    Ok(Orchestrator::new(Arc::new(client), registry))
}
