//! Revocable preview handles for selected files

use log::warn;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::selection::SelectedFile;

/// Locally scoped reference to a renderable copy of a selected file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Creates and releases preview handles.
///
/// The registry calls `revoke` exactly once per handle, when the owning entry is
/// removed or the registry is torn down.
pub trait PreviewStore: Send + Sync {
    fn create(&self, file: &SelectedFile) -> PreviewHandle;
    fn revoke(&self, handle: &PreviewHandle);
}

/// In-process preview store handing out `preview://<uuid>` handles.
#[derive(Debug, Default)]
pub struct LocalPreviews {
    live: Mutex<HashMap<PreviewHandle, String>>,
}

impl LocalPreviews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    pub fn is_live(&self, handle: &PreviewHandle) -> bool {
        self.live
            .lock()
            .map(|live| live.contains_key(handle))
            .unwrap_or(false)
    }

    /// File name the handle was created for, while it is live.
    pub fn source_name(&self, handle: &PreviewHandle) -> Option<String> {
        self.live.lock().ok()?.get(handle).cloned()
    }
}

impl PreviewStore for LocalPreviews {
    fn create(&self, file: &SelectedFile) -> PreviewHandle {
        let handle = PreviewHandle::new(format!("preview://{}", uuid::Uuid::new_v4()));
        if let Ok(mut live) = self.live.lock() {
            live.insert(handle.clone(), file.name().to_string());
        }
        handle
    }

    fn revoke(&self, handle: &PreviewHandle) {
        let removed = self
            .live
            .lock()
            .map(|mut live| live.remove(handle).is_some())
            .unwrap_or(false);
        if !removed {
            warn!("preview_revoke: {} was not live", handle);
        }
    }
}
