//! Tracked upload entries, partial updates, and the derived render view

use chrono::Utc;
use posts_client::PostRecord;
use serde::{Deserialize, Serialize};

use crate::preview::PreviewHandle;
use crate::selection::SelectedFile;
use crate::size::readable_size;

/// Where an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrySource {
    #[serde(rename = "selected")]
    Selected,
    #[serde(rename = "history")]
    History,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "href", rename_all = "lowercase")]
pub enum Preview {
    /// Must be revoked when the entry goes away.
    Local(PreviewHandle),
    /// Served by the store; nothing to release.
    Remote(String),
}

impl Preview {
    pub fn href(&self) -> &str {
        match self {
            Preview::Local(handle) => handle.as_str(),
            Preview::Remote(url) => url,
        }
    }

    pub fn local_handle(&self) -> Option<&PreviewHandle> {
        match self {
            Preview::Local(handle) => Some(handle),
            Preview::Remote(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadEntry {
    /// Registry key: a local uuid until the upload succeeds, then the remote id.
    pub id: String,
    /// Identity in the store; set once the file is stored.
    pub remote_id: Option<String>,
    pub name: String,
    pub readable_size: String,
    pub preview: Preview,
    pub source: EntrySource,
    pub progress: u8,
    pub uploaded: bool,
    pub error: bool,
    pub url: Option<String>,
    pub added_at: i64,
}

impl UploadEntry {
    /// A fresh entry for a file the user just selected.
    pub fn selected(id: impl Into<String>, file: &SelectedFile, preview: PreviewHandle) -> Self {
        Self {
            id: id.into(),
            remote_id: None,
            name: file.name().to_string(),
            readable_size: readable_size(file.size()),
            preview: Preview::Local(preview),
            source: EntrySource::Selected,
            progress: 0,
            uploaded: false,
            error: false,
            url: None,
            added_at: Utc::now().timestamp(),
        }
    }

    /// An already stored file, as listed by the remote store.
    pub fn from_history(record: PostRecord) -> Self {
        Self {
            remote_id: Some(record.id.clone()),
            id: record.id,
            name: record.name,
            readable_size: readable_size(record.size),
            preview: Preview::Remote(record.url.clone()),
            source: EntrySource::History,
            progress: 0,
            uploaded: true,
            error: false,
            url: Some(record.url),
            added_at: Utc::now().timestamp(),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        !self.uploaded && !self.error
    }

    pub fn status(&self) -> EntryStatus {
        if self.uploaded {
            EntryStatus::Uploaded
        } else if self.error {
            EntryStatus::Failed
        } else {
            EntryStatus::Uploading
        }
    }

    pub fn is_deletable(&self) -> bool {
        self.url.is_some()
    }

    /// Id to address in the store, falling back to the registry key.
    pub fn store_id(&self) -> &str {
        self.remote_id.as_deref().unwrap_or(&self.id)
    }

    /// Merge `patch` field by field. Returns whether anything changed.
    ///
    /// Progress only moves while in flight, each terminal flag is set at most once, an
    /// entry never becomes both uploaded and failed, and the url, remote id and a
    /// rebound id only land on an uploaded entry.
    pub(crate) fn apply(&mut self, patch: &EntryPatch) -> bool {
        let mut changed = false;

        if let Some(progress) = patch.progress {
            let progress = progress.min(100);
            if self.is_in_flight() && self.progress != progress {
                self.progress = progress;
                changed = true;
            }
        }

        if patch.uploaded == Some(true) && self.is_in_flight() {
            self.uploaded = true;
            changed = true;
        }

        if patch.error == Some(true) && self.is_in_flight() {
            self.error = true;
            changed = true;
        }

        if let Some(url) = &patch.url {
            if self.uploaded && self.url.as_ref() != Some(url) {
                self.url = Some(url.clone());
                changed = true;
            }
        }

        if let Some(remote_id) = &patch.remote_id {
            if self.uploaded && self.remote_id.as_ref() != Some(remote_id) {
                self.remote_id = Some(remote_id.clone());
                changed = true;
            }
        }

        if let Some(id) = &patch.id {
            if self.uploaded && *id != self.id {
                self.id = id.clone();
                changed = true;
            }
        }

        changed
    }

    pub fn view(&self) -> EntryView {
        let status = self.status();
        EntryView {
            id: self.id.clone(),
            name: self.name.clone(),
            readable_size: self.readable_size.clone(),
            preview: self.preview.href().to_string(),
            progress: (status == EntryStatus::Uploading).then_some(self.progress),
            status,
            link: self.url.clone(),
            deletable: self.is_deletable(),
        }
    }
}

/// Partial update merged into an entry; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryPatch {
    pub progress: Option<u8>,
    pub uploaded: Option<bool>,
    pub error: Option<bool>,
    pub id: Option<String>,
    pub remote_id: Option<String>,
    pub url: Option<String>,
}

impl EntryPatch {
    pub fn progress(percent: u8) -> Self {
        Self {
            progress: Some(percent),
            ..Self::default()
        }
    }

    /// Successful upload: flips `uploaded`, records the remote id and rebinds the
    /// entry to it.
    pub fn uploaded(remote_id: impl Into<String>, url: impl Into<String>) -> Self {
        let remote_id = remote_id.into();
        Self {
            uploaded: Some(true),
            id: Some(remote_id.clone()),
            remote_id: Some(remote_id),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn failed() -> Self {
        Self {
            error: Some(true),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryStatus {
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "uploaded")]
    Uploaded,
    #[serde(rename = "error")]
    Failed,
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryStatus::Uploading => write!(f, "uploading"),
            EntryStatus::Uploaded => write!(f, "uploaded"),
            EntryStatus::Failed => write!(f, "error"),
        }
    }
}

/// What the presentation layer draws for one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub id: String,
    pub name: String,
    pub readable_size: String,
    pub preview: String,
    /// Present only while the progress indicator is shown.
    pub progress: Option<u8>,
    pub status: EntryStatus,
    pub link: Option<String>,
    pub deletable: bool,
}
