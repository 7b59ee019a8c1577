//! Files handed over by the selection source (drag and drop or a file picker)

use bytes::Bytes;
use posts_client::{UploadFile, UploadSource};
use std::path::{Path, PathBuf};

/// A raw file chosen by the user, not yet uploaded.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    name: String,
    size: u64,
    source: UploadSource,
}

impl SelectedFile {
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            source: UploadSource::Bytes(bytes),
        }
    }

    /// Stat a file on disk; its contents are streamed later by the upload task.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path: PathBuf = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Not a file: {}", path.display()),
            ));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            name,
            size: metadata.len(),
            source: UploadSource::Path(path),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn source(&self) -> &UploadSource {
        &self.source
    }

    pub(crate) fn into_upload(self) -> UploadFile {
        UploadFile {
            name: self.name,
            source: self.source,
        }
    }
}
