//! Wire records and upload payloads

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// A stored file as returned by `GET posts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub size: u64,
    pub url: String,
}

/// Response body of a successful `POST posts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedPost {
    #[serde(alias = "_id")]
    pub id: String,
    pub url: String,
}

/// Cumulative bytes sent for one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl UploadProgress {
    /// `round(loaded * 100 / total)`, clamped to 100. Zero when the total is unknown.
    pub fn percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let percent = ((self.loaded as f64 * 100.0) / self.total as f64).round();
        percent.min(100.0) as u8
    }
}

pub type ProgressSender = mpsc::UnboundedSender<UploadProgress>;

/// Where the bytes of an upload come from.
#[derive(Debug, Clone)]
pub enum UploadSource {
    Bytes(Bytes),
    Path(PathBuf),
}

/// A file to send as the `file` field of a multipart `POST posts`.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub source: UploadSource,
}
