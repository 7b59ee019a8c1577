#![allow(dead_code)]

use async_trait::async_trait;
use filedrop::{
    PreviewHandle, PreviewStore, RemoteStore, SelectedFile, SharedRegistry, StoreError,
    StoreResult, UploadEntry,
};
use posts_client::{CreatedPost, PostRecord, ProgressSender, UploadFile, UploadProgress};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// One scripted step of a fake upload.
#[derive(Debug, Clone)]
pub enum Step {
    Progress { loaded: u64, total: u64 },
    Succeed { id: String, url: String },
    Fail { status: u16 },
}

impl Step {
    pub fn progress(loaded: u64, total: u64) -> Self {
        Step::Progress { loaded, total }
    }

    pub fn succeed(id: &str, url: &str) -> Self {
        Step::Succeed {
            id: id.to_string(),
            url: url.to_string(),
        }
    }
}

/// In-memory store whose uploads are driven step by step from the test.
#[derive(Default)]
pub struct ScriptedStore {
    scripts: Mutex<HashMap<String, mpsc::UnboundedReceiver<Step>>>,
    history: Mutex<Option<Result<Vec<PostRecord>, u16>>>,
    failing_deletes: Mutex<HashMap<String, u16>>,
    deleted: Mutex<Vec<String>>,
}

impl ScriptedStore {
    /// Steps sent here drive the upload of the file named `name`.
    pub fn script(&self, name: &str) -> mpsc::UnboundedSender<Step> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.scripts.lock().unwrap().insert(name.to_string(), rx);
        tx
    }

    pub fn set_history(&self, records: Vec<PostRecord>) {
        *self.history.lock().unwrap() = Some(Ok(records));
    }

    pub fn fail_history(&self, status: u16) {
        *self.history.lock().unwrap() = Some(Err(status));
    }

    pub fn fail_delete(&self, id: &str, status: u16) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert(id.to_string(), status);
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

fn status_error(status: u16, body: &str) -> StoreError {
    StoreError::Status {
        status,
        body: body.to_string(),
    }
}

#[async_trait]
impl RemoteStore for ScriptedStore {
    async fn list(&self) -> StoreResult<Vec<PostRecord>> {
        let history = self.history.lock().unwrap().clone();
        match history {
            Some(Ok(records)) => Ok(records),
            Some(Err(status)) => Err(status_error(status, "history unavailable")),
            None => Ok(Vec::new()),
        }
    }

    async fn create(&self, file: UploadFile, progress: ProgressSender) -> StoreResult<CreatedPost> {
        let script = self.scripts.lock().unwrap().remove(&file.name);
        let Some(mut steps) = script else {
            return Err(status_error(500, "no script for file"));
        };

        while let Some(step) = steps.recv().await {
            match step {
                Step::Progress { loaded, total } => {
                    let _ = progress.send(UploadProgress { loaded, total });
                }
                Step::Succeed { id, url } => return Ok(CreatedPost { id, url }),
                Step::Fail { status } => return Err(status_error(status, "upload rejected")),
            }
        }
        Err(status_error(499, "script ended"))
    }

    async fn delete(&self, id: &str) -> StoreResult<()> {
        let failing = self.failing_deletes.lock().unwrap().get(id).copied();
        if let Some(status) = failing {
            return Err(status_error(status, "delete rejected"));
        }
        self.deleted.lock().unwrap().push(id.to_string());
        Ok(())
    }
}

/// Preview store that counts releases per handle.
#[derive(Default)]
pub struct CountingPreviews {
    next: AtomicUsize,
    created: Mutex<Vec<PreviewHandle>>,
    releases: Mutex<HashMap<PreviewHandle, usize>>,
}

impl CountingPreviews {
    pub fn created(&self) -> Vec<PreviewHandle> {
        self.created.lock().unwrap().clone()
    }

    pub fn releases_of(&self, handle: &PreviewHandle) -> usize {
        self.releases
            .lock()
            .unwrap()
            .get(handle)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_releases(&self) -> usize {
        self.releases.lock().unwrap().values().sum()
    }
}

impl PreviewStore for CountingPreviews {
    fn create(&self, _file: &SelectedFile) -> PreviewHandle {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let handle = PreviewHandle::new(format!("preview://test-{}", n));
        self.created.lock().unwrap().push(handle.clone());
        handle
    }

    fn revoke(&self, handle: &PreviewHandle) {
        *self
            .releases
            .lock()
            .unwrap()
            .entry(handle.clone())
            .or_insert(0) += 1;
    }
}

pub fn registry_with(previews: &Arc<CountingPreviews>) -> SharedRegistry {
    let previews: Arc<dyn PreviewStore> = previews.clone();
    SharedRegistry::new(previews)
}

pub fn file(name: &str, size: usize) -> SelectedFile {
    SelectedFile::from_bytes(name, vec![0u8; size])
}

pub fn record(id: &str, name: &str, size: u64) -> PostRecord {
    PostRecord {
        id: id.to_string(),
        name: name.to_string(),
        size,
        url: format!("http://store/{}", id),
    }
}

/// Wait until the latest registry snapshot satisfies `pred`.
pub async fn wait_for<F>(
    rx: &mut watch::Receiver<Vec<UploadEntry>>,
    mut pred: F,
) -> Vec<UploadEntry>
where
    F: FnMut(&[UploadEntry]) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if pred(&snapshot) {
                    return snapshot.clone();
                }
            }
            rx.changed().await.expect("registry dropped");
        }
    })
    .await
    .expect("timed out waiting for registry state")
}
