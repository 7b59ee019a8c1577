//! Posts store client: list, streamed multipart create, delete

use bytes::Bytes;
use futures_util::stream;
use futures_util::{Stream, StreamExt};
use log::{debug, info, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response};
use serde::de::DeserializeOwned;
use std::io;
use std::pin::Pin;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::types::{
    CreatedPost, PostRecord, ProgressSender, UploadFile, UploadProgress, UploadSource,
};

/// Chunk size used when streaming an upload body (64 KB)
const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

type ChunkStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync>>;

#[derive(Debug, Clone)]
pub struct PostsClient {
    client: Client,
    base_url: String,
}

impl PostsClient {
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_env() -> ClientResult<Self> {
        Self::new(&ClientConfig::from_env()?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn posts_url(&self) -> String {
        format!("{}/posts", self.base_url)
    }

    fn post_url(&self, id: &str) -> String {
        format!("{}/posts/{}", self.base_url, urlencoding::encode(id))
    }

    /// `GET posts`
    pub async fn list_posts(&self) -> ClientResult<Vec<PostRecord>> {
        let response = self.client.get(self.posts_url()).send().await?;
        let records: Vec<PostRecord> = read_json(response).await?;
        info!("list_posts: {} records", records.len());
        Ok(records)
    }

    /// `POST posts` with the file streamed as multipart field `file`.
    ///
    /// Progress is sent as each chunk of the file is handed to the request body, so the
    /// last report before the response may be below 100%.
    pub async fn create_post(
        &self,
        file: UploadFile,
        progress: ProgressSender,
    ) -> ClientResult<CreatedPost> {
        let (chunks, total_bytes) = open_source(&file.source).await?;
        let name = file.name;

        let mut loaded: u64 = 0;
        let mut next_log_percent: u8 = 10;
        let log_name = name.clone();
        let stream = chunks.map(move |chunk_result| {
            let chunk = chunk_result?;
            loaded += chunk.len() as u64;

            let report = UploadProgress {
                loaded,
                total: total_bytes,
            };
            let percent = report.percent();
            if percent >= next_log_percent {
                debug!(
                    "create_post_progress: {} percent={} bytes={}",
                    log_name, percent, loaded
                );
                next_log_percent = percent.saturating_add(10);
            }
            let _ = progress.send(report);

            Ok::<Bytes, io::Error>(chunk)
        });

        let part = Part::stream_with_length(Body::wrap_stream(stream), total_bytes)
            .file_name(name.clone());
        let form = Form::new().part("file", part);

        info!("create_post_start: {} total_bytes={}", name, total_bytes);
        let response = self.client.post(self.posts_url()).multipart(form).send().await?;
        let created: CreatedPost = read_json(response).await?;
        info!("create_post_done: {} -> {}", name, created.id);
        Ok(created)
    }

    /// `DELETE posts/{id}`; any 2xx is success.
    pub async fn delete_post(&self, id: &str) -> ClientResult<()> {
        let response = self.client.delete(self.post_url(id)).send().await?;
        ensure_success(response).await?;
        info!("delete_post: {}", id);
        Ok(())
    }
}

async fn open_source(source: &UploadSource) -> ClientResult<(ChunkStream, u64)> {
    match source {
        UploadSource::Bytes(bytes) => {
            let total = bytes.len() as u64;
            let bytes = bytes.clone();
            let chunks: Vec<Bytes> = (0..bytes.len())
                .step_by(UPLOAD_CHUNK_SIZE)
                .map(|start| bytes.slice(start..(start + UPLOAD_CHUNK_SIZE).min(bytes.len())))
                .collect();
            Ok((Box::pin(stream::iter(chunks.into_iter().map(Ok))), total))
        }
        UploadSource::Path(path) => {
            let file = File::open(path).await?;
            let total = file.metadata().await?.len();
            Ok((
                Box::pin(ReaderStream::with_capacity(file, UPLOAD_CHUNK_SIZE)),
                total,
            ))
        }
    }
}

async fn ensure_success(response: Response) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!("posts store responded {}: {}", status, body);
    Err(ClientError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let response = ensure_success(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
