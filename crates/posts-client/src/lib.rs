//! HTTP client for the `posts` file store
//!
//! This crate is organized into modules:
//! - `config`: Base URL and connect timeout, optionally read from the environment
//! - `types`: Wire records and upload payloads
//! - `client`: List, streamed multipart create, and delete
//! - `error`: Client error type

mod client;
mod config;
mod error;
mod types;

pub use client::PostsClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use types::{CreatedPost, PostRecord, ProgressSender, UploadFile, UploadProgress, UploadSource};
