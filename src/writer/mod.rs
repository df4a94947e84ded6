//! Streaming transfers on top of the [`Client`](crate::client::Client) calls

pub mod downloader;
pub mod uploader;
