use core::task::Poll;
use reqwest::Body;
use std::{
    cmp, io, mem,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

use crate::api::{self, ChunkedUploadStatus, Metadata, Root};
use crate::client::Client;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Dropbox API error: {0}")]
    ApiError(#[from] api::Error),
    #[error("IO error")]
    IoError(#[from] io::Error),
    #[error("Server returned offset {returned} for a chunk sent at {start} with {len} bytes")]
    UnexpectedOffset { returned: u64, start: u64, len: u64 },
}

/// Called with (name, part, position, total). `total` is zero when the length is unknown.
pub type ProgressListener =
    Arc<Mutex<dyn FnMut(Arc<String>, usize, usize, usize) + Send + Sync + 'static>>;

/// Uploads a stream piece by piece through the chunked upload endpoints.
pub struct ChunkedUploader<'a> {
    client: &'a Client,
    name: Arc<String>,
    chunk_size: usize,
    total_len: usize,
    progress_listener: Option<ProgressListener>,
}

impl<'a> ChunkedUploader<'a> {
    pub fn new(
        client: &'a Client,
        name: String,
        progress_listener: Option<ProgressListener>,
    ) -> Self {
        ChunkedUploader {
            client,
            name: Arc::new(name),
            chunk_size: client.config().get_chunk_size(),
            total_len: 0,
            progress_listener,
        }
    }

    pub fn chunk_size(mut self, value: usize) -> Self {
        self.chunk_size = value.max(1);
        self
    }

    /// Only used for progress reporting.
    pub fn total_len(mut self, value: usize) -> Self {
        self.total_len = value;
        self
    }

    /// Sends everything `reader` yields and returns the last status. The upload still has to be
    /// committed.
    pub async fn upload<R: AsyncRead + Unpin>(
        &self,
        reader: &mut R,
    ) -> Result<ChunkedUploadStatus, Error> {
        let mut pending: Vec<u8> = Vec::with_capacity(self.chunk_size);
        let mut last: Option<ChunkedUploadStatus> = None;
        let mut offset = 0u64;
        let mut part = 0usize;
        let mut eof = false;

        loop {
            if !eof && pending.len() < self.chunk_size {
                let want = self.chunk_size - pending.len();
                let read = (&mut *reader)
                    .take(want as u64)
                    .read_to_end(&mut pending)
                    .await?;
                eof = read < want;
            }

            if pending.is_empty() {
                if let Some(status) = last {
                    return Ok(status);
                }
            }

            let data = Arc::new(mem::take(&mut pending));
            let len = data.len() as u64;
            let body = Body::wrap_stream(ProgressStream {
                name: self.name.clone(),
                part,
                base: offset as usize,
                total: self.total_len,
                data: data.clone(),
                cursor: 0,
                progress_listener: self.progress_listener.clone(),
            });

            let upload_id = last.as_ref().map(|s| s.upload_id.as_str());
            let status = self.client.chunked_upload(body, upload_id, offset).await?;

            let accepted = if len == 0 {
                status.offset == offset
            } else {
                status.offset > offset && status.offset <= offset + len
            };
            if !accepted {
                return Err(Error::UnexpectedOffset {
                    returned: status.offset,
                    start: offset,
                    len,
                });
            }

            // the server may take only part of a chunk, the rest goes out first next round
            pending = data[(status.offset - offset) as usize..].to_vec();
            debug!(
                part,
                offset = status.offset,
                resend = pending.len(),
                "chunk uploaded"
            );

            offset = status.offset;
            part += 1;
            last = Some(status);
        }
    }

    /// Uploads `reader` and commits it as the file at `path`.
    pub async fn upload_to<R: AsyncRead + Unpin>(
        &self,
        reader: &mut R,
        path: &str,
        overwrite: bool,
        parent_rev: Option<&str>,
        root: Option<Root>,
    ) -> Result<Metadata, Error> {
        let status = self.upload(reader).await?;
        let meta = self
            .client
            .commit_chunked_upload(path, &status.upload_id, overwrite, parent_rev, root)
            .await?;
        info!(path = %meta.path, bytes = meta.bytes, "chunked upload committed");
        Ok(meta)
    }
}

#[derive(Clone)]
pub struct ProgressStream {
    name: Arc<String>,
    part: usize,
    base: usize,
    total: usize,
    data: Arc<Vec<u8>>,
    cursor: usize,
    progress_listener: Option<ProgressListener>,
}

impl futures::Stream for ProgressStream {
    type Item = io::Result<Vec<u8>>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        _: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        let total_len = self.data.len();
        let remain_len = total_len - self.cursor;

        if remain_len == 0 {
            Poll::Ready(None)
        } else {
            let start_index = self.cursor;
            self.cursor += cmp::min(remain_len, 1024 * 32);
            let result = self.data[start_index..self.cursor].to_vec();

            if let Some(pl) = self.progress_listener.as_ref() {
                if let Ok(mut f) = pl.lock() {
                    f(self.name.clone(), self.part, self.base + self.cursor, self.total);
                }
            }

            Poll::Ready(Some(Ok(result)))
        }
    }
}
