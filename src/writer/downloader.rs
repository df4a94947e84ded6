use super::uploader::ProgressListener;
use crate::api::{self, Root};
use crate::client::Client;
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use std::{io, sync::Arc};

#[derive(Error, Debug)]
pub enum Error {
    #[error("The local offset {offset} is past the end of the remote file ({total:?} bytes)")]
    OffsetPastEnd { offset: u64, total: Option<u64> },
    #[error("The server ignored the requested range. path: {0}")]
    RangeIgnored(String),
    #[error("The Dropbox API error: {0}")]
    ApiError(#[from] api::Error),
    #[error("The reqwest error: {0:?}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("The IO error: {0:?}")]
    IOError(#[from] io::Error),
}

/// Streams a file's content into the next writer.
pub struct Downloader<'a, W: AsyncWrite + Unpin> {
    client: &'a Client,
    progress_listener: Option<ProgressListener>,
    next_writer: W,
}

impl<'a, W: AsyncWrite + Unpin> Downloader<'a, W> {
    pub fn new(client: &'a Client, progress_listener: Option<ProgressListener>, next_writer: W) -> Self {
        Downloader {
            client,
            progress_listener,
            next_writer,
        }
    }

    pub fn next(self) -> W {
        self.next_writer
    }

    /// Writes the file at `path` from `start_offset` on and returns the number of bytes written.
    pub async fn download(
        &mut self,
        path: &str,
        root: Option<Root>,
        start_offset: Option<u64>,
    ) -> Result<u64, Error> {
        let name = Arc::new(path.to_owned());
        let start_offset = start_offset.filter(|offset| *offset > 0);

        let mut resp = self.client.file_response(path, root, start_offset).await?;

        if resp.status() == reqwest::StatusCode::RANGE_NOT_SATISFIABLE {
            let offset = start_offset.unwrap_or_default();
            let total = content_range_total(&resp);
            if total != Some(offset) {
                return Err(Error::OffsetPastEnd { offset, total });
            }
            debug!(path, "download already complete");
            return Ok(0);
        }

        let begin_offset = if let Some(offset) = start_offset {
            if resp.status() != reqwest::StatusCode::PARTIAL_CONTENT {
                return Err(Error::RangeIgnored(path.to_owned()));
            }
            offset as usize
        } else {
            0
        };

        // zero when the server streams without announcing a length
        let total_len = content_range_total(&resp)
            .or_else(|| resp.content_length().map(|len| len + begin_offset as u64))
            .unwrap_or_default() as usize;

        let mut written_len = begin_offset;
        while let Some(chunk) = resp.chunk().await? {
            self.next_writer.write_all(chunk.as_ref()).await?;
            written_len += chunk.len();

            if let Some(pl) = self.progress_listener.as_ref() {
                if let Ok(mut f) = pl.lock() {
                    f(name.clone(), 0, written_len, total_len);
                }
            }
        }
        self.next_writer.flush().await?;

        Ok((written_len - begin_offset) as u64)
    }
}

/// The complete length from `Content-Range: bytes a-b/N` or `bytes */N`.
fn content_range_total(resp: &reqwest::Response) -> Option<u64> {
    resp.headers()
        .get(reqwest::header::CONTENT_RANGE)?
        .to_str()
        .ok()?
        .rsplit('/')
        .next()?
        .trim()
        .parse()
        .ok()
}
