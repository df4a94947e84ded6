use thiserror::Error;
use tokio::{
    fs::{File, OpenOptions},
    io::{AsyncRead, AsyncWrite},
};

use super::api::{Metadata, Root};
use super::client::Client;
use super::writer::*;
use std::{io, path::Path};

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error")]
    IoError(#[from] io::Error),
    #[error("Upload error")]
    UploadError(#[from] uploader::Error),
    #[error("Download error")]
    DownloadError(#[from] downloader::Error),
}

/// Uploads everything `reader` yields as the file at `path`, one chunk at a time.
pub async fn upload(
    reader: &mut (impl AsyncRead + Unpin),
    client: &Client,
    path: impl AsRef<str>,
    overwrite: bool,
    root: Option<Root>,
    progress_listener: Option<uploader::ProgressListener>,
) -> Result<Metadata, Error> {
    let path = path.as_ref();
    let uploader = uploader::ChunkedUploader::new(client, path.to_owned(), progress_listener);
    Ok(uploader
        .upload_to(reader, path, overwrite, None, root)
        .await?)
}

/// Uploads a local file. Progress totals are the file's length.
pub async fn upload_file(
    local_path: impl AsRef<Path>,
    client: &Client,
    remote_path: impl AsRef<str>,
    overwrite: bool,
    root: Option<Root>,
    progress_listener: Option<uploader::ProgressListener>,
) -> Result<Metadata, Error> {
    let mut file = File::open(local_path).await?;
    let total_len = file.metadata().await?.len() as usize;

    let remote_path = remote_path.as_ref();
    let uploader =
        uploader::ChunkedUploader::new(client, remote_path.to_owned(), progress_listener)
            .total_len(total_len);
    Ok(uploader
        .upload_to(&mut file, remote_path, overwrite, None, root)
        .await?)
}

/// Streams the file at `path` into `writer` and returns the number of bytes written.
pub async fn download(
    client: &Client,
    path: impl AsRef<str>,
    root: Option<Root>,
    writer: &mut (impl AsyncWrite + Unpin),
    start_offset: Option<u64>,
    progress_listener: Option<uploader::ProgressListener>,
) -> Result<u64, Error> {
    let mut downloader = downloader::Downloader::new(client, progress_listener, writer);
    Ok(downloader
        .download(path.as_ref(), root, start_offset)
        .await?)
}

/// Downloads into a local file. With `resume` set, an existing file is continued from its
/// current length instead of being truncated.
pub async fn download_file(
    client: &Client,
    path: impl AsRef<str>,
    root: Option<Root>,
    local_path: impl AsRef<Path>,
    resume: bool,
    progress_listener: Option<uploader::ProgressListener>,
) -> Result<u64, Error> {
    let mut options = OpenOptions::new();
    options.create(true);
    if resume {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    let mut file = options.open(local_path).await?;

    let start_offset = if resume {
        Some(file.metadata().await?.len())
    } else {
        None
    };

    download(client, path, root, &mut file, start_offset, progress_listener).await
}
