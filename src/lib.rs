//! `dropbox-v1` is a crate to call the [Dropbox v1 REST API](https://www.dropbox.com/developers-v1/core/docs)
//! with OAuth1 signed requests.
//!
//! These features are supported:
//! * The OAuth1 three-legged flow: request token, authorize link, access token.
//! * Account info, file download and upload, metadata, delta, search, thumbnails.
//! * File operations: copy, copy from a copy ref, create folder, delete, move.
//! * Share links, media links and copy refs.
//! * Chunked uploads of large files with progress reporting.
//! * Streaming downloads with resume and progress reporting.
//!
//! ## Example
//!
//! Authorizing an app:
//! ```rust,no_run
//! # async fn run() -> Result<(), dropbox_v1::api::Error> {
//! use dropbox_v1::{client::Client, config::Config};
//!
//! let mut client = Client::new(Config::new("app_key", "app_secret"))?;
//! client.request_token().await?;
//! println!("visit {}", client.authorize_url(None)?);
//! // once the user has allowed access
//! let access_token = client.access_token().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Uploading a large file in chunks:
//! ```rust,no_run
//! # use std::sync::{Arc, Mutex};
//! # async fn run(client: dropbox_v1::client::Client) -> Result<(), dropbox_v1::helper::Error> {
//! let meta = dropbox_v1::helper::upload_file(
//!     "backup.tar",  // the local file
//!     &client,  // a client holding an access token
//!     "/Backups/backup.tar",  // the path in Dropbox
//!     true,  // overwrite an existing file
//!     None,  // use the configured root
//!     Some(Arc::new(Mutex::new(|name: Arc<String>, part: usize, pos: usize, total: usize| {  // the progress listener
//!         println!("name: {name} part:{part} {pos}/{total}");
//!     }))),
//! )
//! .await?;
//! println!("uploaded rev {:?}", meta.rev);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod helper;
pub mod oauth;
pub mod writer;

pub use api::{Error, Root};
pub use client::Client;
pub use config::Config;
pub use oauth::Token;
