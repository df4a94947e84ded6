use std::{env, time::Duration};

use super::api::{Error, Root};
use super::oauth::{AuthType, Token};

pub const API_URL: &str = "https://api.dropbox.com/1/";
pub const CONTENT_URL: &str = "https://api-content.dropbox.com/1/";
pub const WEB_URL: &str = "https://www.dropbox.com/1/";

pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Settings of a [`Client`](crate::client::Client).
#[derive(Clone, Debug)]
pub struct Config {
    pub(crate) consumer: Token,
    pub(crate) root: Root,
    pub(crate) api_url: String,
    pub(crate) content_url: String,
    pub(crate) web_url: String,
    pub(crate) chunk_size: usize,
    pub(crate) auth_type: AuthType,
    pub(crate) timeout: Option<Duration>,
    pub(crate) user_agent: String,
}

fn normalize_url(url: impl Into<String>) -> String {
    let mut url = url.into();
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

impl Config {
    /// # Arguments
    /// * `app_key` - the app key from the Dropbox developer console
    /// * `app_secret` - the matching app secret
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Config {
            consumer: Token::new(app_key, app_secret),
            root: Root::default(),
            api_url: API_URL.to_owned(),
            content_url: CONTENT_URL.to_owned(),
            web_url: WEB_URL.to_owned(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            auth_type: AuthType::default(),
            timeout: None,
            user_agent: APP_USER_AGENT.to_owned(),
        }
    }

    /// Reads `DROPBOX_APP_KEY`, `DROPBOX_APP_SECRET` and the optional `DROPBOX_ROOT`.
    pub fn from_env() -> Result<Self, Error> {
        let key = env::var("DROPBOX_APP_KEY")
            .map_err(|_| Error::Config("DROPBOX_APP_KEY is not set".to_owned()))?;
        let secret = env::var("DROPBOX_APP_SECRET")
            .map_err(|_| Error::Config("DROPBOX_APP_SECRET is not set".to_owned()))?;

        let mut config = Config::new(key, secret);
        if let Ok(root) = env::var("DROPBOX_ROOT") {
            config.root = root.parse()?;
        }
        Ok(config)
    }

    pub fn root(mut self, value: Root) -> Self {
        self.root = value;
        self
    }

    pub fn api_url(mut self, value: impl Into<String>) -> Self {
        self.api_url = normalize_url(value);
        self
    }

    pub fn content_url(mut self, value: impl Into<String>) -> Self {
        self.content_url = normalize_url(value);
        self
    }

    pub fn web_url(mut self, value: impl Into<String>) -> Self {
        self.web_url = normalize_url(value);
        self
    }

    /// Points all three endpoints at one base, e.g. a local test server.
    pub fn base_url(self, value: impl Into<String>) -> Self {
        let value = normalize_url(value);
        self.api_url(value.clone())
            .content_url(value.clone())
            .web_url(value)
    }

    /// Bytes sent per chunked upload request. Zero is treated as one.
    pub fn chunk_size(mut self, value: usize) -> Self {
        self.chunk_size = value.max(1);
        self
    }

    pub fn auth_type(mut self, value: AuthType) -> Self {
        self.auth_type = value;
        self
    }

    pub fn timeout(mut self, value: Duration) -> Self {
        self.timeout = Some(value);
        self
    }

    /// Prefixed to the crate's own user agent.
    pub fn user_agent(mut self, client_name: &str) -> Self {
        self.user_agent = format!("{} {}", client_name, APP_USER_AGENT);
        self
    }

    pub fn get_root(&self) -> Root {
        self.root
    }

    pub fn get_chunk_size(&self) -> usize {
        self.chunk_size
    }
}
