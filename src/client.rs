use reqwest::{header, Body, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::api::{
    encode_path, AccountInfo, ChunkedUploadStatus, CopyRef, DeltaPage, Error, Link, Metadata,
    MetadataQuery, MetadataResponse, Root, ThumbnailSize,
};
use super::config::Config;
use super::oauth::{authorization_header, AuthType, Signer, Token};

/// A finished request: the status and the whole body.
#[derive(Debug)]
pub struct Response {
    status: u16,
    body: Vec<u8>,
}

impl Response {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

fn param(key: &str, value: impl ToString) -> (String, String) {
    (key.to_owned(), value.to_string())
}

/// Passes 2xx and 304 responses through and turns everything else into an [`Error`].
async fn check_status(url: &str, resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status().as_u16();
    if resp.status().is_success() || status == 304 {
        return Ok(resp);
    }

    let bytes = resp.bytes().await?;
    let err = Error::from_status(status, url, &bytes);
    warn!(status, error = %err, "dropbox request failed");
    Err(err)
}

/// A Dropbox v1 client. Requests are signed with the app credentials and, once set, the
/// current OAuth token.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: Config,
    token: Option<Token>,
}

impl Client {
    pub fn new(config: Config) -> Result<Self, Error> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Client {
            http: builder.build()?,
            config,
            token: None,
        })
    }

    /// A client that already holds an access token.
    pub fn with_token(config: Config, token: Token) -> Result<Self, Error> {
        let mut client = Client::new(config)?;
        client.set_token(token);
        Ok(client)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_token(&mut self, token: Token) {
        self.token = Some(token);
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    fn root(&self, root: Option<Root>) -> Root {
        root.unwrap_or(self.config.root)
    }

    fn api(&self, endpoint: &str) -> String {
        format!("{}{}", self.config.api_url, endpoint)
    }

    fn api_path(&self, endpoint: &str, root: Option<Root>, path: &str) -> Result<String, Error> {
        Ok(format!(
            "{}{}/{}/{}",
            self.config.api_url,
            endpoint,
            self.root(root),
            encode_path(path)?
        ))
    }

    fn content_path(&self, endpoint: &str, root: Option<Root>, path: &str) -> Result<String, Error> {
        Ok(format!(
            "{}{}/{}/{}",
            self.config.content_url,
            endpoint,
            self.root(root),
            encode_path(path)?
        ))
    }

    /// Signs and sends a request, translating failed statuses into an [`Error`].
    pub(crate) async fn send(
        &self,
        method: Method,
        url: &str,
        params: Vec<(String, String)>,
        body: Option<Body>,
        headers: header::HeaderMap,
    ) -> Result<reqwest::Response, Error> {
        let resp = self.dispatch(method, url, params, body, headers).await?;
        check_status(url, resp).await
    }

    /// Signs and sends a request. GET requests and requests with a raw body carry `params` in
    /// the query string, everything else sends them as a form body.
    async fn dispatch(
        &self,
        method: Method,
        url: &str,
        params: Vec<(String, String)>,
        body: Option<Body>,
        headers: header::HeaderMap,
    ) -> Result<reqwest::Response, Error> {
        let mut target = Url::parse(url)?;
        let form = if method == Method::GET || body.is_some() {
            if !params.is_empty() {
                target.query_pairs_mut().extend_pairs(&params);
            }
            vec![]
        } else {
            params
        };

        let signer = Signer {
            consumer: &self.config.consumer,
            token: self.token.as_ref(),
        };
        let oauth = signer.sign(method.as_str(), &target, &form)?;
        debug!(%method, url = %target, "dropbox request");

        let mut req = match self.config.auth_type {
            AuthType::Uri => {
                target.query_pairs_mut().extend_pairs(&oauth);
                self.http.request(method, target)
            }
            AuthType::Header => self
                .http
                .request(method, target)
                .header(header::AUTHORIZATION, authorization_header(&oauth)),
        };
        if !form.is_empty() {
            req = req.form(&form);
        }
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req.headers(headers).send().await?;
        debug!(status = resp.status().as_u16(), "dropbox response");
        Ok(resp)
    }

    /// Sends a signed request and returns the whole response.
    ///
    /// Statuses other than 2xx and 304 are translated into an [`Error`].
    pub async fn fetch(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<Response, Error> {
        let params = params.iter().map(|(k, v)| param(k, v)).collect();
        self.fetch_inner(method, url, params, body.map(Body::from))
            .await
    }

    async fn fetch_inner(
        &self,
        method: Method,
        url: &str,
        params: Vec<(String, String)>,
        body: Option<Body>,
    ) -> Result<Response, Error> {
        let resp = self
            .send(method, url, params, body, header::HeaderMap::new())
            .await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?.to_vec();
        Ok(Response { status, body })
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        params: Vec<(String, String)>,
    ) -> Result<T, Error> {
        self.fetch_inner(method, url, params, None).await?.json()
    }

    /// Obtains a request token and keeps it as the current token.
    pub async fn request_token(&mut self) -> Result<Token, Error> {
        self.token = None;
        let url = self.api("oauth/request_token");
        let resp = self.fetch_inner(Method::POST, &url, vec![], None).await?;
        let token = Token::from_form(resp.body())?;
        self.token = Some(token.clone());
        Ok(token)
    }

    /// The page the user visits to authorize the current request token.
    pub fn authorize_url(&self, callback: Option<&str>) -> Result<Url, Error> {
        let token = self.token.as_ref().ok_or(Error::MissingToken)?;
        let mut url = Url::parse(&format!("{}oauth/authorize", self.config.web_url))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("oauth_token", &token.key);
            if let Some(callback) = callback {
                query.append_pair("oauth_callback", callback);
            }
        }
        Ok(url)
    }

    /// Exchanges the authorized request token for an access token and keeps it.
    pub async fn access_token(&mut self) -> Result<Token, Error> {
        if self.token.is_none() {
            return Err(Error::MissingToken);
        }
        let url = self.api("oauth/access_token");
        let resp = self.fetch_inner(Method::POST, &url, vec![], None).await?;
        let token = Token::from_form(resp.body())?;
        self.token = Some(token.clone());
        Ok(token)
    }

    pub async fn account_info(&self) -> Result<AccountInfo, Error> {
        self.fetch_json(Method::GET, &self.api("account/info"), vec![])
            .await
    }

    /// Downloads the whole content of a file.
    pub async fn get_file(&self, path: &str, root: Option<Root>) -> Result<Vec<u8>, Error> {
        let url = self.content_path("files", root, path)?;
        Ok(self
            .fetch_inner(Method::GET, &url, vec![], None)
            .await?
            .into_body())
    }

    /// The raw response of a file download, starting at `start_offset` when given.
    pub(crate) async fn file_response(
        &self,
        path: &str,
        root: Option<Root>,
        start_offset: Option<u64>,
    ) -> Result<reqwest::Response, Error> {
        let url = self.content_path("files", root, path)?;
        let mut headers = header::HeaderMap::new();
        if let Some(offset) = start_offset {
            if let Ok(value) = header::HeaderValue::from_str(&format!("bytes={}-", offset)) {
                headers.insert(header::RANGE, value);
            }
        }
        let resp = self.dispatch(Method::GET, &url, vec![], None, headers).await?;
        // the caller compares the total in `Content-Range: bytes */N` with its offset
        if start_offset.is_some() && resp.status() == StatusCode::RANGE_NOT_SATISFIABLE {
            return Ok(resp);
        }
        check_status(&url, resp).await
    }

    /// Uploads `data` as the file at `path` in a single request.
    ///
    /// With `overwrite` off, an existing file is kept and the upload is renamed by Dropbox.
    /// `parent_rev` names the revision this upload replaces.
    pub async fn put_file(
        &self,
        path: &str,
        data: Vec<u8>,
        overwrite: bool,
        parent_rev: Option<&str>,
        root: Option<Root>,
    ) -> Result<Metadata, Error> {
        let url = self.content_path("files_put", root, path)?;
        let mut params = vec![param("overwrite", overwrite)];
        if let Some(rev) = parent_rev {
            params.push(param("parent_rev", rev));
        }
        self.fetch_inner(Method::PUT, &url, params, Some(Body::from(data)))
            .await?
            .json()
    }

    pub async fn copy(&self, from: &str, to: &str, root: Option<Root>) -> Result<Metadata, Error> {
        let params = vec![
            param("root", self.root(root)),
            param("from_path", from),
            param("to_path", to),
        ];
        self.fetch_json(Method::POST, &self.api("fileops/copy"), params)
            .await
    }

    /// Copies the file a [`CopyRef`] points at, possibly from another user's Dropbox.
    pub async fn copy_from_ref(
        &self,
        copy_ref: &str,
        to: &str,
        root: Option<Root>,
    ) -> Result<Metadata, Error> {
        let params = vec![
            param("root", self.root(root)),
            param("from_copy_ref", copy_ref),
            param("to_path", to),
        ];
        self.fetch_json(Method::POST, &self.api("fileops/copy"), params)
            .await
    }

    pub async fn create_folder(&self, path: &str, root: Option<Root>) -> Result<Metadata, Error> {
        let params = vec![
            param("root", self.root(root)),
            param("path", format!("/{}", path.trim_start_matches('/'))),
        ];
        self.fetch_json(Method::POST, &self.api("fileops/create_folder"), params)
            .await
    }

    /// Deletes a file or a folder with everything in it.
    pub async fn delete(&self, path: &str, root: Option<Root>) -> Result<Metadata, Error> {
        let params = vec![param("root", self.root(root)), param("path", path)];
        self.fetch_json(Method::POST, &self.api("fileops/delete"), params)
            .await
    }

    pub async fn move_path(
        &self,
        from: &str,
        to: &str,
        root: Option<Root>,
    ) -> Result<Metadata, Error> {
        let params = vec![
            param("root", self.root(root)),
            param("from_path", from),
            param("to_path", to),
        ];
        self.fetch_json(Method::POST, &self.api("fileops/move"), params)
            .await
    }

    /// Returns [`MetadataResponse::NotModified`] when `query.hash` still matches the folder.
    pub async fn metadata(
        &self,
        path: &str,
        query: &MetadataQuery,
        root: Option<Root>,
    ) -> Result<MetadataResponse, Error> {
        let url = self.api_path("metadata", root, path)?;
        let resp = self
            .fetch_inner(Method::GET, &url, query.params(), None)
            .await?;
        if resp.status() == 304 {
            return Ok(MetadataResponse::NotModified);
        }
        Ok(MetadataResponse::Modified(resp.json()?))
    }

    /// Pages through changes. Pass the previous page's cursor, or `None` to start over.
    pub async fn delta(&self, cursor: Option<&str>) -> Result<DeltaPage, Error> {
        let params = cursor
            .map(|c| vec![param("cursor", c)])
            .unwrap_or_default();
        self.fetch_json(Method::POST, &self.api("delta"), params)
            .await
    }

    /// Returns a JPEG thumbnail of an image file.
    pub async fn thumbnail(
        &self,
        path: &str,
        size: ThumbnailSize,
        root: Option<Root>,
    ) -> Result<Vec<u8>, Error> {
        let url = self.content_path("thumbnails", root, path)?;
        Ok(self
            .fetch_inner(Method::GET, &url, vec![param("size", size)], None)
            .await?
            .into_body())
    }

    /// Finds files and folders under `path` whose names contain `query`.
    pub async fn search(
        &self,
        query: &str,
        path: &str,
        root: Option<Root>,
    ) -> Result<Vec<Metadata>, Error> {
        let url = self.api_path("search", root, path)?;
        self.fetch_json(Method::GET, &url, vec![param("query", query)])
            .await
    }

    /// Creates a shareable link to a file or folder.
    pub async fn share(&self, path: &str, root: Option<Root>) -> Result<Link, Error> {
        let url = self.api_path("shares", root, path)?;
        self.fetch_json(Method::POST, &url, vec![]).await
    }

    /// Creates a direct, short-lived link to a file's content.
    pub async fn media(&self, path: &str, root: Option<Root>) -> Result<Link, Error> {
        let url = self.api_path("media", root, path)?;
        self.fetch_json(Method::POST, &url, vec![]).await
    }

    pub async fn copy_ref(&self, path: &str, root: Option<Root>) -> Result<CopyRef, Error> {
        let url = self.api_path("copy_ref", root, path)?;
        self.fetch_json(Method::GET, &url, vec![]).await
    }

    /// Sends one piece of a chunked upload. The first piece has no `upload_id`.
    pub async fn chunked_upload(
        &self,
        chunk: impl Into<Body>,
        upload_id: Option<&str>,
        offset: u64,
    ) -> Result<ChunkedUploadStatus, Error> {
        let url = format!("{}chunked_upload", self.config.content_url);
        let mut params = vec![];
        if let Some(id) = upload_id {
            params.push(param("upload_id", id));
        }
        params.push(param("offset", offset));
        self.fetch_inner(Method::PUT, &url, params, Some(chunk.into()))
            .await?
            .json()
    }

    /// Completes a chunked upload as the file at `path`.
    pub async fn commit_chunked_upload(
        &self,
        path: &str,
        upload_id: &str,
        overwrite: bool,
        parent_rev: Option<&str>,
        root: Option<Root>,
    ) -> Result<Metadata, Error> {
        let url = self.content_path("commit_chunked_upload", root, path)?;
        let mut params = vec![param("upload_id", upload_id), param("overwrite", overwrite)];
        if let Some(rev) = parent_rev {
            params.push(param("parent_rev", rev));
        }
        self.fetch_json(Method::POST, &url, params).await
    }
}
