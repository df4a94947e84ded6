use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Reqwest error: {0:?}")]
    ReqwestError(#[from] reqwest::Error),
    #[error("Serde JSON parsing error: {0:?}")]
    SerdeJSONError(#[from] serde_json::Error),
    #[error("Invalid url: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("Invalid path, `.` and `..` segments are not allowed: {0}")]
    InvalidPath(String),
    #[error("Bad input parameter: {0}")]
    BadInput(String),
    #[error("Bad or expired token. The user or Dropbox may have revoked or expired the access token, re-authenticate the user")]
    InvalidToken,
    #[error("Forbidden. A bad OAuth request, or a file or folder already existing at the target location")]
    Forbidden,
    #[error("Resource at uri: {0} could not be found")]
    NotFound(String),
    #[error("Request method not expected")]
    MethodNotAllowed,
    #[error("Server error: {0}")]
    ServerError(String),
    #[error("The app is making too many requests and is being rate limited")]
    RateLimited,
    #[error("This dropbox is full")]
    StorageFull,
    #[error("Unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },
    #[error("No OAuth token has been set")]
    MissingToken,
    #[error("Malformed OAuth token response: {0}")]
    MalformedToken(String),
    #[error("Request signing failed: {0}")]
    Signing(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Translates a non-success status into an error. `uri` is the requested url.
    pub fn from_status(status: u16, uri: &str, body: &[u8]) -> Self {
        match status {
            400 => Error::BadInput(error_message(body)),
            401 => Error::InvalidToken,
            403 => Error::Forbidden,
            404 => Error::NotFound(uri.to_owned()),
            405 => Error::MethodNotAllowed,
            500 => Error::ServerError(error_message(body)),
            503 => Error::RateLimited,
            507 => Error::StorageFull,
            status => Error::UnexpectedStatus {
                status,
                body: String::from_utf8_lossy(body).into_owned(),
            },
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

/// The `error` field of a JSON error body, or the raw body otherwise.
fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(b) => b.error,
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

/// Alphanumerics plus `-._/` stay as-is; `~` is escaped.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'/');

/// Encodes a Dropbox path for use in a url, without its leading slashes.
///
/// Dot segments are rejected, url parsing would resolve them against the endpoint.
pub fn encode_path(path: &str) -> Result<String, Error> {
    let path = path.trim_start_matches('/');
    if path.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(Error::InvalidPath(path.to_owned()));
    }
    Ok(utf8_percent_encode(path, PATH_ENCODE_SET).to_string())
}

/// The namespace file paths are resolved in.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Root {
    /// Full Dropbox access.
    #[default]
    Dropbox,
    /// App folder access.
    Sandbox,
}

impl fmt::Display for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self {
            Root::Dropbox => "dropbox",
            Root::Sandbox => "sandbox",
        };
        write!(f, "{}", result)
    }
}

impl FromStr for Root {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dropbox" => Ok(Root::Dropbox),
            "sandbox" => Ok(Root::Sandbox),
            other => Err(Error::Config(format!("unknown root: {}", other))),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ThumbnailSize {
    /// 32x32
    Xs,
    /// 64x64
    #[default]
    S,
    /// 128x128
    M,
    /// 640x480
    L,
    /// 1024x768
    Xl,
}

impl fmt::Display for ThumbnailSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self {
            ThumbnailSize::Xs => "xs",
            ThumbnailSize::S => "s",
            ThumbnailSize::M => "m",
            ThumbnailSize::L => "l",
            ThumbnailSize::Xl => "xl",
        };
        write!(f, "{}", result)
    }
}

/// Description of a file or folder.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Metadata {
    pub size: String,
    pub bytes: u64,
    pub path: String,
    pub is_dir: bool,
    pub is_deleted: bool,
    pub rev: Option<String>,
    pub revision: Option<u64>,
    /// Folder hash, only present on listed folders.
    pub hash: Option<String>,
    pub thumb_exists: bool,
    pub icon: String,
    pub modified: Option<String>,
    pub client_mtime: Option<String>,
    pub root: String,
    pub mime_type: Option<String>,
    pub contents: Option<Vec<Metadata>>,
}

#[derive(Debug, PartialEq)]
pub enum MetadataResponse {
    Modified(Metadata),
    /// The folder hash passed in the query still matches.
    NotModified,
}

/// Optional arguments of the metadata call.
#[derive(Clone, Debug)]
pub struct MetadataQuery {
    pub list: bool,
    pub hash: Option<String>,
    pub file_limit: Option<u32>,
    pub rev: Option<String>,
    pub include_deleted: bool,
}

impl Default for MetadataQuery {
    fn default() -> Self {
        MetadataQuery {
            list: true,
            hash: None,
            file_limit: None,
            rev: None,
            include_deleted: false,
        }
    }
}

impl MetadataQuery {
    pub(crate) fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("list".to_owned(), self.list.to_string())];
        if let Some(hash) = &self.hash {
            params.push(("hash".to_owned(), hash.clone()));
        }
        if let Some(file_limit) = self.file_limit {
            params.push(("file_limit".to_owned(), file_limit.to_string()));
        }
        if let Some(rev) = &self.rev {
            params.push(("rev".to_owned(), rev.clone()));
        }
        if self.include_deleted {
            params.push(("include_deleted".to_owned(), "true".to_owned()));
        }
        params
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct QuotaInfo {
    pub shared: u64,
    pub quota: u64,
    pub normal: u64,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AccountInfo {
    pub referral_link: String,
    pub display_name: String,
    pub uid: u64,
    pub country: Option<String>,
    pub email: Option<String>,
    pub quota_info: QuotaInfo,
}

/// One page of changes. A `None` metadata means the path was deleted.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct DeltaPage {
    pub entries: Vec<(String, Option<Metadata>)>,
    pub reset: bool,
    pub cursor: String,
    pub has_more: bool,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Link {
    pub url: String,
    #[serde(default)]
    pub expires: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct CopyRef {
    pub copy_ref: String,
    #[serde(default)]
    pub expires: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ChunkedUploadStatus {
    pub upload_id: String,
    pub offset: u64,
    #[serde(default)]
    pub expires: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_encoding() {
        assert_eq!(
            encode_path("/Photos/Sample Album/Boston.jpg").unwrap(),
            "Photos/Sample%20Album/Boston.jpg"
        );
        assert_eq!(encode_path("//a~b/c+d").unwrap(), "a%7Eb/c%2Bd");
        assert_eq!(encode_path("/").unwrap(), "");
        assert_eq!(encode_path("Ünïcode").unwrap(), "%C3%9Cn%C3%AFcode");
        assert_eq!(encode_path("/.hidden/a..b/...").unwrap(), ".hidden/a..b/...");
    }

    #[test]
    fn dot_segments_are_rejected() {
        for path in ["a/../b", "/..", "./a", "a/./b", "a/.."] {
            assert!(
                matches!(encode_path(path), Err(Error::InvalidPath(_))),
                "{}",
                path
            );
        }
    }

    #[test]
    fn root_round_trips_through_strings() {
        assert_eq!(Root::default().to_string(), "dropbox");
        assert_eq!("sandbox".parse::<Root>().unwrap(), Root::Sandbox);
        assert!(matches!("app".parse::<Root>(), Err(Error::Config(_))));
    }

    #[test]
    fn status_translation() {
        assert!(matches!(
            Error::from_status(400, "u", br#"{"error": "Invalid path"}"#),
            Error::BadInput(msg) if msg == "Invalid path"
        ));
        assert!(matches!(Error::from_status(401, "u", b""), Error::InvalidToken));
        assert!(matches!(Error::from_status(403, "u", b""), Error::Forbidden));
        assert!(matches!(
            Error::from_status(404, "https://x/1/files/a", b""),
            Error::NotFound(uri) if uri == "https://x/1/files/a"
        ));
        assert!(matches!(Error::from_status(405, "u", b""), Error::MethodNotAllowed));
        assert!(matches!(
            Error::from_status(500, "u", b"oops"),
            Error::ServerError(msg) if msg == "oops"
        ));
        assert!(matches!(Error::from_status(503, "u", b""), Error::RateLimited));
        assert!(matches!(Error::from_status(507, "u", b""), Error::StorageFull));
        assert!(matches!(
            Error::from_status(418, "u", b"teapot"),
            Error::UnexpectedStatus { status: 418, body } if body == "teapot"
        ));
    }

    #[test]
    fn metadata_tolerates_missing_fields() {
        let json = r#"{
            "size": "225.4KB",
            "rev": "35e97029684fe",
            "thumb_exists": false,
            "bytes": 230783,
            "modified": "Tue, 19 Jul 2011 21:55:38 +0000",
            "path": "/Getting_Started.pdf",
            "is_dir": false,
            "icon": "page_white_acrobat",
            "root": "dropbox",
            "mime_type": "application/pdf",
            "revision": 220823,
            "unknown_field": 1
        }"#;
        let meta: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.bytes, 230783);
        assert_eq!(meta.rev.as_deref(), Some("35e97029684fe"));
        assert!(!meta.is_deleted);
        assert!(meta.contents.is_none());
    }

    #[test]
    fn delta_entries_carry_deletions() {
        let json = r#"{
            "entries": [["/a.txt", {"path": "/A.txt", "bytes": 3}], ["/gone", null]],
            "reset": false,
            "cursor": "abc",
            "has_more": true
        }"#;
        let page: DeltaPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.entries[0].1.as_ref().map(|m| m.bytes), Some(3));
        assert!(page.entries[1].1.is_none());
        assert!(page.has_more);
    }

    #[test]
    fn optional_response_fields_default() {
        let status: ChunkedUploadStatus =
            serde_json::from_str(r#"{"upload_id": "u1", "offset": 4}"#).unwrap();
        assert_eq!(status.offset, 4);
        assert_eq!(status.expires, "");

        let link: Link = serde_json::from_str(r#"{"url": "https://db.tt/c0mFuu1Y"}"#).unwrap();
        assert_eq!(link.expires, "");

        let copy_ref: CopyRef = serde_json::from_str(r#"{"copy_ref": "z1X6ATl6aWtzOGq0c3g5Ng"}"#).unwrap();
        assert_eq!(copy_ref.expires, "");

        let page: DeltaPage = serde_json::from_str(r#"{"entries": [], "cursor": "c"}"#).unwrap();
        assert!(!page.reset);
        assert!(!page.has_more);
    }

    #[test]
    fn metadata_query_params() {
        let query = MetadataQuery {
            hash: Some("h".to_owned()),
            file_limit: Some(10),
            ..Default::default()
        };
        assert_eq!(
            query.params(),
            vec![
                ("list".to_owned(), "true".to_owned()),
                ("hash".to_owned(), "h".to_owned()),
                ("file_limit".to_owned(), "10".to_owned()),
            ]
        );
    }
}
