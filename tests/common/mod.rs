use dropbox_v1::{Client, Config, Token};
use httpmock::MockServer;
use serde_json::{json, Value};

pub const APP_KEY: &str = "app-key";
pub const APP_SECRET: &str = "app-secret";
pub const TOKEN_KEY: &str = "token-key";
pub const TOKEN_SECRET: &str = "token-secret";

pub fn config(server: &MockServer) -> Config {
    Config::new(APP_KEY, APP_SECRET).base_url(server.url("/1/"))
}

/// A client holding an access token, talking to `server`.
pub fn client(server: &MockServer) -> Client {
    Client::with_token(config(server), Token::new(TOKEN_KEY, TOKEN_SECRET)).unwrap()
}

#[allow(dead_code)]
pub fn metadata_json(path: &str, bytes: u64, is_dir: bool) -> Value {
    json!({
        "size": format!("{} bytes", bytes),
        "rev": "362e2029684fe",
        "thumb_exists": false,
        "bytes": bytes,
        "modified": "Wed, 19 Oct 2026 10:16:05 +0000",
        "path": path,
        "is_dir": is_dir,
        "icon": if is_dir { "folder" } else { "page_white" },
        "root": "dropbox",
        "revision": 220191
    })
}
