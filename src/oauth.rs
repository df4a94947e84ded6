//! OAuth 1.0 (RFC 5849) request signing with HMAC-SHA1
//!

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Url;
use sha1::Sha1;
use std::time::{SystemTime, UNIX_EPOCH};

use super::api::Error;

/// Everything except the RFC 3986 unreserved characters.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const VERSION: &str = "1.0";

/// A key/secret pair. Used both for the app (consumer) credentials and for request/access tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub key: String,
    pub secret: String,
}

impl Token {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Token {
            key: key.into(),
            secret: secret.into(),
        }
    }

    /// Parses an `oauth_token=..&oauth_token_secret=..` response body.
    pub fn from_form(body: &[u8]) -> Result<Self, Error> {
        let mut key = None;
        let mut secret = None;
        for (k, v) in url::form_urlencoded::parse(body) {
            match k.as_ref() {
                "oauth_token" => key = Some(v.into_owned()),
                "oauth_token_secret" => secret = Some(v.into_owned()),
                _ => {}
            }
        }

        match (key, secret) {
            (Some(key), Some(secret)) => Ok(Token { key, secret }),
            _ => Err(Error::MalformedToken(
                String::from_utf8_lossy(body).into_owned(),
            )),
        }
    }
}

/// Where the `oauth_*` protocol parameters are placed on a request.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AuthType {
    /// Appended to the query string.
    #[default]
    Uri,
    /// Sent as an `Authorization: OAuth ...` header.
    Header,
}

pub fn encode(s: &str) -> String {
    utf8_percent_encode(s, OAUTH_ENCODE_SET).to_string()
}

fn base_url(url: &Url) -> String {
    let scheme = url.scheme().to_ascii_lowercase();
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", scheme, host, port, url.path()),
        None => format!("{}://{}{}", scheme, host, url.path()),
    }
}

/// Builds the signature base string. `params` holds the form body pairs and the protocol
/// parameters; the query pairs are taken from `url`.
pub fn signature_base_string(method: &str, url: &Url, params: &[(String, String)]) -> String {
    let mut pairs = url
        .query_pairs()
        .map(|(k, v)| (encode(&k), encode(&v)))
        .chain(params.iter().map(|(k, v)| (encode(k), encode(v))))
        .collect::<Vec<_>>();
    pairs.sort();

    let normalized = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(&base_url(url)),
        encode(&normalized)
    )
}

pub fn sign(base_string: &str, consumer_secret: &str, token_secret: &str) -> Result<String, Error> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
        .map_err(|e| Error::Signing(e.to_string()))?;
    mac.update(base_string.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub(crate) struct Signer<'a> {
    pub consumer: &'a Token,
    pub token: Option<&'a Token>,
}

impl<'a> Signer<'a> {
    fn protocol_params(&self, nonce: String, timestamp: u64) -> Vec<(String, String)> {
        let mut params = vec![
            ("oauth_consumer_key".to_owned(), self.consumer.key.clone()),
            ("oauth_nonce".to_owned(), nonce),
            ("oauth_signature_method".to_owned(), SIGNATURE_METHOD.to_owned()),
            ("oauth_timestamp".to_owned(), timestamp.to_string()),
        ];
        if let Some(token) = self.token {
            params.push(("oauth_token".to_owned(), token.key.clone()));
        }
        params.push(("oauth_version".to_owned(), VERSION.to_owned()));
        params
    }

    /// Returns the protocol parameters with `oauth_signature` appended.
    pub fn sign_with(
        &self,
        method: &str,
        url: &Url,
        form: &[(String, String)],
        nonce: String,
        timestamp: u64,
    ) -> Result<Vec<(String, String)>, Error> {
        let mut params = self.protocol_params(nonce, timestamp);

        let mut signed = form.to_vec();
        signed.extend(params.iter().cloned());
        let base_string = signature_base_string(method, url, &signed);
        tracing::trace!(%base_string, "oauth signature base string");

        let token_secret = self.token.map(|t| t.secret.as_str()).unwrap_or_default();
        let signature = sign(&base_string, &self.consumer.secret, token_secret)?;
        params.push(("oauth_signature".to_owned(), signature));
        Ok(params)
    }

    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        form: &[(String, String)],
    ) -> Result<Vec<(String, String)>, Error> {
        self.sign_with(method, url, form, nonce(), timestamp())
    }
}

/// Formats signed protocol parameters as an `Authorization` header value.
pub fn authorization_header(params: &[(String, String)]) -> String {
    let fields = params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {}", fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photos_request() -> (Url, Token, Token) {
        let url =
            Url::parse("http://photos.example.net/photos?file=vacation.jpg&size=original").unwrap();
        let consumer = Token::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44");
        let token = Token::new("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00");
        (url, consumer, token)
    }

    #[test]
    fn encodes_only_unreserved_as_is() {
        assert_eq!(encode("abc-._~XYZ019"), "abc-._~XYZ019");
        assert_eq!(encode("a b/c+d=e&f"), "a%20b%2Fc%2Bd%3De%26f");
        assert_eq!(encode("é"), "%C3%A9");
    }

    #[test]
    fn base_url_drops_query_and_default_port() {
        let url = Url::parse("HTTPS://Api.Dropbox.com:443/1/metadata/dropbox/a?list=true").unwrap();
        assert_eq!(base_url(&url), "https://api.dropbox.com/1/metadata/dropbox/a");

        let url = Url::parse("http://127.0.0.1:8080/1/delta").unwrap();
        assert_eq!(base_url(&url), "http://127.0.0.1:8080/1/delta");
    }

    #[test]
    fn oauth_core_appendix_a_signature() {
        let (url, consumer, token) = photos_request();
        let signer = Signer {
            consumer: &consumer,
            token: Some(&token),
        };
        let params = signer
            .sign_with("GET", &url, &[], "kllo9940pd9333jh".to_owned(), 1191242096)
            .unwrap();

        let mut signed = params.clone();
        signed.retain(|(k, _)| k != "oauth_signature");
        assert_eq!(
            signature_base_string("GET", &url, &signed),
            "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&file%3Dvacation.jpg\
             %26oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3Dkllo9940pd9333jh\
             %26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1191242096\
             %26oauth_token%3Dnnch734d00sl2jdk%26oauth_version%3D1.0%26size%3Doriginal"
        );

        let signature = params
            .iter()
            .find(|(k, _)| k == "oauth_signature")
            .map(|(_, v)| v.as_str());
        assert_eq!(signature, Some("tR3+Ty81lMeYAr/Fid0kMTYa/WM="));
    }

    #[test]
    fn unauthenticated_signer_omits_token() {
        let (url, consumer, _) = photos_request();
        let signer = Signer {
            consumer: &consumer,
            token: None,
        };
        let params = signer.sign("POST", &url, &[]).unwrap();
        assert!(params.iter().all(|(k, _)| k != "oauth_token"));
        assert!(params.iter().any(|(k, _)| k == "oauth_signature"));
    }

    #[test]
    fn parses_token_response() {
        let token = Token::from_form(b"oauth_token_secret=b%2Bc&oauth_token=a").unwrap();
        assert_eq!(token, Token::new("a", "b+c"));

        assert!(matches!(
            Token::from_form(b"oauth_token=a"),
            Err(Error::MalformedToken(_))
        ));
    }

    #[test]
    fn header_value_quotes_encoded_fields() {
        let header = authorization_header(&[
            ("oauth_consumer_key".to_owned(), "key".to_owned()),
            ("oauth_signature".to_owned(), "a+b=".to_owned()),
        ]);
        assert_eq!(
            header,
            "OAuth oauth_consumer_key=\"key\", oauth_signature=\"a%2Bb%3D\""
        );
    }
}
