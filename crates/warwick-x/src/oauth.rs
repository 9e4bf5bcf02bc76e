//! OAuth 1.0a request signing (RFC 5849, HMAC-SHA1), the scheme X uses for
//! user-context requests.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{Result, XError};

type HmacSha1 = Hmac<Sha1>;

const SIGNATURE_METHOD: &str = "HMAC-SHA1";
const VERSION: &str = "1.0";

/// Consumer and token credentials used to sign requests.
#[derive(Clone, Copy)]
pub struct Credentials<'a> {
    pub consumer_key: &'a str,
    pub consumer_secret: &'a str,
    pub token: &'a str,
    pub token_secret: &'a str,
}

/// RFC 3986 percent-encoding: everything except `A-Z a-z 0-9 - . _ ~`.
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Build the `Authorization` header for a request with a fresh nonce and timestamp.
///
/// `url` must not carry a query string; query and form parameters go in `params`.
pub fn authorization_header(
    creds: Credentials<'_>,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
) -> Result<String> {
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    let timestamp = chrono::Utc::now().timestamp().to_string();
    authorization_header_with(creds, method, url, params, &nonce, &timestamp)
}

pub fn authorization_header_with(
    creds: Credentials<'_>,
    method: &str,
    url: &str,
    params: &[(&str, &str)],
    nonce: &str,
    timestamp: &str,
) -> Result<String> {
    let mut oauth_params = vec![
        ("oauth_consumer_key", creds.consumer_key),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", SIGNATURE_METHOD),
        ("oauth_timestamp", timestamp),
        ("oauth_token", creds.token),
        ("oauth_version", VERSION),
    ];

    let mut all_params = oauth_params.clone();
    all_params.extend_from_slice(params);

    let base = signature_base_string(method, url, &all_params);
    let signature = sign(&base, creds.consumer_secret, creds.token_secret)?;

    oauth_params.push(("oauth_signature", &signature));
    oauth_params.sort();

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {fields}"))
}

pub fn signature_base_string(method: &str, url: &str, params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&normalized)
    )
}

/// HMAC-SHA1 over `base` keyed by `consumer_secret&token_secret`, base64-encoded.
pub fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> Result<String> {
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).map_err(|e| XError::Signing(e.to_string()))?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
