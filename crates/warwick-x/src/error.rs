use reqwest::{Response, StatusCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned {status}: {body}")]
    Api {
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("a post carries 1 to 4 media items, got {0}")]
    InvalidMediaCount(usize),
    #[error("media {media_id} failed processing: {message}")]
    MediaProcessing { media_id: String, message: String },
    #[error("media at {url} is larger than {limit} bytes")]
    MediaTooLarge { url: String, limit: usize },
    #[error("failed to sign request: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, XError>;

/// Turn a non-2xx response into [`XError::Api`], keeping the body for the error message.
pub(crate) async fn check_status(resp: Response) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }

    let url = resp.url().to_string();
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(XError::Api { url, status, body })
}

pub(crate) async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T> {
    let body = check_status(resp).await?.text().await?;
    Ok(serde_json::from_str(&body)?)
}
