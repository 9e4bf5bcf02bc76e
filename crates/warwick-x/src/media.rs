use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use reqwest::{Client, Url};
use tracing::debug;

use crate::error::{Result, XError, check_status};
use crate::upload::SEGMENT_SIZE;

/// Largest media body buffered for upload (X's video ceiling).
pub const MAX_MEDIA_BYTES: usize = 512 * 1024 * 1024;

/// GET `url` and buffer the whole streamed body in memory.
pub async fn fetch_bytes(client: &Client, url: &str) -> Result<Bytes> {
    fetch_bytes_limited(client, url, MAX_MEDIA_BYTES).await
}

/// Like [`fetch_bytes`], failing with [`XError::MediaTooLarge`] once the body
/// is known to exceed `limit` bytes.
pub async fn fetch_bytes_limited(client: &Client, url: &str, limit: usize) -> Result<Bytes> {
    let resp = check_status(client.get(url).send().await?).await?;

    // Content-Length is the sender's claim; it only sizes the first allocation.
    let announced = resp.content_length().unwrap_or(0);
    if announced > limit as u64 {
        return Err(XError::MediaTooLarge {
            url: url.to_string(),
            limit,
        });
    }

    let mut buf = BytesMut::with_capacity((announced as usize).min(SEGMENT_SIZE));
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if buf.len() + chunk.len() > limit {
            return Err(XError::MediaTooLarge {
                url: url.to_string(),
                limit,
            });
        }
        buf.extend_from_slice(&chunk);
    }

    debug!("Fetched {} bytes from {}", buf.len(), url);
    Ok(buf.freeze())
}

/// Last non-empty path segment of `url`, percent-decoded, used as the upload
/// filename. Falls back to `media`.
pub fn filename_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()?
                .filter(|s| !s.is_empty())
                .last()
                .map(|s| {
                    urlencoding::decode(s)
                        .map(|decoded| decoded.into_owned())
                        .unwrap_or_else(|_| s.to_string())
                })
        })
        .unwrap_or_else(|| "media".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serve one raw HTTP response, whatever the request.
    async fn serve_raw(response: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;
            let _ = socket.write_all(response).await;
            let _ = socket.shutdown().await;
        });
        format!("http://{}/cat.png", addr)
    }

    #[tokio::test]
    async fn buffers_entire_body() {
        let server = MockServer::start().await;
        let payload: Vec<u8> = (0..=255u8).cycle().take(256 * 1024).collect();
        Mock::given(method("GET"))
            .and(path("/cat.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
            .mount(&server)
            .await;

        let bytes = fetch_bytes(&Client::new(), &format!("{}/cat.png", server.uri()))
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn missing_media_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = fetch_bytes(&Client::new(), &format!("{}/gone.png", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, XError::Api { status, .. } if status.as_u16() == 404));
    }

    #[tokio::test]
    async fn huge_announced_length_is_rejected_without_allocating() {
        let url = serve_raw(
            b"HTTP/1.1 200 OK\r\nContent-Length: 9223372036854775000\r\nConnection: close\r\n\r\nabc",
        )
        .await;

        let err = fetch_bytes(&Client::new(), &url).await.unwrap_err();
        assert!(matches!(err, XError::MediaTooLarge { limit, .. } if limit == MAX_MEDIA_BYTES));
    }

    #[tokio::test]
    async fn chunked_body_over_limit_is_rejected() {
        let url = serve_raw(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n14\r\n01234567890123456789\r\n0\r\n\r\n",
        )
        .await;

        let err = fetch_bytes_limited(&Client::new(), &url, 10).await.unwrap_err();
        assert!(matches!(err, XError::MediaTooLarge { limit: 10, .. }));
    }

    #[tokio::test]
    async fn body_within_limit_is_kept() {
        let url = serve_raw(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\nabc").await;

        let bytes = fetch_bytes_limited(&Client::new(), &url, 3).await.unwrap();
        assert_eq!(bytes.as_ref(), b"abc");
    }

    #[test]
    fn filenames() {
        assert_eq!(filename_from_url("https://cdn.example.com/a/b/cat.png"), "cat.png");
        assert_eq!(filename_from_url("https://cdn.example.com/cat.gif?width=100"), "cat.gif");
        assert_eq!(filename_from_url("https://cdn.example.com/dir/"), "dir");
        assert_eq!(filename_from_url("https://cdn.example.com/my%20cat.png"), "my cat.png");
        assert_eq!(filename_from_url("https://cdn.example.com"), "media");
        assert_eq!(filename_from_url("https://cdn.example.com/"), "media");
        assert_eq!(filename_from_url("not a url"), "media");
    }
}
