use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Method, RequestBuilder};
use tracing::info;

use warwick_types::api::{CreatePostRequest, CreatePostResponse, CurrentUserResponse, PostMedia};
use warwick_types::models::AuthenticationBundle;

use crate::error::{Result, XError, decode};
use crate::media::{fetch_bytes, filename_from_url};
use crate::oauth::{self, Credentials};

pub const API_BASE: &str = "https://api.x.com";
pub const UPLOAD_BASE: &str = "https://upload.twitter.com";

/// X accepts at most four images per post.
pub const MAX_MEDIA_PER_POST: usize = 4;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Link to a post as it appears on the web.
pub fn post_url(username: &str, post_id: &str) -> String {
    format!("https://x.com/{}/status/{}", username, post_id)
}

/// An X account that posts on behalf of one server, using that server's credentials.
pub struct Account {
    auth: AuthenticationBundle,
    http: Client,
    api_base: String,
    pub(crate) upload_base: String,
}

impl Account {
    pub fn new(auth: AuthenticationBundle) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(auth, http))
    }

    pub fn with_client(auth: AuthenticationBundle, http: Client) -> Self {
        Self {
            auth,
            http,
            api_base: API_BASE.to_string(),
            upload_base: UPLOAD_BASE.to_string(),
        }
    }

    /// Point the account at other hosts (a proxy, or a mock server in tests).
    pub fn with_base_urls(mut self, api_base: &str, upload_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.upload_base = upload_base.trim_end_matches('/').to_string();
        self
    }

    fn credentials(&self) -> Credentials<'_> {
        Credentials {
            consumer_key: &self.auth.api_key,
            consumer_secret: &self.auth.api_key_secret,
            token: &self.auth.access_token,
            token_secret: &self.auth.access_token_secret,
        }
    }

    /// Start a request signed for `params`, which must be exactly the query or
    /// form parameters the caller attaches afterwards.
    pub(crate) fn signed(
        &self,
        method: Method,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<RequestBuilder> {
        let header = oauth::authorization_header(self.credentials(), method.as_str(), url, params)?;
        Ok(self.http.request(method, url).header(AUTHORIZATION, header))
    }

    // -- Remote operations --

    /// Create a post and return its id.
    pub async fn create_post(&self, text: Option<&str>, media_ids: Option<Vec<String>>) -> Result<String> {
        let url = format!("{}/2/tweets", self.api_base);
        let body = CreatePostRequest {
            text: text.map(str::to_string),
            media: media_ids.map(|media_ids| PostMedia { media_ids }),
        };

        let resp = self.signed(Method::POST, &url, &[])?.json(&body).send().await?;
        let created: CreatePostResponse = decode(resp).await?;

        info!("Created post {}", created.data.id);
        Ok(created.data.id)
    }

    /// Username of the account the credentials belong to.
    pub async fn get_current_user(&self) -> Result<String> {
        let url = format!("{}/2/users/me", self.api_base);
        let resp = self.signed(Method::GET, &url, &[])?.send().await?;
        let me: CurrentUserResponse = decode(resp).await?;
        Ok(me.data.username)
    }

    // -- Composed operations --

    pub async fn create_text_post(&self, text: &str) -> Result<String> {
        let post_id = self.create_post(Some(text), None).await?;
        self.post_url_for(&post_id).await
    }

    /// Download each link, upload it to X, and post the media (with optional text)
    /// in the order given.
    pub async fn create_post_with_media(&self, text: Option<&str>, media_links: &[String]) -> Result<String> {
        if media_links.is_empty() || media_links.len() > MAX_MEDIA_PER_POST {
            return Err(XError::InvalidMediaCount(media_links.len()));
        }

        let mut media_ids = Vec::with_capacity(media_links.len());
        for link in media_links {
            let bytes = fetch_bytes(&self.http, link).await?;
            let media_id = self.upload_media(bytes, &filename_from_url(link)).await?;
            media_ids.push(media_id);
        }

        let post_id = self.create_post(text, Some(media_ids)).await?;
        self.post_url_for(&post_id).await
    }

    async fn post_url_for(&self, post_id: &str) -> Result<String> {
        let username = self.get_current_user().await?;
        Ok(post_url(&username, post_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bundle() -> AuthenticationBundle {
        AuthenticationBundle {
            bearer_token: "bearer".into(),
            api_key: "key".into(),
            api_key_secret: "key-secret".into(),
            access_token: "token".into(),
            access_token_secret: "token-secret".into(),
        }
    }

    async fn mock_me(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "id": "42", "name": "Warwick", "username": "warwick_bot" }
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn post_url_format() {
        assert_eq!(post_url("warwick_bot", "1234"), "https://x.com/warwick_bot/status/1234");
    }

    #[tokio::test]
    async fn text_post_returns_url() {
        let server = MockServer::start().await;
        mock_me(&server).await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(body_json(serde_json::json!({ "text": "hello" })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": { "id": "1234", "text": "hello" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let account = Account::new(bundle()).unwrap().with_base_urls(&server.uri(), &server.uri());
        let url = account.create_text_post("hello").await.unwrap();
        assert_eq!(url, "https://x.com/warwick_bot/status/1234");
    }

    #[tokio::test]
    async fn api_errors_surface() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let account = Account::new(bundle()).unwrap().with_base_urls(&server.uri(), &server.uri());
        match account.create_text_post("hello").await {
            Err(XError::Api { status, body, .. }) => {
                assert_eq!(status.as_u16(), 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("expected API error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn media_count_is_checked_before_any_request() {
        let account = Account::new(bundle()).unwrap().with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9");

        let none: Vec<String> = vec![];
        assert!(matches!(
            account.create_post_with_media(Some("hi"), &none).await,
            Err(XError::InvalidMediaCount(0))
        ));

        let five: Vec<String> = (0..5).map(|i| format!("http://127.0.0.1:9/{i}.png")).collect();
        assert!(matches!(
            account.create_post_with_media(None, &five).await,
            Err(XError::InvalidMediaCount(5))
        ));
    }
}
