use futures::StreamExt;
use reqwest::redirect::Policy;
use secrecy::{ExposeSecret, SecretString};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use super::types::{Repository, SearchResponse};
use crate::storage::Topic;

/// Official GitHub REST API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

const MAX_BODY_SIZE: usize = 5 * 1024 * 1024; // 5MB

const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_RAW: &str = "application/vnd.github.raw+json";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Unexpected response shape: {0}")]
    Decode(String),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid UTF-8 in response")]
    InvalidUtf8,
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
    #[error("Invalid repository name '{0}'")]
    InvalidRepoName(String),
    #[error("No topics to search for")]
    EmptyQuery,
}

/// Remote source of topic-filtered repository pages.
///
/// The feed controller is generic over this so tests can swap in a stub.
pub trait RepoSearch: Send + Sync + 'static {
    /// Fetch one page (1-based) of repositories tagged with every topic in
    /// `topics`, most recently updated first.
    fn fetch_page(
        &self,
        page: u32,
        topics: &[Topic],
    ) -> impl Future<Output = Result<Vec<Repository>, SearchError>> + Send;

    /// Fetch the raw README text for `owner/repo`.
    fn fetch_readme(
        &self,
        full_name: &str,
    ) -> impl Future<Output = Result<String, SearchError>> + Send;
}

/// Limit redirects to 3 hops and stop on loops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev == url) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );
        attempt.follow()
    })
}

/// Shared HTTP client with connection pooling and keepalive.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(concat!("ghtopics/", env!("CARGO_PKG_VERSION")))
        .redirect(create_redirect_policy())
        .pool_max_idle_per_host(4)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(60))
        .timeout(Duration::from_secs(30))
        .build()
}

/// GitHub REST client for topic search and README retrieval.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl GitHubClient {
    /// Create a client against `base_url` (or the public API when `None`).
    ///
    /// # Errors
    ///
    /// `SearchError::InsecureBaseUrl` for a non-HTTPS base other than
    /// `http://localhost` or `http://127.0.0.1`.
    pub fn new(
        http: reqwest::Client,
        base_url: Option<&str>,
        token: Option<SecretString>,
    ) -> Result<Self, SearchError> {
        let base = base_url.unwrap_or(DEFAULT_API_BASE).trim_end_matches('/');

        if !base.starts_with("https://") {
            let is_localhost =
                base.starts_with("http://127.0.0.1") || base.starts_with("http://localhost");
            if !is_localhost {
                tracing::error!(base_url = %base, "Rejecting non-HTTPS API base URL");
                return Err(SearchError::InsecureBaseUrl);
            }
            tracing::warn!(base_url = %base, "Using non-HTTPS API base URL (localhost only)");
        }
        Url::parse(base).map_err(|e| SearchError::InvalidBaseUrl(e.to_string()))?;

        if base_url.is_some() {
            tracing::info!(base_url = %base, "Using custom GitHub API base URL");
        }

        Ok(Self {
            http,
            base_url: base.to_string(),
            token,
        })
    }

    /// Search URL for one page of repositories carrying all of `topics`.
    pub(crate) fn search_url(&self, page: u32, topics: &[Topic]) -> Result<Url, SearchError> {
        if topics.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let mut q: Vec<String> = topics.iter().map(|t| format!("topic:{t}")).collect();
        q.push("sort:updated-desc".to_string());

        let mut url = Url::parse(&format!("{}/search/repositories", self.base_url))
            .map_err(|e| SearchError::InvalidBaseUrl(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("q", &q.join(" "))
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    fn readme_url(&self, full_name: &str) -> Result<Url, SearchError> {
        let invalid = || SearchError::InvalidRepoName(full_name.to_string());
        let (owner, repo) = full_name.split_once('/').ok_or_else(invalid)?;
        let valid_part = |s: &str| {
            !s.is_empty()
                && s != "."
                && s != ".."
                && s
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        };
        if !valid_part(owner) || !valid_part(repo) {
            return Err(invalid());
        }

        Url::parse(&format!("{}/repos/{owner}/{repo}/readme", self.base_url))
            .map_err(|e| SearchError::InvalidBaseUrl(e.to_string()))
    }

    fn request(&self, url: Url, accept: &'static str) -> reqwest::RequestBuilder {
        let mut request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .header("X-GitHub-Api-Version", "2022-11-28");

        // Only the official host ever sees the token
        if let Some(token) = &self.token {
            if self.base_url == DEFAULT_API_BASE {
                request = request.bearer_auth(token.expose_secret());
            } else {
                tracing::debug!("Skipping token for non-official API base URL");
            }
        }
        request
    }
}

impl RepoSearch for GitHubClient {
    async fn fetch_page(&self, page: u32, topics: &[Topic]) -> Result<Vec<Repository>, SearchError> {
        let url = self.search_url(page, topics)?;
        tracing::debug!(page, topics = topics.len(), "Searching repositories");

        let response = self.request(url, ACCEPT_JSON).send().await?;
        if !response.status().is_success() {
            return Err(SearchError::HttpStatus(response.status().as_u16()));
        }

        let body = read_limited(response, MAX_BODY_SIZE).await?;
        let parsed: SearchResponse =
            serde_json::from_slice(&body).map_err(|e| SearchError::Decode(e.to_string()))?;
        Ok(parsed.items)
    }

    async fn fetch_readme(&self, full_name: &str) -> Result<String, SearchError> {
        let url = self.readme_url(full_name)?;
        tracing::debug!(repo = %full_name, "Fetching README");

        let response = self.request(url, ACCEPT_RAW).send().await?;
        if !response.status().is_success() {
            return Err(SearchError::HttpStatus(response.status().as_u16()));
        }

        let body = read_limited(response, MAX_BODY_SIZE).await?;
        String::from_utf8(body).map_err(|_| SearchError::InvalidUtf8)
    }
}

/// Read a response body, failing once it exceeds `limit` bytes.
async fn read_limited(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, SearchError> {
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(SearchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(SearchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn topics(tags: &[&str]) -> Vec<Topic> {
        tags.iter().map(|t| Topic::parse(t).unwrap()).collect()
    }

    fn item(n: usize) -> serde_json::Value {
        serde_json::json!({
            "html_url": format!("https://github.com/o/r{n}"),
            "name": format!("r{n}"),
            "full_name": format!("o/r{n}"),
        })
    }

    fn client_for(server: &MockServer) -> GitHubClient {
        GitHubClient::new(reqwest::Client::new(), Some(&server.uri()), None).unwrap()
    }

    #[test]
    fn test_insecure_base_rejected() {
        let result = GitHubClient::new(reqwest::Client::new(), Some("http://example.com"), None);
        assert!(matches!(result, Err(SearchError::InsecureBaseUrl)));
    }

    #[test]
    fn test_localhost_base_allowed() {
        let result = GitHubClient::new(reqwest::Client::new(), Some("http://127.0.0.1:9"), None);
        assert!(result.is_ok());
    }

    #[test]
    fn test_debug_redacts_token() {
        let client = GitHubClient::new(
            reqwest::Client::new(),
            None,
            Some(SecretString::from("ghp_supersecret")),
        )
        .unwrap();
        let debug = format!("{client:?}");
        assert!(!debug.contains("ghp_supersecret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_search_url_format() {
        let client = GitHubClient::new(reqwest::Client::new(), None, None).unwrap();
        let url = client.search_url(2, &topics(&["rust", "cli"])).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/search/repositories?q=topic%3Arust+topic%3Acli+sort%3Aupdated-desc&page=2"
        );
    }

    #[test]
    fn test_search_url_requires_topics() {
        let client = GitHubClient::new(reqwest::Client::new(), None, None).unwrap();
        assert!(matches!(
            client.search_url(1, &[]),
            Err(SearchError::EmptyQuery)
        ));
    }

    #[test]
    fn test_readme_url_rejects_traversal() {
        let client = GitHubClient::new(reqwest::Client::new(), None, None).unwrap();
        assert!(client.readme_url("../etc").is_err());
        assert!(client.readme_url("noslash").is_err());
        assert!(client.readme_url("a/b/c").is_err());
        assert!(client.readme_url("tokio-rs/tokio").is_ok());
    }

    #[tokio::test]
    async fn test_fetch_page_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .and(query_param("q", "topic:rust topic:cli sort:updated-desc"))
            .and(query_param("page", "1"))
            .and(header("accept", ACCEPT_JSON))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total_count": 2,
                "incomplete_results": false,
                "items": [item(1), item(2)],
            })))
            .expect(1)
            .mount(&server)
            .await;

        let repos = client_for(&server)
            .fetch_page(1, &topics(&["rust", "cli"]))
            .await
            .unwrap();
        let names: Vec<_> = repos.iter().map(|r| r.full_name.as_str()).collect();
        assert_eq!(names, vec!["o/r1", "o/r2"]);
    }

    #[tokio::test]
    async fn test_fetch_page_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_page(1, &topics(&["rust"])).await;
        assert!(matches!(result, Err(SearchError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_fetch_page_malformed_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_page(1, &topics(&["rust"])).await;
        assert!(matches!(result, Err(SearchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_fetch_page_item_missing_identity_fails_whole_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [item(1), {"name": "broken"}],
            })))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_page(1, &topics(&["rust"])).await;
        assert!(matches!(result, Err(SearchError::Decode(_))));
    }

    #[tokio::test]
    async fn test_token_not_sent_to_custom_base() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
            .mount(&server)
            .await;

        let client = GitHubClient::new(
            reqwest::Client::new(),
            Some(&server.uri()),
            Some(SecretString::from("ghp_token")),
        )
        .unwrap();
        let repos = client.fetch_page(1, &topics(&["rust"])).await.unwrap();
        assert!(repos.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_readme_raw() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/tokio-rs/tokio/readme"))
            .and(header("accept", ACCEPT_RAW))
            .respond_with(ResponseTemplate::new(200).set_body_string("# Tokio\n\nAsync runtime"))
            .mount(&server)
            .await;

        let readme = client_for(&server)
            .fetch_readme("tokio-rs/tokio")
            .await
            .unwrap();
        assert!(readme.starts_with("# Tokio"));
    }

    #[tokio::test]
    async fn test_fetch_readme_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_readme("o/r").await;
        assert!(matches!(result, Err(SearchError::HttpStatus(404))));
    }

    #[tokio::test]
    async fn test_readme_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(MAX_BODY_SIZE + 1)))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_readme("o/r").await;
        assert!(matches!(result, Err(SearchError::ResponseTooLarge(_))));
    }

    #[tokio::test]
    async fn test_readme_invalid_utf8() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xfe, 0xfd]))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_readme("o/r").await;
        assert!(matches!(result, Err(SearchError::InvalidUtf8)));
    }
}
