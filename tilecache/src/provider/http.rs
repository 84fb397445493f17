//! HTTP client abstraction for testability
//!
//! [`AsyncHttpClient`] is the transport seam used by
//! [`HttpTileFetcher`](super::HttpTileFetcher). Two implementations ship:
//! [`ReqwestClient`] for real network access, and [`FnClient`], which wraps
//! a caller-supplied function and fully replaces the network transport.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use crate::cache::BoxFuture;
use crate::error::{FetchError, TileError};

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for async HTTP GET operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the response body.
    ///
    /// # Errors
    ///
    /// `FetchError::Status` for a non-success response, `FetchError::Transport`
    /// when the request cannot be completed.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

impl<C: AsyncHttpClient> AsyncHttpClient for Arc<C> {
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send {
        (**self).get(url)
    }
}

/// Transport settings for [`ReqwestClient`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Value of the `User-Agent` header, if any.
    pub user_agent: Option<String>,
    /// Extra headers attached to every request.
    pub headers: Vec<(String, String)>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            headers: Vec::new(),
        }
    }
}

impl HttpConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    fn header_map(&self) -> Result<HeaderMap, TileError> {
        let mut map = HeaderMap::new();
        if let Some(agent) = &self.user_agent {
            let value = HeaderValue::from_str(agent)
                .map_err(|e| TileError::config(format!("invalid User-Agent '{}': {}", agent, e)))?;
            map.insert(USER_AGENT, value);
        }
        for (name, value) in &self.headers {
            let header = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TileError::config(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TileError::config(format!("invalid value for header '{}': {}", name, e)))?;
            map.insert(header, value);
        }
        Ok(map)
    }
}

/// Real HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, TileError> {
        Self::from_config(&HttpConfig::default())
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, TileError> {
        Self::from_config(&HttpConfig::default().with_timeout(Duration::from_secs(timeout_secs)))
    }

    /// Creates a client with the given timeout and headers.
    ///
    /// # Errors
    ///
    /// `SchemaConfiguration` for malformed header names or values, or if the
    /// underlying client cannot be built.
    pub fn from_config(config: &HttpConfig) -> Result<Self, TileError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(config.header_map()?)
            .build()
            .map_err(|e| TileError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(format!("Request failed: {}", e)))?;

        // Check HTTP status
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| FetchError::Transport(format!("Failed to read response: {}", e)))
    }
}

/// Caller-supplied fetch function: resolved address in, bytes out.
pub type FetchFn =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<Vec<u8>, FetchError>> + Send + Sync>;

/// Transport backed by an arbitrary function.
///
/// Replaces the network entirely, e.g. for tests or non-HTTP transports.
///
/// # Example
///
/// ```
/// use tilecache::provider::FnClient;
///
/// let client = FnClient::new(|url: String| async move { Ok(url.into_bytes()) });
/// ```
#[derive(Clone)]
pub struct FnClient {
    fetch: FetchFn,
}

impl FnClient {
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<u8>, FetchError>> + Send + 'static,
    {
        Self {
            fetch: Arc::new(move |url: String| -> BoxFuture<'static, Result<Vec<u8>, FetchError>> {
                Box::pin(fetch(url))
            }),
        }
    }

    pub fn from_fn(fetch: FetchFn) -> Self {
        Self { fetch }
    }
}

impl AsyncHttpClient for FnClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        (self.fetch)(url.to_string()).await
    }
}

/// The network client, or a caller-supplied override replacing it.
///
/// Lets factories return one concrete source type whichever transport the
/// caller picked.
#[derive(Clone)]
pub enum HttpTransport {
    Network(ReqwestClient),
    Override(FnClient),
}

impl HttpTransport {
    /// Uses `fetch` when given, otherwise a network client built from `config`.
    pub fn select(fetch: Option<FetchFn>, config: &HttpConfig) -> Result<Self, TileError> {
        match fetch {
            Some(fetch) => Ok(HttpTransport::Override(FnClient::from_fn(fetch))),
            None => Ok(HttpTransport::Network(ReqwestClient::from_config(config)?)),
        }
    }

    pub fn is_override(&self) -> bool {
        matches!(self, HttpTransport::Override(_))
    }
}

impl AsyncHttpClient for HttpTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        match self {
            HttpTransport::Network(client) => client.get(url).await,
            HttpTransport::Override(client) => client.get(url).await,
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mock async HTTP client for testing
    ///
    /// Replays `response` for every request and records the URLs it saw.
    pub struct MockAsyncHttpClient {
        pub response: Result<Vec<u8>, FetchError>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockAsyncHttpClient {
        pub fn new(response: Result<Vec<u8>, FetchError>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requested_urls(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl AsyncHttpClient for MockAsyncHttpClient {
        async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn test_mock_client_success() {
        let mock = MockAsyncHttpClient::new(Ok(vec![1, 2, 3, 4]));

        let result = mock.get("http://example.com").await;
        assert_eq!(result.unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(mock.requested_urls(), vec!["http://example.com".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_client_error() {
        let mock = MockAsyncHttpClient::new(Err(FetchError::Status { status: 503 }));

        let result = mock.get("http://example.com").await;
        assert_eq!(result, Err(FetchError::Status { status: 503 }));
    }

    #[tokio::test]
    async fn test_fn_client_receives_resolved_url() {
        let client = FnClient::new(|url: String| async move { Ok(url.into_bytes()) });
        let body = client.get("https://tiles.example.com/1/2/3.png").await.unwrap();
        assert_eq!(body, b"https://tiles.example.com/1/2/3.png".to_vec());
    }

    #[tokio::test]
    async fn test_fn_client_propagates_failure() {
        let client =
            FnClient::new(|_url: String| async move { Err(FetchError::Other("offline".into())) });
        assert_eq!(
            client.get("x").await,
            Err(FetchError::Other("offline".into()))
        );
    }

    #[test]
    fn test_http_config_rejects_bad_header() {
        let config = HttpConfig::default().with_header("bad header", "value");
        assert!(matches!(
            ReqwestClient::from_config(&config),
            Err(TileError::SchemaConfiguration(_))
        ));

        let config = HttpConfig::default().with_user_agent("line\nbreak");
        assert!(ReqwestClient::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_transport_prefers_override() {
        let fetch: FetchFn =
            Arc::new(|url: String| -> BoxFuture<'static, Result<Vec<u8>, FetchError>> {
                Box::pin(async move { Ok(url.into_bytes()) })
            });
        let transport = HttpTransport::select(Some(fetch), &HttpConfig::default()).unwrap();

        assert!(transport.is_override());
        assert_eq!(transport.get("mem://1/2/3").await.unwrap(), b"mem://1/2/3".to_vec());

        let network = HttpTransport::select(None, &HttpConfig::default()).unwrap();
        assert!(!network.is_override());
    }

    #[test]
    fn test_http_config_builds_client() {
        let config = HttpConfig::default()
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("tilecache-tests/1.0")
            .with_header("Referer", "https://example.com/");
        assert!(ReqwestClient::from_config(&config).is_ok());
    }
}
