//! Outbound HTTP with per-path rate-limit cooling and a one-shot token refresh.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::config::ClientConfig;
use crate::external::backoff::BackoffState;
use crate::external::client::build_http_client;

/// Marks a request that is already the retry after a token refresh
pub const AUTH_RETRY_HEADER: &str = "x-auth-retry";

/// Path of the token refresh endpoint on the CRM API
pub const REFRESH_PATH: &str = "/api/auth/refresh";

#[derive(Debug, Error)]
pub enum FetchError {
    /// The path is cooling after repeated 429s; no request was sent
    #[error("Request to {path} suppressed while cooling down until {retry_at}")]
    Cooling {
        path: String,
        retry_at: DateTime<Utc>,
    },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Token refresh failed: {0}")]
    Refresh(String),

    #[error("Unexpected response status {status}: {message}")]
    Status { status: u16, message: String },
}

impl FetchError {
    pub fn is_cooling(&self) -> bool {
        matches!(self, FetchError::Cooling { .. })
    }

    pub fn retry_at(&self) -> Option<DateTime<Utc>> {
        match self {
            FetchError::Cooling { retry_at, .. } => Some(*retry_at),
            _ => None,
        }
    }
}

/// Supplies a fresh access token after the API answered 401
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> Result<String, FetchError>;
}

/// `reqwest` wrapper that tracks 429s per path.
///
/// Every response is handed back untouched, 429 included; only a cooling
/// path or a transport failure turns into an error.
#[derive(Clone)]
pub struct BackoffClient {
    http: reqwest::Client,
    base_url: Url,
    state: BackoffState,
    access_token: Arc<RwLock<Option<String>>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl BackoffClient {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        state: BackoffState,
    ) -> Result<Self, FetchError> {
        let base_url =
            Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(format!("{base_url}: {e}")))?;
        Ok(Self {
            http,
            base_url,
            state,
            access_token: Arc::new(RwLock::new(None)),
            refresher: None,
        })
    }

    /// Build the HTTP client and backoff state from `client.*` settings
    pub fn from_config(config: &ClientConfig) -> Result<Self, FetchError> {
        let http = build_http_client(config)?;
        Self::new(http, &config.base_url, BackoffState::new(config.backoff.clone()))
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Arc::new(RwLock::new(Some(token.into())));
        self
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn state(&self) -> &BackoffState {
        &self.state
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn access_token(&self) -> Option<String> {
        self.access_token.read().await.clone()
    }

    pub async fn get(&self, path: &str) -> Result<Response, FetchError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Response, FetchError> {
        self.request(Method::POST, path, Some(body)).await
    }

    /// Send `method path` relative to the base URL.
    ///
    /// A 401 is answered once: the refresher is asked for a new token and the
    /// request is re-sent carrying [`AUTH_RETRY_HEADER`]. Whatever comes back
    /// from the retry is returned as-is.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response, FetchError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| FetchError::InvalidUrl(format!("{path}: {e}")))?;
        let key = url.path().to_string();

        if let Err(retry_at) = self.state.check(&key, Utc::now()) {
            tracing::warn!(path = %key, retry_at = %retry_at, "Request suppressed while cooling");
            return Err(FetchError::Cooling {
                path: key,
                retry_at,
            });
        }

        let response = self.send(&method, url.clone(), body, false).await?;
        self.track(&key, response.status());

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }
        let Some(refresher) = &self.refresher else {
            return Ok(response);
        };

        tracing::debug!(path = %key, "Access token rejected, refreshing");
        let token = refresher.refresh().await?;
        *self.access_token.write().await = Some(token);

        let retried = self.send(&method, url, body, true).await?;
        self.track(&key, retried.status());
        Ok(retried)
    }

    async fn send(
        &self,
        method: &Method,
        url: Url,
        body: Option<&Value>,
        auth_retry: bool,
    ) -> Result<Response, FetchError> {
        let token = self.access_token.read().await.clone();

        let mut request = self.http.request(method.clone(), url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if auth_retry {
            request = request.header(AUTH_RETRY_HEADER, "1");
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        Ok(request.send().await?)
    }

    fn track(&self, path: &str, status: StatusCode) {
        if status == StatusCode::TOO_MANY_REQUESTS {
            let window = self.state.record_rate_limited(path, Utc::now());
            tracing::warn!(
                path = %path,
                count = self.state.count(path),
                cooling_ms = window.as_millis() as u64,
                "Rate limited"
            );
        } else {
            self.state.record_success(path);
        }
    }
}

#[derive(Debug, Deserialize)]
struct RefreshedTokens {
    access_token: String,
    refresh_token: String,
}

/// Exchanges a refresh token at `POST /api/auth/refresh`.
///
/// The endpoint rotates refresh tokens, so the newest one is kept for the
/// next exchange.
pub struct HttpTokenRefresher {
    http: reqwest::Client,
    endpoint: Url,
    refresh_token: RwLock<String>,
}

impl HttpTokenRefresher {
    pub fn new(
        http: reqwest::Client,
        base_url: &Url,
        refresh_token: impl Into<String>,
    ) -> Result<Self, FetchError> {
        let endpoint = base_url
            .join(REFRESH_PATH)
            .map_err(|e| FetchError::InvalidUrl(format!("{REFRESH_PATH}: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            refresh_token: RwLock::new(refresh_token.into()),
        })
    }
}

#[async_trait]
impl TokenRefresher for HttpTokenRefresher {
    async fn refresh(&self) -> Result<String, FetchError> {
        let refresh_token = self.refresh_token.read().await.clone();
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Refresh(format!(
                "refresh endpoint answered {status}"
            )));
        }

        let tokens: RefreshedTokens = response.json().await?;
        *self.refresh_token.write().await = tokens.refresh_token;
        Ok(tokens.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackoffConfig;
    use axum::Router;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fast_backoff() -> BackoffConfig {
        BackoffConfig {
            base_delay_ms: 20,
            max_delay_ms: 1_000,
            jitter_ms: 0,
            extended_threshold: 3,
            extended_max_ms: 5_000,
        }
    }

    async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str) -> BackoffClient {
        BackoffClient::new(
            reqwest::Client::new(),
            base_url,
            BackoffState::new(fast_backoff()),
        )
        .unwrap()
    }

    /// Sleep until `path` has left its cooling window
    async fn wait_for_cooldown(client: &BackoffClient, path: &str) {
        if let Some(until) = client
            .state()
            .stats()
            .get(path)
            .and_then(|entry| entry.cooling_until)
        {
            let remaining = (until - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(remaining + Duration::from_millis(10)).await;
        }
    }

    fn counting_route(hits: &Arc<AtomicUsize>, status: StatusCode) -> axum::routing::MethodRouter {
        let hits = hits.clone();
        get(move || {
            let hits = hits.clone();
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                status
            }
        })
    }

    struct StaticRefresher {
        token: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenRefresher for StaticRefresher {
        async fn refresh(&self) -> Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.token.to_string())
        }
    }

    #[tokio::test]
    async fn test_fresh_path_is_sent_immediately() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(Router::new().route("/ok", counting_route(&hits, StatusCode::OK))).await;

        let response = client(&base).get("/ok").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limited_response_is_returned() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(
            Router::new().route("/limited", counting_route(&hits, StatusCode::TOO_MANY_REQUESTS)),
        )
        .await;

        let client = client(&base);
        let response = client.get("/limited").await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(client.state().count("/limited"), 1);
    }

    #[tokio::test]
    async fn test_three_429s_cool_the_path_without_sending() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(
            Router::new().route("/limited", counting_route(&hits, StatusCode::TOO_MANY_REQUESTS)),
        )
        .await;

        let client = client(&base);
        for _ in 0..3 {
            wait_for_cooldown(&client, "/limited").await;
            let response = client.get("/limited").await.unwrap();
            assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }

        let err = client.get("/limited").await.unwrap_err();
        assert!(err.is_cooling());
        assert!(err.retry_at().is_some());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_success_after_429s_resets_count() {
        let hits = Arc::new(AtomicUsize::new(0));
        let route_hits = hits.clone();
        let router = Router::new().route(
            "/flaky",
            get(move || {
                let hits = route_hits.clone();
                async move {
                    if hits.fetch_add(1, Ordering::SeqCst) < 2 {
                        StatusCode::TOO_MANY_REQUESTS
                    } else {
                        StatusCode::OK
                    }
                }
            }),
        );
        let base = spawn_server(router).await;

        let client = client(&base);
        for _ in 0..2 {
            wait_for_cooldown(&client, "/flaky").await;
            client.get("/flaky").await.unwrap();
        }
        assert_eq!(client.state().count("/flaky"), 2);

        wait_for_cooldown(&client, "/flaky").await;
        let response = client.get("/flaky?attempt=3").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(client.state().count("/flaky"), 0);
        assert!(client.state().stats().is_empty());
    }

    #[tokio::test]
    async fn test_cooling_is_per_path() {
        let limited = Arc::new(AtomicUsize::new(0));
        let ok = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(
            Router::new()
                .route("/limited", counting_route(&limited, StatusCode::TOO_MANY_REQUESTS))
                .route("/ok", counting_route(&ok, StatusCode::OK)),
        )
        .await;

        // default windows start at 500ms, long enough to observe cooling
        let client = BackoffClient::new(
            reqwest::Client::new(),
            &base,
            BackoffState::new(BackoffConfig::default()),
        )
        .unwrap();
        client.get("/limited").await.unwrap();
        assert!(client.get("/limited").await.unwrap_err().is_cooling());
        assert_eq!(client.get("/ok").await.unwrap().status(), StatusCode::OK);
    }

    fn secure_router(hits: &Arc<AtomicUsize>, retried: &Arc<AtomicUsize>) -> Router {
        let hits = hits.clone();
        let retried = retried.clone();
        Router::new().route(
            "/secure",
            post(move |headers: HeaderMap| {
                let hits = hits.clone();
                let retried = retried.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    if headers.contains_key(AUTH_RETRY_HEADER) {
                        retried.fetch_add(1, Ordering::SeqCst);
                    }
                    let authorized = headers
                        .get("authorization")
                        .and_then(|value| value.to_str().ok())
                        == Some("Bearer fresh");
                    if authorized {
                        StatusCode::OK
                    } else {
                        StatusCode::UNAUTHORIZED
                    }
                }
            }),
        )
    }

    #[tokio::test]
    async fn test_401_refreshes_once_and_retries() {
        let hits = Arc::new(AtomicUsize::new(0));
        let retried = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(secure_router(&hits, &retried)).await;

        let refresher = Arc::new(StaticRefresher {
            token: "fresh",
            calls: AtomicUsize::new(0),
        });
        let client = client(&base)
            .with_access_token("stale")
            .with_refresher(refresher.clone());

        let response = client.post("/secure", &json!({})).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(retried.load(Ordering::SeqCst), 1);
        assert_eq!(client.access_token().await.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_second_401_is_returned() {
        let hits = Arc::new(AtomicUsize::new(0));
        let retried = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(secure_router(&hits, &retried)).await;

        let refresher = Arc::new(StaticRefresher {
            token: "still-wrong",
            calls: AtomicUsize::new(0),
        });
        let client = client(&base)
            .with_access_token("stale")
            .with_refresher(refresher.clone());

        let response = client.post("/secure", &json!({})).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_401_without_refresher_is_returned() {
        let hits = Arc::new(AtomicUsize::new(0));
        let retried = Arc::new(AtomicUsize::new(0));
        let base = spawn_server(secure_router(&hits, &retried)).await;

        let response = client(&base).post("/secure", &json!({})).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(retried.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_http_refresher_rotates_tokens() {
        let router = Router::new().route(
            REFRESH_PATH,
            post(|axum::Json(body): axum::Json<Value>| async move {
                let presented = body["refresh_token"].as_str().unwrap_or_default().to_string();
                axum::Json(json!({
                    "access_token": format!("access-for-{presented}"),
                    "refresh_token": format!("{presented}-next"),
                    "token_type": "Bearer",
                    "expires_in": 3600
                }))
            }),
        );
        let base = spawn_server(router).await;
        let base_url = Url::parse(&base).unwrap();

        let refresher = HttpTokenRefresher::new(reqwest::Client::new(), &base_url, "r1").unwrap();
        assert_eq!(refresher.refresh().await.unwrap(), "access-for-r1");
        assert_eq!(refresher.refresh().await.unwrap(), "access-for-r1-next");
    }

    #[tokio::test]
    async fn test_http_refresher_rejected() {
        let router = Router::new().route(REFRESH_PATH, post(|| async { StatusCode::UNAUTHORIZED }));
        let base = spawn_server(router).await;
        let base_url = Url::parse(&base).unwrap();

        let refresher = HttpTokenRefresher::new(reqwest::Client::new(), &base_url, "r1").unwrap();
        let err = refresher.refresh().await.unwrap_err();
        assert!(matches!(err, FetchError::Refresh(_)));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = BackoffClient::new(
            reqwest::Client::new(),
            "not a url",
            BackoffState::new(fast_backoff()),
        );
        assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
    }
}
