use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// HTTP GET request envelope used by the quote service transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub timeout_ms: u64,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            timeout_ms: 10_000,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// HTTP response envelope returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn ok_json(body: impl Into<String>) -> Self {
        Self::new(200, body)
    }

    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Why a request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HttpError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("could not connect: {0}")]
    Connect(String),
    #[error("{0}")]
    Transport(String),
}

impl HttpError {
    /// Generic transport failure, used by stubs and body-read errors.
    pub fn new(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Timeout(detail) | Self::Connect(detail) | Self::Transport(detail) => detail,
        }
    }

    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<reqwest::Error> for HttpError {
    fn from(error: reqwest::Error) -> Self {
        let detail = error.to_string();
        if error.is_timeout() {
            Self::Timeout(detail)
        } else if error.is_connect() {
            Self::Connect(detail)
        } else {
            Self::Transport(detail)
        }
    }
}

/// Async transport contract; bounded by the request's own timeout.
pub trait HttpClient: Send + Sync {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;
}

/// reqwest-backed transport. Cloning shares the connection pool.
#[derive(Debug, Clone, Default)]
pub struct ReqwestHttpClient {
    inner: Arc<reqwest::Client>,
}

impl ReqwestHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(client),
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let headers = request
            .headers
            .iter()
            .fold(self.inner.get(&request.url), |builder, (name, value)| {
                builder.header(name, value)
            });

        let response = headers
            .timeout(Duration::from_millis(request.timeout_ms))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpResponse::new(status, body))
    }
}

impl HttpClient for ReqwestHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(self.send(request))
    }
}

#[derive(Debug, Clone)]
struct StubRoute {
    fragment: String,
    reply: Result<HttpResponse, HttpError>,
}

/// Scripted offline transport.
///
/// Replies are matched by URL fragment (longest match wins) and every request
/// is recorded, so tests can assert both what was asked and how often.
#[derive(Debug, Default)]
pub struct StubHttpClient {
    routes: Mutex<Vec<StubRoute>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Option<Duration>,
}

impl StubHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every reply, so concurrent callers overlap.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn respond(&self, url_fragment: impl Into<String>, response: HttpResponse) {
        self.route(url_fragment.into(), Ok(response));
    }

    pub fn respond_json(&self, url_fragment: impl Into<String>, body: impl Into<String>) {
        self.respond(url_fragment, HttpResponse::ok_json(body));
    }

    pub fn fail(&self, url_fragment: impl Into<String>, error: HttpError) {
        self.route(url_fragment.into(), Err(error));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("stub request log lock is not poisoned")
            .clone()
    }

    pub fn request_urls(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.url)
            .collect()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .expect("stub request log lock is not poisoned")
            .len()
    }

    pub fn clear_requests(&self) {
        self.requests
            .lock()
            .expect("stub request log lock is not poisoned")
            .clear();
    }

    fn route(&self, fragment: String, reply: Result<HttpResponse, HttpError>) {
        let mut routes = self.routes.lock().expect("stub route lock is not poisoned");
        routes.retain(|route| route.fragment != fragment);
        routes.push(StubRoute { fragment, reply });
    }

    fn reply_for(&self, url: &str) -> Result<HttpResponse, HttpError> {
        let routes = self.routes.lock().expect("stub route lock is not poisoned");
        routes
            .iter()
            .filter(|route| url.contains(&route.fragment))
            .max_by_key(|route| route.fragment.len())
            .map(|route| route.reply.clone())
            .unwrap_or_else(|| Ok(HttpResponse::new(404, r#"{"error":"no stub route"}"#)))
    }
}

impl HttpClient for StubHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let reply = self.reply_for(&request.url);
            self.requests
                .lock()
                .expect("stub request log lock is not poisoned")
                .push(request);

            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }

            reply
        })
    }
}
