//! HTTP transport boundary with User-Agent rotation.
//!
//! The core consumes the network only through [`Transport`]. [`HttpTransport`]
//! is the [`reqwest`] implementation: cookie store, per-session timeout,
//! optional proxy routing, redirects disabled, and rotating browser
//! User-Agent strings when no fixed one is configured.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use reqwest::header::{CONTENT_ENCODING, USER_AGENT};

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::operation::{Operation, OperationBody};

/// Realistic browser User-Agent strings, rotated per request.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
];

/// Raw response as seen by the executor, before classification and decoding.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Final URL of the exchange.
    pub url: String,
    /// Value of the `Content-Encoding` header, if any.
    pub content_encoding: Option<String>,
    /// Undecoded body bytes.
    pub body: Bytes,
}

/// A transport-level failure (connect, TLS, timeout, body read).
#[derive(Debug, Clone)]
pub struct TransportFault {
    /// Human-readable description from the underlying client.
    pub message: String,
    /// Whether the client flagged this fault as a timeout.
    pub timed_out: bool,
}

impl TransportFault {
    /// A fault with no timeout flag.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    /// A fault the client flagged as a timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }
}

impl From<reqwest::Error> for TransportFault {
    fn from(err: reqwest::Error) -> Self {
        Self {
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

/// The network boundary consumed by a [`Session`](crate::Session).
///
/// Implementations perform exactly one exchange per call and never
/// classify status codes; that is the executor's job.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `operation` (already resolved against overrides and identity
    /// headers) and return the raw response.
    async fn send(&self, operation: &Operation) -> Result<RawResponse, TransportFault>;
}

/// [`reqwest`]-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    rotate_user_agent: bool,
}

impl HttpTransport {
    /// Build a transport configured from `config`.
    ///
    /// The client has:
    /// - Cookie store enabled
    /// - Timeout from config
    /// - Redirects disabled (a 302 is reported as-is)
    /// - Proxy routing when `config.proxy` is set
    /// - A fixed User-Agent if configured, otherwise per-request rotation
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] if the proxy is invalid or the client
    /// cannot be constructed.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(reqwest::redirect::Policy::none());

        if let Some(ref ua) = config.user_agent {
            builder = builder.user_agent(ua.clone());
        }
        if let Some(ref proxy) = config.proxy {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| FetchError::Config(format!("invalid proxy {proxy}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            rotate_user_agent: config.user_agent.is_none(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, operation: &Operation) -> Result<RawResponse, TransportFault> {
        let mut request = self
            .client
            .request(operation.method.clone(), &operation.url);

        if !operation.query.is_empty() {
            request = request.query(&operation.query);
        }
        for (name, value) in &operation.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if self.rotate_user_agent && operation.header(USER_AGENT.as_str()).is_none() {
            request = request.header(USER_AGENT, random_user_agent());
        }
        request = match operation.body {
            Some(OperationBody::Form(ref pairs)) => request.form(pairs),
            Some(OperationBody::Json(ref value)) => request.json(value),
            Some(OperationBody::Raw(ref bytes)) => request.body(bytes.clone()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let content_encoding = response
            .headers()
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.bytes().await?;

        Ok(RawResponse {
            status,
            url,
            content_encoding,
            body,
        })
    }
}

/// A browser User-Agent drawn uniformly from the rotation list.
pub fn random_user_agent() -> &'static str {
    user_agent_from(&mut rand::thread_rng())
}

fn user_agent_from<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
}
