//! Logical client session.
//!
//! A [`Session`] bundles one transport (connection pool and cookie store),
//! one [`Latch`], the retry policy and the configuration it was built from.
//! Every call made through it goes latch → retry → executor, and the first
//! call that fails after retry trips the latch for the whole session.

use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::bridge::Bridge;
use crate::config::FetchConfig;
use crate::error::{FetchError, Result};
use crate::executor::Executor;
use crate::latch::Latch;
use crate::operation::Operation;
use crate::retry::RetryPolicy;
use crate::transport::{HttpTransport, Transport};

/// Cheaply cloneable handle to one logical client.
///
/// Clones share the same latch and transport; create a new session for an
/// unrelated logical client.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    bridge: Bridge,
    executor: Executor,
    retry: RetryPolicy,
    latch: Latch,
    config: Arc<FetchConfig>,
}

impl Session {
    /// Build a session with an [`HttpTransport`] configured from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] if `config` is invalid or the HTTP
    /// client cannot be built.
    pub fn new(bridge: Bridge, config: FetchConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(bridge, config, Arc::new(transport))
    }

    /// Build a session over a caller-supplied transport.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Config`] if `config` is invalid.
    pub fn with_transport(
        bridge: Bridge,
        config: FetchConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        config.validate()?;
        let config = Arc::new(config);
        Ok(Self {
            inner: Arc::new(SessionInner {
                bridge,
                executor: Executor::new(transport, Arc::clone(&config)),
                retry: config.retry_policy(),
                latch: Latch::new(),
                config,
            }),
        })
    }

    /// The configuration this session was built from.
    pub fn config(&self) -> &FetchConfig {
        &self.inner.config
    }

    /// The scheduler this session submits blocking calls to.
    pub fn bridge(&self) -> &Bridge {
        &self.inner.bridge
    }

    /// The session's failure latch.
    pub fn latch(&self) -> &Latch {
        &self.inner.latch
    }

    /// Whether any call on this session has failed.
    pub fn has_failed(&self) -> bool {
        self.inner.latch.is_set()
    }

    /// Perform `operation` with latch check and retry, returning the decoded body.
    ///
    /// The latch is consulted before every attempt, so a session that fails
    /// while this call is backing off stops retrying.
    ///
    /// # Errors
    ///
    /// [`FetchError::PriorFailure`] without any I/O if the session already
    /// failed, otherwise the last classified failure once retry gives up.
    pub async fn fetch(&self, operation: &Operation) -> Result<Bytes> {
        let inner = &self.inner;
        let target = operation.url.as_str();

        let result = inner
            .retry
            .run(target, |_| async move {
                inner.latch.check(target)?;
                inner.executor.exchange(operation).await
            })
            .await;

        if let Err(ref err) = result {
            if inner.latch.set() {
                tracing::warn!(target_url = target, kind = %err.kind(), error = %err, "session failed");
            }
        }
        result
    }

    /// Perform `operation` and deserialise the body as JSON.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch), plus [`FetchError::Parse`] if the
    /// body is not valid JSON for `T`. A parse failure does not trip the latch.
    pub async fn fetch_json<T: DeserializeOwned>(&self, operation: &Operation) -> Result<T> {
        let body = self.fetch(operation).await?;
        serde_json::from_slice(&body)
            .map_err(|e| FetchError::Parse(format!("{}: {e}", operation.url)))
    }

    /// Blocking form of [`fetch`](Self::fetch), run on the session's bridge.
    ///
    /// # Errors
    ///
    /// Same as [`fetch`](Self::fetch), plus [`FetchError::Bridge`] if the
    /// unit could not be run.
    pub fn fetch_blocking(&self, operation: Operation) -> Result<Bytes> {
        let session = self.clone();
        self.inner
            .bridge
            .submit(async move { session.fetch(&operation).await })
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("failed", &self.has_failed())
            .field("retry", &self.inner.retry)
            .finish_non_exhaustive()
    }
}
