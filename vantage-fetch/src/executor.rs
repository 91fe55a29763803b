//! Single-exchange executor: resolve, send, classify, decode.
//!
//! The executor performs exactly one attempt. Retry and the session latch
//! live one layer up in [`Session::fetch`](crate::Session::fetch).

use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use flate2::read::{GzDecoder, ZlibDecoder};

use crate::config::FetchConfig;
use crate::error::FetchError;
use crate::operation::Operation;
use crate::transport::{Transport, TransportFault};

/// Performs one exchange through a [`Transport`] and classifies the result.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    config: Arc<FetchConfig>,
}

impl Executor {
    /// Create an executor over `transport` using the overrides and identity
    /// headers from `config`.
    pub fn new(transport: Arc<dyn Transport>, config: Arc<FetchConfig>) -> Self {
        Self { transport, config }
    }

    /// Apply endpoint overrides and merge identity headers into `operation`.
    ///
    /// Per-call headers win over session identity headers.
    pub fn prepare(&self, operation: &Operation) -> Operation {
        let mut prepared = operation.clone();
        prepared.url = self.config.resolve_target(&operation.url);
        for (name, value) in &self.config.headers {
            if operation.header(name).is_none() {
                prepared.headers.push((name.clone(), value.clone()));
            }
        }
        prepared
    }

    /// Perform one exchange and return the decoded body on success.
    ///
    /// # Errors
    ///
    /// Any non-success status or transport fault, classified per
    /// [`classify_status`] and [`classify_fault`].
    pub async fn exchange(&self, operation: &Operation) -> Result<Bytes, FetchError> {
        let prepared = self.prepare(operation);
        let started = Instant::now();

        let response = self
            .transport
            .send(&prepared)
            .await
            .map_err(|fault| classify_fault(&prepared.url, fault))?;

        tracing::debug!(
            url = %response.url,
            status = response.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            bytes = response.body.len(),
            "exchange complete"
        );

        classify_status(&prepared.url, response.status)?;
        decode_body(
            &prepared.url,
            response.content_encoding.as_deref(),
            response.body,
        )
    }
}

/// Map an HTTP status to success or a classified failure.
///
/// | status | outcome |
/// |---|---|
/// | 200, 302 | success |
/// | 202, 301, 403, 429 | [`FetchError::RateLimited`] |
/// | 404 | [`FetchError::NotFound`] |
/// | anything else | [`FetchError::Generic`] |
pub fn classify_status(target: &str, status: u16) -> Result<(), FetchError> {
    match status {
        200 | 302 => Ok(()),
        202 | 301 | 403 | 429 => Err(FetchError::RateLimited {
            target: target.to_string(),
            status,
        }),
        404 => Err(FetchError::NotFound {
            target: target.to_string(),
        }),
        other => Err(FetchError::Generic {
            target: target.to_string(),
            detail: format!("unexpected HTTP status {other}"),
        }),
    }
}

/// Classify a transport fault as a timeout or a generic failure.
pub fn classify_fault(target: &str, fault: TransportFault) -> FetchError {
    let lowered = fault.message.to_lowercase();
    if fault.timed_out || lowered.contains("timed out") || lowered.contains("timeout") {
        FetchError::Timeout {
            target: target.to_string(),
            detail: fault.message,
        }
    } else {
        FetchError::Generic {
            target: target.to_string(),
            detail: fault.message,
        }
    }
}

/// Inflate `body` if the response declared a compressed encoding.
///
/// `gzip` and `deflate` are inflated; any other encoding is passed through
/// untouched.
pub fn decode_body(
    target: &str,
    content_encoding: Option<&str>,
    body: Bytes,
) -> Result<Bytes, FetchError> {
    let Some(encoding) = content_encoding.map(str::trim) else {
        return Ok(body);
    };
    if body.is_empty() {
        return Ok(body);
    }

    let mut inflated = Vec::new();
    let result = if encoding.eq_ignore_ascii_case("gzip") || encoding.eq_ignore_ascii_case("x-gzip")
    {
        GzDecoder::new(body.as_ref()).read_to_end(&mut inflated)
    } else if encoding.eq_ignore_ascii_case("deflate") {
        ZlibDecoder::new(body.as_ref()).read_to_end(&mut inflated)
    } else {
        if !encoding.eq_ignore_ascii_case("identity") {
            tracing::trace!(encoding, "passing through unsupported content encoding");
        }
        return Ok(body);
    };

    result.map_err(|e| FetchError::Generic {
        target: target.to_string(),
        detail: format!("failed to inflate {encoding} body: {e}"),
    })?;
    Ok(Bytes::from(inflated))
}
