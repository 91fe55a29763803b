//! Request descriptors.
//!
//! An [`Operation`] is a plain, stateless description of one exchange:
//! method, target, query parameters, optional body and per-call headers.
//! It is built per call and handed to a [`Session`](crate::Session).

use bytes::Bytes;
use reqwest::Method;

/// Placeholder substituted by [`Operation::bind`].
pub const ENTITY_PLACEHOLDER: &str = "{id}";

/// Body carried by an [`Operation`].
#[derive(Debug, Clone, PartialEq)]
pub enum OperationBody {
    /// `application/x-www-form-urlencoded` pairs.
    Form(Vec<(String, String)>),
    /// JSON document.
    Json(serde_json::Value),
    /// Opaque bytes sent as-is.
    Raw(Bytes),
}

/// Descriptor of a single network exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// HTTP method.
    pub method: Method,
    /// Absolute target URL (before endpoint overrides).
    pub url: String,
    /// Query parameters appended to the URL.
    pub query: Vec<(String, String)>,
    /// Per-call headers; these win over the session's identity headers.
    pub headers: Vec<(String, String)>,
    /// Optional request body.
    pub body: Option<OperationBody>,
}

impl Operation {
    /// Create an operation with the given method and target.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Shorthand for a `GET` operation.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Shorthand for a `POST` operation.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Append a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Append several query parameters.
    pub fn with_params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.query
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Set a per-call header, replacing any earlier value with the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Attach a form body.
    pub fn with_form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Some(OperationBody::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ));
        self
    }

    /// Attach a JSON body.
    pub fn with_json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(OperationBody::Json(value));
        self
    }

    /// Attach a raw body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(OperationBody::Raw(body.into()));
        self
    }

    /// Look up a per-call header (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Substitute `{id}` with `entity`.
    ///
    /// The entity is percent-encoded where it lands in the URL; query values
    /// are substituted raw since they are encoded when the request is sent.
    pub fn bind(&self, entity: &str) -> Self {
        let encoded = urlencoding::encode(entity);
        let mut bound = self.clone();
        bound.url = self.url.replace(ENTITY_PLACEHOLDER, &encoded);
        for (_, value) in &mut bound.query {
            if value.contains(ENTITY_PLACEHOLDER) {
                *value = value.replace(ENTITY_PLACEHOLDER, entity);
            }
        }
        bound
    }
}
