//! Site-specific pagination boundary.

use crate::error::Result;
use crate::operation::Operation;

/// A paginated search endpoint.
///
/// The aggregator owns all I/O, concurrency and merging; implementors only
/// describe requests and interpret bodies. Every method is synchronous and
/// must not block.
///
/// The exchange sequence for one query is:
///
/// 1. [`bootstrap`](Self::bootstrap) is fetched and handed to
///    [`tokens`](Self::tokens), which extracts whatever the pages need
///    (session tokens, preload parameters).
/// 2. [`page`](Self::page) is built for every offset and fetched
///    concurrently; each body goes through [`parse_page`](Self::parse_page).
/// 3. Entries are deduplicated by [`canonical_key`](Self::canonical_key).
pub trait PagedSource: Send + Sync + 'static {
    /// Values extracted from the bootstrap response.
    type Tokens: Send + Sync;
    /// One search result.
    type Entry: Clone + Send + Sync + 'static;

    /// Stable name, used in logs and cache keys.
    fn name(&self) -> &str;

    /// The call whose response yields the page tokens.
    fn bootstrap(&self, query: &str) -> Operation;

    /// Extract tokens from the bootstrap body.
    ///
    /// # Errors
    ///
    /// Typically [`FetchError::Parse`](crate::FetchError::Parse) when the
    /// expected tokens are absent.
    fn tokens(&self, query: &str, body: &[u8]) -> Result<Self::Tokens>;

    /// The call for the page starting at `offset`.
    fn page(&self, query: &str, tokens: &Self::Tokens, offset: usize) -> Operation;

    /// Parse one page body into entries, in page order.
    ///
    /// # Errors
    ///
    /// Typically [`FetchError::Parse`](crate::FetchError::Parse).
    fn parse_page(&self, body: &[u8]) -> Result<Vec<Self::Entry>>;

    /// Identity used for deduplication; see
    /// [`canonical_url`](super::canonical::canonical_url) for URL-keyed entries.
    fn canonical_key(&self, entry: &Self::Entry) -> String;
}
