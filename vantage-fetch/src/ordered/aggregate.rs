//! Bootstrap, concurrent pages, ordered merge.

use std::sync::Arc;

use crate::cache::{CacheKey, ResultCache};
use crate::error::{FetchError, Result};
use crate::session::Session;

use super::slots::{merge_pages, page_offsets, BAND_WIDTH};
use super::source::PagedSource;

/// Runs paginated searches against one [`PagedSource`] through one [`Session`].
pub struct OrderedMergeAggregator<S: PagedSource> {
    source: Arc<S>,
    session: Session,
    cache: ResultCache<Vec<S::Entry>>,
}

impl<S: PagedSource> Clone for OrderedMergeAggregator<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            session: self.session.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<S: PagedSource> OrderedMergeAggregator<S> {
    /// An aggregator caching results for `cache_ttl_seconds`.
    pub fn new(source: S, session: Session) -> Self {
        let cache = ResultCache::from_config(session.config());
        Self::with_cache(source, session, cache)
    }

    /// An aggregator with an explicit cache.
    pub fn with_cache(source: S, session: Session, cache: ResultCache<Vec<S::Entry>>) -> Self {
        Self {
            source: Arc::new(source),
            session,
            cache,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Search for `query`, returning at most `desired` entries.
    ///
    /// `desired` is capped at the session's `max_results_cap`. Pages start at
    /// offsets `0, stride, 2·stride, …` below the capped count.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Config`] for an empty query or a zero stride
    /// - The bootstrap failure, unchanged; no page is requested
    /// - The failure of the lowest-indexed failing page; every page still
    ///   runs to completion first
    pub async fn collect(&self, query: &str, desired: usize, stride: usize) -> Result<Vec<S::Entry>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FetchError::Config("query must not be empty".into()));
        }
        if stride == 0 {
            return Err(FetchError::Config("page stride must be greater than 0".into()));
        }
        let desired = desired.min(self.session.config().max_results_cap);
        if desired == 0 {
            return Ok(Vec::new());
        }

        let source = self.source.as_ref();
        let key = CacheKey::new(source.name(), query, desired);
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(source = source.name(), desired, "search cache hit");
            return Ok(hit);
        }

        let bootstrap = self.session.fetch(&source.bootstrap(query)).await?;
        let tokens = source.tokens(query, &bootstrap)?;

        let offsets = page_offsets(desired, stride);
        tracing::debug!(source = source.name(), pages = offsets.len(), desired, "fetching pages");

        let tokens = &tokens;
        let futures: Vec<_> = offsets
            .iter()
            .map(|&offset| async move {
                let body = self.session.fetch(&source.page(query, tokens, offset)).await?;
                source.parse_page(&body)
            })
            .collect();
        let outcomes = futures::future::join_all(futures).await;

        let mut pages = Vec::with_capacity(outcomes.len());
        for (page, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(entries) => {
                    tracing::trace!(source = source.name(), page, entries = entries.len(), "page parsed");
                    pages.push(entries);
                }
                Err(err) => {
                    tracing::warn!(source = source.name(), page, error = %err, "page failed");
                    return Err(err);
                }
            }
        }

        let merged = merge_pages(pages, BAND_WIDTH, desired, |entry| source.canonical_key(entry));
        tracing::debug!(source = source.name(), results = merged.len(), "search complete");

        self.cache.insert(key, merged.clone()).await;
        Ok(merged)
    }

    /// Blocking form of [`collect`](Self::collect), run on the session's bridge.
    ///
    /// # Errors
    ///
    /// Same as [`collect`](Self::collect), plus [`FetchError::Bridge`].
    pub fn search(&self, query: &str, desired: usize, stride: usize) -> Result<Vec<S::Entry>> {
        let aggregator = self.clone();
        let query = query.to_string();
        self.session
            .bridge()
            .submit(async move { aggregator.collect(&query, desired, stride).await })
    }
}

impl<S: PagedSource> std::fmt::Debug for OrderedMergeAggregator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderedMergeAggregator")
            .field("source", &self.source.name())
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
