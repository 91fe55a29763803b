//! Ordered-merge paginated aggregator.
//!
//! One bootstrap call yields the tokens every page request needs; pages are
//! then fetched concurrently and merged into a single list whose order is
//! fixed by page index and position, deduplicated by canonical key and cut
//! to the requested size.

pub mod aggregate;
pub mod canonical;
pub mod slots;
pub mod source;

pub use aggregate::OrderedMergeAggregator;
pub use canonical::canonical_url;
pub use slots::{merge_pages, page_offsets, SlotSequence, BAND_WIDTH};
pub use source::PagedSource;
