//! Band-indexed slot sequence and the ordered merge over it.
//!
//! Page *i* owns the slot range `[i × band_width, (i + 1) × band_width)`.
//! Bands never overlap, so the final order depends only on page index and
//! position within the page, never on which page finished first.
//! [`merge_pages`] widens every band to the longest page, so no entry is
//! ever dropped for lack of room.

use std::collections::HashSet;

/// Minimum slots reserved per page.
pub const BAND_WIDTH: usize = 100;

/// Fixed-capacity ordered array of optional entries, partitioned into bands.
#[derive(Debug, Clone)]
pub struct SlotSequence<T> {
    band_width: usize,
    slots: Vec<Option<T>>,
}

impl<T> SlotSequence<T> {
    /// A sequence with `pages` empty bands of `band_width` slots each.
    pub fn new(pages: usize, band_width: usize) -> Self {
        let band_width = band_width.max(1);
        let mut slots = Vec::new();
        slots.resize_with(pages.saturating_mul(band_width), || None);
        Self { band_width, slots }
    }

    pub fn band_width(&self) -> usize {
        self.band_width
    }

    /// Total slots across all bands.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of filled slots.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Disjoint mutable bands, one per page, in page order.
    pub fn bands_mut(&mut self) -> std::slice::ChunksMut<'_, Option<T>> {
        self.slots.chunks_mut(self.band_width)
    }

    /// Write `entries` into band `page_index` in order.
    ///
    /// Returns how many entries did not fit in the band and were dropped.
    /// A page index past the last band drops everything.
    pub fn fill_band(&mut self, page_index: usize, entries: Vec<T>) -> usize {
        match self.bands_mut().nth(page_index) {
            Some(band) => fill(band, entries),
            None => entries.len(),
        }
    }

    /// Filled slots in band order, gaps removed.
    pub fn compact(self) -> impl Iterator<Item = T> {
        self.slots.into_iter().flatten()
    }
}

/// Fill `band` from the front; returns the overflow count.
fn fill<T>(band: &mut [Option<T>], entries: Vec<T>) -> usize {
    let total = entries.len();
    let mut written = 0;
    for (slot, entry) in band.iter_mut().zip(entries) {
        *slot = Some(entry);
        written += 1;
    }
    total - written
}

/// Page start offsets `0, stride, 2·stride, …` strictly below `desired`.
///
/// A zero stride yields a single page at offset 0.
pub fn page_offsets(desired: usize, stride: usize) -> Vec<usize> {
    if stride == 0 {
        return if desired > 0 { vec![0] } else { Vec::new() };
    }
    (0..desired).step_by(stride).collect()
}

/// Merge parsed pages into one ordered, deduplicated list.
///
/// `pages[i]` lands in band `i`. Bands are `min_band_width` slots wide, or
/// as wide as the longest page if that is larger. Slots are then walked in
/// band order and an entry whose key was already seen is dropped, so the
/// earliest occurrence by (page, position) wins. The result holds at most
/// `desired` entries.
pub fn merge_pages<T, K>(
    pages: Vec<Vec<T>>,
    min_band_width: usize,
    desired: usize,
    key: K,
) -> Vec<T>
where
    K: Fn(&T) -> String,
{
    let longest = pages.iter().map(Vec::len).max().unwrap_or(0);
    let band_width = min_band_width.max(longest);
    if band_width > min_band_width {
        tracing::debug!(min_band_width, band_width, "bands widened to fit the longest page");
    }

    let mut slots = SlotSequence::new(pages.len(), band_width);
    for (band, entries) in slots.bands_mut().zip(pages) {
        fill(band, entries);
    }

    let mut seen = HashSet::new();
    let mut duplicates = 0usize;
    let mut merged = Vec::new();
    for entry in slots.compact() {
        if merged.len() == desired {
            break;
        }
        if seen.insert(key(&entry)) {
            merged.push(entry);
        } else {
            duplicates += 1;
        }
    }
    tracing::trace!(kept = merged.len(), duplicates, "pages merged");
    merged
}
