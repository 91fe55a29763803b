//! Canonical URL keys for result deduplication.
//!
//! Two result links that differ only in case of scheme or host, default
//! port, trailing slash, fragment, tracking parameters or query order
//! map to the same key.

use url::Url;

/// Query parameters that never change the target page.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "utm_id",
    "fbclid",
    "gclid",
    "msclkid",
    "yclid",
    "ref",
];

/// Canonicalise `raw` for use as a dedup key.
///
/// Unparseable input is returned trimmed but otherwise unchanged, so it
/// still deduplicates against exact repeats.
///
/// ```
/// use vantage_fetch::ordered::canonical::canonical_url;
///
/// assert_eq!(
///     canonical_url("HTTPS://Example.COM:443/a/?b=2&utm_source=x&a=1#top"),
///     canonical_url("https://example.com/a?a=1&b=2"),
/// );
/// ```
pub fn canonical_url(raw: &str) -> String {
    let raw = raw.trim();
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_string();
    };

    url.set_fragment(None);
    if matches!(
        (url.scheme(), url.port()),
        ("http", Some(80)) | ("https", Some(443))
    ) {
        let _ = url.set_port(None);
    }

    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();
    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&params);
    }

    let trimmed = url.path().trim_end_matches('/').to_string();
    if !trimmed.is_empty() {
        url.set_path(&trimmed);
    }

    // Scheme and host are already lowercased by the parser.
    url.to_string()
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS
        .iter()
        .any(|param| param.eq_ignore_ascii_case(key))
}
