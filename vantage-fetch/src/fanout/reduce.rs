//! Reduction helpers for report sub-operations.
//!
//! Analysis documents carry one verdict per scanning engine under
//! `data.attributes.last_analysis_results`, either for a single object
//! (`data` is an object) or for a collection (`data` is an array). The
//! verdict filter keeps only engines that flagged the entity.

use bytes::Bytes;
use serde_json::Value;

use crate::error::{FetchError, Result};

/// Verdict categories kept by [`retain_flagged_verdicts`].
pub const FLAGGED_CATEGORIES: &[&str] = &["suspicious", "malicious"];

/// Parse the bodies as JSON.
///
/// A single body yields its document; several bodies yield an array of
/// documents in operation order.
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if any body is not valid JSON.
pub fn json_body(bodies: Vec<Bytes>) -> Result<Value> {
    let mut docs = bodies
        .iter()
        .map(|body| serde_json::from_slice::<Value>(body))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| FetchError::Parse(format!("invalid JSON body: {e}")))?;
    if docs.len() == 1 {
        return Ok(docs.remove(0));
    }
    Ok(Value::Array(docs))
}

/// [`json_body`] followed by [`retain_flagged_verdicts`].
///
/// # Errors
///
/// Same as [`json_body`].
pub fn flagged_verdicts(bodies: Vec<Bytes>) -> Result<Value> {
    let mut doc = json_body(bodies)?;
    retain_flagged_verdicts(&mut doc);
    Ok(doc)
}

/// Build a reduction that filters verdicts and nulls the listed bulky
/// attributes (e.g. `pe_info`) on every data item.
pub fn flagged_verdicts_without(
    fields: &'static [&'static str],
) -> impl Fn(Vec<Bytes>) -> Result<Value> + Send + Sync + 'static {
    move |bodies| {
        let mut doc = flagged_verdicts(bodies)?;
        blank_attributes(&mut doc, fields);
        Ok(doc)
    }
}

/// Drop every verdict whose `category` is not in [`FLAGGED_CATEGORIES`].
///
/// Documents without the expected shape are left untouched.
pub fn retain_flagged_verdicts(doc: &mut Value) {
    for item in data_items(doc) {
        if let Some(Value::Object(results)) = item.pointer_mut("/attributes/last_analysis_results")
        {
            results.retain(|_, verdict| {
                verdict
                    .get("category")
                    .and_then(Value::as_str)
                    .is_some_and(|c| FLAGGED_CATEGORIES.contains(&c))
            });
        }
    }
}

/// Set each named attribute to `null` on every data item that has it.
pub fn blank_attributes(doc: &mut Value, fields: &[&str]) {
    for item in data_items(doc) {
        if let Some(Value::Object(attributes)) = item.get_mut("attributes") {
            for field in fields {
                if let Some(value) = attributes.get_mut(*field) {
                    *value = Value::Null;
                }
            }
        }
    }
}

/// The data object, or each element of the data array.
fn data_items(doc: &mut Value) -> Vec<&mut Value> {
    match doc.get_mut("data") {
        Some(Value::Array(items)) => items.iter_mut().collect(),
        Some(item) if item.is_object() => vec![item],
        _ => Vec::new(),
    }
}
