//! Composite report produced by one fan-out call.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::plan::ReportPlan;

/// Mapping from sub-operation name to its reduced result.
///
/// An absent key means that sub-operation failed; the failure itself was
/// logged, not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Entity the plan ran for.
    pub id: String,
    /// Name of the plan that produced this report.
    pub plan: String,
    /// Successful sub-operation results, keyed by name. Kept in their own
    /// object so a sub-operation may be called `id` or `plan`.
    pub sections: BTreeMap<String, Value>,
}

impl Report {
    /// An empty report for `id` under `plan`.
    pub fn new(id: impl Into<String>, plan: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            plan: plan.into(),
            sections: BTreeMap::new(),
        }
    }

    /// Result of the named sub-operation, if it succeeded.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.sections.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sections.contains_key(name)
    }

    /// Number of successful sub-operations.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Names configured in `plan` that have no result here.
    pub fn missing<'a>(&self, plan: &'a ReportPlan) -> Vec<&'a str> {
        plan.names().filter(|name| !self.contains(name)).collect()
    }

    /// Whether every sub-operation in `plan` produced a result.
    pub fn is_complete(&self, plan: &ReportPlan) -> bool {
        plan.names().all(|name| self.contains(name))
    }
}
