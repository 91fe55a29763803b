//! Report plans: named sub-operations and their reductions.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use crate::error::Result;
use crate::operation::Operation;

use super::reduce::json_body;

/// Local reduction from the decoded bodies of a sub-operation's operations
/// (in declaration order) to the value stored in the report.
pub type Reduction = Arc<dyn Fn(Vec<Bytes>) -> Result<Value> + Send + Sync>;

/// One named unit of work inside a report.
///
/// Operation URLs and query values may contain `{id}`, which is bound to
/// the entity when the plan runs.
#[derive(Clone)]
pub struct SubOperation {
    name: String,
    operations: Vec<Operation>,
    reduce: Reduction,
}

impl SubOperation {
    /// A sub-operation running `operations` concurrently and reducing their
    /// bodies with `reduce`.
    pub fn new<R>(name: impl Into<String>, operations: Vec<Operation>, reduce: R) -> Self
    where
        R: Fn(Vec<Bytes>) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            operations,
            reduce: Arc::new(reduce),
        }
    }

    /// A single-operation sub-operation whose body is stored as parsed JSON.
    pub fn json(name: impl Into<String>, operation: Operation) -> Self {
        Self::new(name, vec![operation], json_body)
    }

    /// Report key for this sub-operation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Unbound operation templates.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Apply the reduction to fetched bodies.
    ///
    /// # Errors
    ///
    /// Whatever the reduction returns, typically [`FetchError::Parse`](crate::FetchError::Parse).
    pub fn reduce(&self, bodies: Vec<Bytes>) -> Result<Value> {
        (self.reduce)(bodies)
    }
}

impl std::fmt::Debug for SubOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubOperation")
            .field("name", &self.name)
            .field("operations", &self.operations.len())
            .finish_non_exhaustive()
    }
}

/// A named set of sub-operations run together for one entity.
#[derive(Debug, Clone, Default)]
pub struct ReportPlan {
    name: String,
    subs: Vec<SubOperation>,
}

impl ReportPlan {
    /// An empty plan. The name scopes cached reports.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subs: Vec::new(),
        }
    }

    /// Add a sub-operation, replacing any earlier one with the same name.
    pub fn with(mut self, sub: SubOperation) -> Self {
        match self.subs.iter_mut().find(|s| s.name == sub.name) {
            Some(existing) => *existing = sub,
            None => self.subs.push(sub),
        }
        self
    }

    /// Plan name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sub-operations in declaration order.
    pub fn subs(&self) -> &[SubOperation] {
        &self.subs
    }

    /// Configured report keys in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.subs.iter().map(SubOperation::name)
    }

    pub fn len(&self) -> usize {
        self.subs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subs.is_empty()
    }
}
