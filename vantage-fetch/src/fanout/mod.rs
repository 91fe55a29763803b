//! Fan-out report aggregator.
//!
//! Runs every sub-operation of a [`ReportPlan`] concurrently for one entity
//! and merges the outcomes into a [`Report`]. A failing sub-operation is
//! logged and its key left out; the aggregate never fails because of one.

pub mod plan;
pub mod reduce;
pub mod report;

pub use plan::{ReportPlan, SubOperation};
pub use report::Report;

use serde_json::Value;

use crate::cache::{CacheKey, ResultCache};
use crate::error::Result;
use crate::operation::Operation;
use crate::session::Session;

/// Runs report plans through one [`Session`].
#[derive(Debug, Clone)]
pub struct FanOutAggregator {
    session: Session,
    cache: ResultCache<Report>,
}

impl FanOutAggregator {
    /// An aggregator caching complete reports for `cache_ttl_seconds`.
    pub fn new(session: Session) -> Self {
        let cache = ResultCache::from_config(session.config());
        Self { session, cache }
    }

    /// An aggregator with an explicit cache (use [`ResultCache::disabled`] to opt out).
    pub fn with_cache(session: Session, cache: ResultCache<Report>) -> Self {
        Self { session, cache }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run `plan` for `entity` and collect whatever succeeded.
    ///
    /// A cached report for (plan, entity) is returned without I/O. A freshly
    /// fetched report is cached only if no sub-operation failed.
    pub async fn collect(&self, entity: &str, plan: &ReportPlan) -> Report {
        let key = CacheKey::new(plan.name(), entity, "");
        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!(plan = plan.name(), entity, "report cache hit");
            return hit;
        }

        let futures: Vec<_> = plan
            .subs()
            .iter()
            .map(|sub| async move { (sub.name(), self.run_sub(entity, sub).await) })
            .collect();
        let outcomes = futures::future::join_all(futures).await;

        let mut report = Report::new(entity, plan.name());
        for (name, outcome) in outcomes {
            match outcome {
                Ok(value) => {
                    report.sections.insert(name.to_string(), value);
                }
                Err(err) => {
                    tracing::warn!(
                        plan = plan.name(),
                        sub_operation = name,
                        entity,
                        kind = %err.kind(),
                        error = %err,
                        "sub-operation failed"
                    );
                }
            }
        }

        tracing::debug!(
            plan = plan.name(),
            entity,
            present = report.len(),
            configured = plan.len(),
            "report collected"
        );

        if report.is_complete(plan) {
            self.cache.insert(key, report.clone()).await;
        }
        report
    }

    /// Blocking form of [`collect`](Self::collect), run on the session's bridge.
    ///
    /// # Errors
    ///
    /// Only [`FetchError::Bridge`](crate::FetchError::Bridge), when the unit
    /// could not be submitted or did not complete.
    pub fn report(&self, entity: &str, plan: &ReportPlan) -> Result<Report> {
        let aggregator = self.clone();
        let entity = entity.to_string();
        let plan = plan.clone();
        self.session
            .bridge()
            .submit(async move { Ok(aggregator.collect(&entity, &plan).await) })
    }

    /// Bind, fetch concurrently, then reduce one sub-operation.
    async fn run_sub(&self, entity: &str, sub: &SubOperation) -> Result<Value> {
        let bound: Vec<Operation> = sub.operations().iter().map(|op| op.bind(entity)).collect();
        let bodies =
            futures::future::try_join_all(bound.iter().map(|op| self.session.fetch(op))).await?;
        sub.reduce(bodies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::Bridge;
    use crate::config::FetchConfig;
    use crate::error::{FailureKind, FetchError};
    use crate::transport::{RawResponse, Transport, TransportFault};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    /// Serves JSON for every path except those containing "broken", which 404.
    struct StubTransport {
        sends: AtomicU32,
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn send(&self, operation: &Operation) -> std::result::Result<RawResponse, TransportFault> {
            self.sends.fetch_add(1, Ordering::SeqCst);
            // Answer on a later poll, like a real exchange would.
            tokio::task::yield_now().await;
            let status = if operation.url.contains("broken") { 404 } else { 200 };
            let body = format!("{{\"url\":\"{}\"}}", operation.url);
            Ok(RawResponse {
                status,
                url: operation.url.clone(),
                content_encoding: None,
                body: Bytes::from(body),
            })
        }
    }

    fn aggregator(bridge: &Bridge) -> (FanOutAggregator, Arc<StubTransport>) {
        let transport = Arc::new(StubTransport {
            sends: AtomicU32::new(0),
        });
        let session = Session::with_transport(
            bridge.clone(),
            FetchConfig::default(),
            Arc::clone(&transport) as Arc<dyn Transport>,
        )
        .expect("session");
        (FanOutAggregator::new(session), transport)
    }

    fn plan_with_failures() -> ReportPlan {
        ReportPlan::new("domain")
            .with(SubOperation::json("a", Operation::get("https://api.test/{id}/a")))
            .with(SubOperation::json("b", Operation::get("https://api.test/{id}/broken-b")))
            .with(SubOperation::json("c", Operation::get("https://api.test/{id}/c")))
            .with(SubOperation::json("d", Operation::get("https://api.test/{id}/broken-d")))
            .with(SubOperation::json("e", Operation::get("https://api.test/{id}/e")))
    }

    #[tokio::test]
    async fn failed_sub_operations_are_omitted() {
        let bridge = Bridge::start().expect("bridge");
        let (aggregator, _) = aggregator(&bridge);

        let report = aggregator.collect("example.com", &plan_with_failures()).await;
        let mut keys: Vec<&str> = report.sections.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["a", "c", "e"]);
        assert_eq!(report.missing(&plan_with_failures()), vec!["b", "d"]);
        assert_eq!(report.id, "example.com");
        assert_eq!(report.get("a").and_then(|v| v["url"].as_str()), Some("https://api.test/example.com/a"));
        bridge.shutdown();
    }

    #[tokio::test]
    async fn complete_report_is_served_from_cache() {
        let bridge = Bridge::start().expect("bridge");
        let (aggregator, transport) = aggregator(&bridge);
        let plan = ReportPlan::new("ip")
            .with(SubOperation::json("analyse", Operation::get("https://api.test/ip/{id}")));

        let first = aggregator.collect("1.2.3.4", &plan).await;
        let second = aggregator.collect("1.2.3.4", &plan).await;
        assert_eq!(first, second);
        assert_eq!(transport.sends.load(Ordering::SeqCst), 1);
        bridge.shutdown();
    }

    #[tokio::test]
    async fn multi_operation_sub_fails_as_a_unit() {
        let bridge = Bridge::start().expect("bridge");
        let (aggregator, _) = aggregator(&bridge);
        let plan = ReportPlan::new("pair").with(SubOperation::new(
            "both",
            vec![
                Operation::get("https://api.test/{id}/ok"),
                Operation::get("https://api.test/{id}/broken"),
            ],
            reduce::json_body,
        ));

        let report = aggregator.collect("x", &plan).await;
        assert!(report.is_empty());
        bridge.shutdown();
    }

    /// Replays a per-URL status script, then answers 200; counts sends per URL.
    struct ScriptedTransport {
        scripts: std::sync::Mutex<std::collections::HashMap<String, Vec<u16>>>,
        sends: std::sync::Mutex<std::collections::HashMap<String, u32>>,
    }

    impl ScriptedTransport {
        fn new(scripts: Vec<(&str, Vec<u16>)>) -> Arc<Self> {
            Arc::new(Self {
                scripts: std::sync::Mutex::new(
                    scripts
                        .into_iter()
                        .map(|(url, mut statuses)| {
                            statuses.reverse();
                            (url.to_string(), statuses)
                        })
                        .collect(),
                ),
                sends: std::sync::Mutex::new(std::collections::HashMap::new()),
            })
        }

        fn sends_to(&self, url: &str) -> u32 {
            self.sends.lock().expect("sends").get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&self, operation: &Operation) -> std::result::Result<RawResponse, TransportFault> {
            *self
                .sends
                .lock()
                .expect("sends")
                .entry(operation.url.clone())
                .or_default() += 1;
            let status = self
                .scripts
                .lock()
                .expect("scripts")
                .get_mut(&operation.url)
                .and_then(Vec::pop)
                .unwrap_or(200);
            tokio::task::yield_now().await;
            Ok(RawResponse {
                status,
                url: operation.url.clone(),
                content_encoding: None,
                body: Bytes::from_static(b"{}"),
            })
        }
    }

    const GONE: &str = "https://api.test/x/gone";
    const THROTTLED: &str = "https://api.test/x/throttled";

    fn scripted_session(bridge: &Bridge) -> (Session, Arc<ScriptedTransport>) {
        let transport = ScriptedTransport::new(vec![(GONE, vec![404]), (THROTTLED, vec![429, 200])]);
        let session = Session::with_transport(
            bridge.clone(),
            FetchConfig::default(),
            Arc::clone(&transport) as Arc<dyn Transport>,
        )
        .expect("session");
        (session, transport)
    }

    #[tokio::test(start_paused = true)]
    async fn sibling_failure_stops_a_backing_off_call() {
        let bridge = Bridge::start().expect("bridge");
        let (session, transport) = scripted_session(&bridge);

        let gone = Operation::get(GONE);
        let throttled = Operation::get(THROTTLED);
        let (first, second) = tokio::join!(session.fetch(&gone), session.fetch(&throttled));

        assert_eq!(first.unwrap_err().kind(), FailureKind::NotFound);
        assert!(matches!(second, Err(FetchError::PriorFailure { .. })));
        assert_eq!(transport.sends_to(THROTTLED), 1);
        bridge.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn sibling_failure_omits_the_retrying_sub_operation() {
        let bridge = Bridge::start().expect("bridge");
        let (session, transport) = scripted_session(&bridge);
        let aggregator = FanOutAggregator::new(session);
        let plan = ReportPlan::new("pair")
            .with(SubOperation::json("gone", Operation::get("https://api.test/{id}/gone")))
            .with(SubOperation::json(
                "throttled",
                Operation::get("https://api.test/{id}/throttled"),
            ));

        let report = aggregator.collect("x", &plan).await;
        assert!(report.is_empty());
        assert_eq!(report.missing(&plan), vec!["gone", "throttled"]);
        assert_eq!(transport.sends_to(THROTTLED), 1);
        assert!(aggregator.session().has_failed());
        bridge.shutdown();
    }

    #[test]
    fn blocking_report_via_bridge() {
        let bridge = Bridge::start().expect("bridge");
        let (aggregator, _) = aggregator(&bridge);

        let report = aggregator
            .report("example.com", &plan_with_failures())
            .expect("report");
        assert_eq!(report.len(), 3);
        bridge.shutdown();
    }
}
