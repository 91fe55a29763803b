//! Indicator report runner.
//!
//! A [`Reporter`] owns one [`Bridge`] and a report cache shared across
//! entities. Each entity gets a fresh [`Session`], so one entity's failed
//! lookup never short-circuits the next entity.

use std::io::Write;

use vantage_fetch::{Bridge, FanOutAggregator, Report, ResultCache, Session};

use crate::config::AppConfig;
use crate::error::{AppError, Result};
use crate::presets::{plan_for, EntityKind};

/// Runs indicator reports on a shared scheduler.
#[derive(Debug)]
pub struct Reporter {
    bridge: Bridge,
    config: AppConfig,
    cache: ResultCache<Report>,
}

impl Reporter {
    /// Validate `config` and start the scheduler.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the scheduler cannot start.
    pub fn start(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let bridge = Bridge::start()?;
        let cache = ResultCache::from_config(&config.fetch);
        Ok(Self {
            bridge,
            config,
            cache,
        })
    }

    /// Run the plan for `entity` and block until its report is collected.
    ///
    /// # Errors
    ///
    /// Sub-operation failures only leave keys out of the report; this fails
    /// for an empty entity, session construction or the bridge.
    pub fn report(&self, entity: &str) -> Result<(EntityKind, Report)> {
        let entity = entity.trim();
        if entity.is_empty() {
            return Err(AppError::Usage("entity must not be empty".into()));
        }
        let (kind, plan) = plan_for(entity, &self.config.report.api_base);
        let session = Session::new(self.bridge.clone(), self.config.session_config())?;
        let aggregator = FanOutAggregator::with_cache(session, self.cache.clone());

        let report = aggregator.report(entity, &plan)?;
        let missing = report.missing(&plan);
        if missing.is_empty() {
            tracing::info!(entity, %kind, sections = report.len(), "report complete");
        } else {
            tracing::warn!(entity, %kind, missing = ?missing, "report incomplete");
        }
        Ok((kind, report))
    }

    /// Report every entity in order, writing one JSON document per line to `out`.
    ///
    /// Returns the number of complete reports.
    ///
    /// # Errors
    ///
    /// Stops at the first entity that cannot be reported or the first write failure.
    pub fn write_reports<W: Write>(&self, entities: &[String], out: &mut W) -> Result<usize> {
        let mut complete = 0;
        for entity in entities {
            let (kind, report) = self.report(entity)?;
            let (_, plan) = plan_for(entity, &self.config.report.api_base);
            if report.is_complete(&plan) {
                complete += 1;
            }
            let line = serde_json::json!({ "kind": kind.name(), "report": report });
            writeln!(out, "{line}")?;
        }
        out.flush()?;
        Ok(complete)
    }

    /// Stop the scheduler and wait for it to exit.
    pub fn shutdown(&self) {
        self.bridge.shutdown();
    }
}
