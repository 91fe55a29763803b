//! Vantage: threat-intelligence indicator reports.
//!
//! The host wires the [`vantage_fetch`] orchestration layer to a lookup API:
//!
//! - [`config`]: TOML configuration with session and report tables
//! - [`presets`]: entity classification and canned report plans
//! - [`reporter`]: runs plans for a list of entities on a shared scheduler
//! - [`logging`]: stderr tracing setup
//!
//! ```no_run
//! use vantage::{AppConfig, Reporter};
//!
//! let reporter = Reporter::start(AppConfig::default())?;
//! let (kind, report) = reporter.report("example.com")?;
//! println!("{kind}: {}", report.len());
//! reporter.shutdown();
//! # Ok::<(), vantage::AppError>(())
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod presets;
pub mod reporter;

pub use config::{AppConfig, ReportSettings};
pub use error::{AppError, Result};
pub use presets::{indicator_plan, plan_for, EntityKind};
pub use reporter::Reporter;
