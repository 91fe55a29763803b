//! # vantage-fetch
//!
//! Concurrent request orchestration for unreliable, rate-limited HTTP
//! endpoints, behind a plain blocking API.
//!
//! ## Design
//!
//! - One [`Bridge`] thread runs a shared scheduler; blocking callers submit
//!   async units to it and wait for the result
//! - Every exchange is classified into a [`FailureKind`]; timeouts, rate
//!   limiting and generic failures are retried with exponential backoff
//! - A [`Session`] fails fast: once one of its calls fails, later calls
//!   return [`FetchError::PriorFailure`] without touching the network
//! - [`FanOutAggregator`] runs named sub-operations concurrently and keeps
//!   whatever succeeded
//! - [`OrderedMergeAggregator`] fetches pages concurrently and merges them
//!   in page order with deduplication
//!
//! ## Example
//!
//! ```no_run
//! use vantage_fetch::{Bridge, FanOutAggregator, FetchConfig, Operation, ReportPlan, Session, SubOperation};
//!
//! # fn main() -> vantage_fetch::Result<()> {
//! let bridge = Bridge::start()?;
//! let session = Session::new(bridge.clone(), FetchConfig::default())?;
//! let plan = ReportPlan::new("lookup")
//!     .with(SubOperation::json("item", Operation::get("https://api.example.com/items/{id}")));
//!
//! let report = FanOutAggregator::new(session).report("42", &plan)?;
//! println!("{} of {} sections", report.len(), plan.len());
//! bridge.shutdown();
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod cache;
pub mod config;
pub mod error;
pub mod executor;
pub mod fanout;
pub mod latch;
pub mod operation;
pub mod ordered;
pub mod retry;
pub mod session;
pub mod transport;

pub use bridge::Bridge;
pub use cache::{CacheKey, ResultCache};
pub use config::FetchConfig;
pub use error::{FailureKind, FetchError, Result};
pub use fanout::{FanOutAggregator, Report, ReportPlan, SubOperation};
pub use latch::Latch;
pub use operation::{Operation, OperationBody};
pub use ordered::{OrderedMergeAggregator, PagedSource};
pub use retry::RetryPolicy;
pub use session::Session;
pub use transport::{HttpTransport, RawResponse, Transport, TransportFault};
