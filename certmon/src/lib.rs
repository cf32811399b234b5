#![deny(
    missing_docs,
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unstable_features,
    unused_import_braces,
    unused_qualifications
)]

//! TLS certificate expiry monitor.
//!
//! Probes a configured list of domains, classifies how close each
//! certificate is to expiry, retries transient network failures with
//! exponential backoff, and folds the per-domain outcomes into one
//! fault-tolerant [`CheckResult`].
//!
//! ```no_run
//! use certmon::config::{parse_domain_list, MonitorConfig};
//! use certmon::{report, Monitor};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), certmon::ConfigError> {
//! let config = MonitorConfig {
//!     domains: parse_domain_list("example.com,example.org")?,
//!     ..MonitorConfig::default()
//! };
//! let monitor = Monitor::new(&config);
//! let result = monitor.run(&config.domains).await;
//! println!("{}", report::render(&result, false));
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod fetch;
pub mod monitor;
pub mod notify;
pub mod outcome;
pub mod report;
pub mod retry;

pub use crate::config::{ConfigError, MonitorConfig};
pub use crate::domain::Domain;
pub use crate::error::FetchError;
pub use crate::monitor::Monitor;
pub use crate::outcome::{CertificateInfo, ProbeOutcome};
pub use crate::report::{CheckResult, ReportSummary};
pub use crate::retry::RetryPolicy;
