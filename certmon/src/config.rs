//! Engine configuration.

use std::time::Duration;

use thiserror::Error;

use crate::domain::{Domain, DomainError};
use crate::fetch::{DEFAULT_PORT, DEFAULT_TIMEOUT};
use crate::retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};

/// Number of domains probed concurrently by default.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Configuration error, raised before any network activity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No domains were configured.
    #[error("no domains configured")]
    NoDomains,
    /// A configured domain failed validation even after cleaning.
    #[error("invalid domain {value:?}: {source}")]
    InvalidDomain {
        /// Raw value as configured.
        value: String,
        /// Why it was rejected.
        #[source]
        source: DomainError,
    },
}

/// Every knob the orchestrator needs, in one value object.
///
/// Built once at process start and passed by reference; the engine performs
/// no ambient configuration lookups of its own.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Domains to probe.
    pub domains: Vec<Domain>,
    /// TLS port probed on every domain.
    pub port: u16,
    /// Timeout per socket operation.
    pub timeout: Duration,
    /// Total fetch attempts per domain, including the first.
    pub max_attempts: u32,
    /// Backoff delay before the first retry.
    pub base_delay: Duration,
    /// Maximum concurrent probes.
    pub concurrency: usize,
    /// Soft deadline for a whole run; domains not started before it are
    /// reported as not attempted.
    pub deadline: Option<Duration>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            domains: Vec::new(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            concurrency: DEFAULT_CONCURRENCY,
            deadline: None,
        }
    }
}

/// Parses a comma-separated domain list into validated [`Domain`]s.
///
/// Entries are trimmed, stripped of scheme, path and port decorations and
/// deduplicated preserving first occurrence. An empty list or any entry
/// that stays invalid after cleaning fails the whole configuration.
///
/// ```
/// use certmon::config::parse_domain_list;
/// let domains = parse_domain_list("https://a.example/health, b.example:8443, a.example").unwrap();
/// assert_eq!(2, domains.len());
/// assert_eq!("a.example", domains[0].as_str());
/// ```
pub fn parse_domain_list(raw: &str) -> Result<Vec<Domain>, ConfigError> {
    let mut domains = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let domain =
            Domain::new(clean_host(entry)).map_err(|source| ConfigError::InvalidDomain {
                value: entry.to_string(),
                source,
            })?;
        if !domains.contains(&domain) {
            domains.push(domain);
        }
    }
    if domains.is_empty() {
        return Err(ConfigError::NoDomains);
    }
    Ok(domains)
}

/// Strips scheme, path and port decorations from a configured host.
fn clean_host(entry: &str) -> &str {
    let entry = entry
        .strip_prefix("https://")
        .or_else(|| entry.strip_prefix("http://"))
        .unwrap_or(entry);
    let entry = entry.split('/').next().unwrap_or(entry);
    entry.split(':').next().unwrap_or(entry)
}
