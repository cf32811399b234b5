//! Structured run events for external observers.

use log::{error, info, warn};

use crate::outcome::EXPIRY_WARNING_DAYS;

/// Event emitted while a probe run progresses.
///
/// Events are plain data; where they end up (logs, metrics, nothing) is the
/// sink's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// A run over `domains` domains started.
    RunStarted {
        /// Number of domains to probe.
        domains: usize,
    },
    /// One domain's certificate was fetched and classified.
    DomainChecked {
        /// Probed host.
        domain: String,
        /// Whole days until expiry; negative once expired.
        days_until_expiry: i64,
        /// Whether the certificate passed validation.
        is_valid: bool,
    },
    /// One domain could not be checked.
    DomainFailed {
        /// Probed host.
        domain: String,
        /// Failure description.
        error: String,
    },
    /// The run finished.
    RunCompleted {
        /// Number of domains probed.
        total: usize,
        /// Domains whose certificate was fetched.
        succeeded: usize,
        /// Domains that could not be checked.
        failed: usize,
    },
}

/// Receives probe events as data.
pub trait EventSink: Send + Sync {
    /// Consumes one event.
    fn emit(&self, event: &ProbeEvent);
}

/// Sink that renders events through the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &ProbeEvent) {
        match event {
            ProbeEvent::RunStarted { domains } => {
                info!("checking certificates of {domains} domains");
            }
            ProbeEvent::DomainChecked {
                domain,
                days_until_expiry,
                is_valid,
            } => {
                if *is_valid && *days_until_expiry > EXPIRY_WARNING_DAYS {
                    info!("{domain}: expires in {days_until_expiry} days");
                } else {
                    warn!("{domain}: expires in {days_until_expiry} days, valid: {is_valid}");
                }
            }
            ProbeEvent::DomainFailed { domain, error } => {
                error!("{domain}: {error}");
            }
            ProbeEvent::RunCompleted {
                total,
                succeeded,
                failed,
            } => {
                info!("checked {total} domains: {succeeded} succeeded, {failed} failed");
            }
        }
    }
}
