//! Probe orchestration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use log::debug;
use tokio::time::Instant;

use crate::config::MonitorConfig;
use crate::domain::Domain;
use crate::events::{EventSink, LogSink, ProbeEvent};
use crate::fetch::{CertFetcher, Fetch};
use crate::outcome::{ProbeFailure, ProbeOutcome};
use crate::report::{aggregate, CheckResult};
use crate::retry::RetryPolicy;

const NOT_ATTEMPTED: &str = "not attempted: run deadline exceeded";

/// Drives retried certificate probes over a domain list and folds the
/// outcomes into one [`CheckResult`].
///
/// Per-domain failures are isolated: a domain that cannot be checked becomes
/// a recorded failure and the run continues unconditionally.
pub struct Monitor<F = CertFetcher> {
    fetcher: Arc<F>,
    retry: RetryPolicy,
    concurrency: usize,
    deadline: Option<Duration>,
    events: Arc<dyn EventSink>,
}

impl<F> fmt::Debug for Monitor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("retry", &self.retry)
            .field("concurrency", &self.concurrency)
            .field("deadline", &self.deadline)
            .finish()
    }
}

impl Monitor<CertFetcher> {
    /// Creates a monitor probing the network per `config`.
    pub fn new(config: &MonitorConfig) -> Self {
        Monitor::with_fetcher(CertFetcher::new(config.port, config.timeout), config)
    }
}

impl<F> Monitor<F>
where
    F: Fetch + Send + Sync + 'static,
{
    /// Creates a monitor driving `fetcher` per `config`.
    pub fn with_fetcher(fetcher: F, config: &MonitorConfig) -> Self {
        Monitor {
            fetcher: Arc::new(fetcher),
            retry: RetryPolicy::new(config.max_attempts, config.base_delay),
            concurrency: config.concurrency.max(1),
            deadline: config.deadline,
            events: Arc::new(LogSink),
        }
    }

    /// Replaces the event sink.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Probes every domain and aggregates the outcomes.
    ///
    /// Domains are probed with bounded parallelism; outcomes keep the input
    /// order. An empty list yields an all-zero result, which is a valid run.
    pub async fn run(&self, domains: &[Domain]) -> CheckResult {
        let checked_at = Utc::now();
        let started = Instant::now();
        let deadline = self.deadline.map(|limit| started + limit);
        self.events.emit(&ProbeEvent::RunStarted {
            domains: domains.len(),
        });

        let outcomes: Vec<ProbeOutcome> = stream::iter(domains.iter().cloned())
            .map(|domain| self.probe(domain, deadline))
            .buffered(self.concurrency)
            .collect()
            .await;

        let result = aggregate(checked_at, outcomes, started.elapsed());
        self.events.emit(&ProbeEvent::RunCompleted {
            total: result.total_domains,
            succeeded: result.successful_checks,
            failed: result.failed_checks,
        });
        result
    }

    async fn probe(&self, domain: Domain, deadline: Option<Instant>) -> ProbeOutcome {
        if deadline.map_or(false, |at| Instant::now() >= at) {
            return self.fail(domain, NOT_ATTEMPTED.to_string());
        }

        debug!("probing {domain}");
        let fetched = self
            .retry
            .run(|_attempt| {
                let fetcher = self.fetcher.clone();
                let domain = domain.clone();
                async move {
                    tokio::task::spawn_blocking(move || fetcher.fetch(&domain))
                        .await
                        .expect("probe task panicked")
                }
            })
            .await;

        match fetched {
            Ok(info) => {
                self.events.emit(&ProbeEvent::DomainChecked {
                    domain: info.domain.to_string(),
                    days_until_expiry: info.days_until_expiry,
                    is_valid: info.is_valid,
                });
                ProbeOutcome::Checked(info)
            }
            Err(error) => self.fail(domain, error.to_string()),
        }
    }

    fn fail(&self, domain: Domain, error: String) -> ProbeOutcome {
        self.events.emit(&ProbeEvent::DomainFailed {
            domain: domain.to_string(),
            error: error.clone(),
        });
        ProbeOutcome::Failed(ProbeFailure { domain, error })
    }
}
