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

use std::str::FromStr as _;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};
use cron::Schedule;
use log::{debug, error, info};

use certmon::config::{parse_domain_list, MonitorConfig};
use certmon::notify::Notify as _;
use certmon::report::{self, CheckResult};
use certmon::Monitor;

#[derive(Debug, Parser)]
#[command(author, about, version)]
struct Opts {
    /// ASCII icons only
    #[arg(long)]
    ascii: bool,
    /// Print the result as JSON instead of the rendered report
    #[arg(long)]
    json: bool,
    /// TLS port to probe
    #[arg(long, default_value = "443")]
    port: u16,
    /// Timeout per socket operation in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,
    /// Total fetch attempts per domain
    #[arg(long, default_value = "4")]
    attempts: u32,
    /// Backoff delay before the first retry, in seconds
    #[arg(long, default_value = "1")]
    backoff: u64,
    /// Maximum concurrent probes
    #[arg(long, default_value = "10")]
    concurrency: usize,
    /// Soft deadline for a whole run, in seconds
    #[arg(long)]
    deadline: Option<u64>,
    /// Webhook endpoint receiving the report
    #[arg(long, env = "WEBHOOK_URL")]
    webhook_url: Option<String>,
    /// Bearer token for the webhook endpoint
    #[arg(long, env = "WEBHOOK_TOKEN")]
    webhook_token: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check the configured domains immediately
    Check {
        /// Send the report to the configured webhook
        #[arg(long)]
        notify: bool,
        /// Comma-separated domains to check
        #[arg(env = "DOMAINS")]
        domains: Vec<String>,
    },
    /// Check the configured domains on a cron schedule
    Daemon {
        /// Cron expression
        #[arg(short, long, default_value = "0 0 0 * * *")]
        cron: String,
        /// Comma-separated domains to check
        #[arg(env = "DOMAINS")]
        domains: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let opts: Opts = Opts::parse();
    if let Some(Commands::Check { domains, notify }) = &opts.command {
        check_command(&opts, domains, *notify).await?;
    }
    if let Some(Commands::Daemon { cron, domains }) = &opts.command {
        daemon_command(&opts, cron, domains).await?;
    }
    Ok(())
}

fn build_config(opts: &Opts, domains: &[String]) -> anyhow::Result<MonitorConfig> {
    let domains = parse_domain_list(&domains.join(","))?;
    Ok(MonitorConfig {
        domains,
        port: opts.port,
        timeout: Duration::from_secs(opts.timeout),
        max_attempts: opts.attempts,
        base_delay: Duration::from_secs(opts.backoff),
        concurrency: opts.concurrency,
        deadline: opts.deadline.map(Duration::from_secs),
    })
}

fn use_ascii(opts: &Opts) -> bool {
    opts.ascii || !supports_unicode::on(supports_unicode::Stream::Stdout)
}

fn print_result(opts: &Opts, result: &CheckResult) -> anyhow::Result<()> {
    if opts.json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!("{}", report::render(result, use_ascii(opts)));
    }
    Ok(())
}

async fn check_command(opts: &Opts, domains: &[String], should_notify: bool) -> anyhow::Result<()> {
    let config = build_config(opts, domains)?;
    let monitor = Monitor::new(&config);
    let result = monitor.run(&config.domains).await;

    print_result(opts, &result)?;
    if should_notify {
        notify(opts, &result)?;
    }
    Ok(())
}

async fn daemon_command(opts: &Opts, cron: &str, domains: &[String]) -> anyhow::Result<()> {
    let config = build_config(opts, domains)?;

    let schedule = Schedule::from_str(cron)?;
    for next in schedule.upcoming(Utc) {
        debug!("next certificate check at {next}");
        loop {
            if Utc::now().timestamp() >= next.timestamp() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(999)).await;
        }

        // fresh monitor per run so the classification clock never goes stale
        let monitor = Monitor::new(&config);
        let result = monitor.run(&config.domains).await;
        print_result(opts, &result)?;
        if let Err(e) = notify(opts, &result) {
            error!("failed to deliver report: {e}");
        }
    }
    Ok(())
}

fn notify(opts: &Opts, result: &CheckResult) -> anyhow::Result<()> {
    let hook = match webhook_from_opts(opts) {
        Some(hook) => hook,
        None => {
            debug!("no webhook endpoint configured, skipping notification");
            return Ok(());
        }
    };
    let ascii = use_ascii(opts);
    hook.publish(
        &report::subject(result, ascii),
        &report::render(result, ascii),
        &result.summary(),
    )?;
    info!("report delivered to webhook");
    Ok(())
}

fn webhook_from_opts(opts: &Opts) -> Option<webhook::Webhook> {
    let url = opts.webhook_url.as_ref()?;
    let mut hook = webhook::Webhook::new(url);
    if let Some(token) = &opts.webhook_token {
        hook = hook.with_token(token);
    }
    Some(hook)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_opts(args: &[&str]) -> Opts {
        Opts::try_parse_from(args).unwrap()
    }

    #[test]
    fn t_build_config() {
        let opts = build_opts(&["certmon"]);
        let config = build_config(&opts, &["a.example,b.example".to_string()]).unwrap();
        assert_eq!(2, config.domains.len());
        assert_eq!(443, config.port);
        assert_eq!(Duration::from_secs(10), config.timeout);
        assert_eq!(4, config.max_attempts);
        assert!(config.deadline.is_none());
    }

    #[test]
    fn t_build_config_joins_arguments() {
        let opts = build_opts(&["certmon", "--port", "8443", "--deadline", "30"]);
        let config = build_config(
            &opts,
            &["a.example".to_string(), "b.example".to_string()],
        )
        .unwrap();
        assert_eq!(2, config.domains.len());
        assert_eq!(8443, config.port);
        assert_eq!(Some(Duration::from_secs(30)), config.deadline);
    }

    #[test]
    fn t_build_config_rejects_empty_domain_list() {
        let opts = build_opts(&["certmon"]);
        assert!(build_config(&opts, &[]).is_err());
    }

    #[test]
    fn t_webhook_requires_url() {
        let opts = build_opts(&["certmon"]);
        assert!(webhook_from_opts(&opts).is_none());

        let opts = build_opts(&["certmon", "--webhook-url", "https://hooks.example.com/certs"]);
        assert!(webhook_from_opts(&opts).is_some());
    }
}
