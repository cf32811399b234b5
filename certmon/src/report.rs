//! Outcome aggregation and report rendering.

use std::time::Duration;

use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};
use serde::Serialize;

use crate::outcome::{CertificateInfo, ProbeFailure, ProbeOutcome, Status, EXPIRY_WARNING_DAYS};

/// Aggregate of one probe run.
///
/// Built once by [`aggregate`] when every outcome is in, then handed to the
/// formatter and discarded; nothing mutates it afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    /// Instant the run started.
    pub checked_at: DateTime<Utc>,
    /// Number of input domains.
    pub total_domains: usize,
    /// Domains whose certificate was fetched.
    pub successful_checks: usize,
    /// Domains that could not be checked.
    pub failed_checks: usize,
    /// Certificates expiring within the warning window, in outcome order.
    pub expiring_domains: Vec<CertificateInfo>,
    /// Certificates already expired, in outcome order.
    pub expired_domains: Vec<CertificateInfo>,
    /// Certificates that failed validation without being expired or
    /// expiring, in outcome order.
    pub invalid_domains: Vec<CertificateInfo>,
    /// Certificates in good standing, in outcome order.
    pub healthy_domains: Vec<CertificateInfo>,
    /// Per-domain failures, matching the input domain order.
    pub errors: Vec<ProbeFailure>,
    /// Wall-clock duration of the run, serialized as milliseconds.
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(
    elapsed: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(elapsed.as_millis())
}

impl CheckResult {
    /// True when any domain is expired, expiring, invalid or unreachable.
    pub fn needs_attention(&self) -> bool {
        !self.expired_domains.is_empty()
            || !self.expiring_domains.is_empty()
            || !self.invalid_domains.is_empty()
            || !self.errors.is_empty()
    }

    /// Summary counts handed to the notification sink with the report.
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            total_domains: self.total_domains,
            successful_checks: self.successful_checks,
            failed_checks: self.failed_checks,
            expiring: self.expiring_domains.len(),
            expired: self.expired_domains.len(),
        }
    }
}

/// Structured summary counts accompanying a delivered report.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReportSummary {
    /// Number of input domains.
    pub total_domains: usize,
    /// Domains whose certificate was fetched.
    pub successful_checks: usize,
    /// Domains that could not be checked.
    pub failed_checks: usize,
    /// Certificates expiring within the warning window.
    pub expiring: usize,
    /// Certificates already expired.
    pub expired: usize,
}

/// Folds per-domain outcomes into a [`CheckResult`].
///
/// Pure with respect to its inputs: summary counts do not depend on outcome
/// order, list contents follow it.
pub fn aggregate(
    checked_at: DateTime<Utc>,
    outcomes: Vec<ProbeOutcome>,
    elapsed: Duration,
) -> CheckResult {
    let mut result = CheckResult {
        checked_at,
        total_domains: outcomes.len(),
        successful_checks: 0,
        failed_checks: 0,
        expiring_domains: Vec::new(),
        expired_domains: Vec::new(),
        invalid_domains: Vec::new(),
        healthy_domains: Vec::new(),
        errors: Vec::new(),
        elapsed,
    };
    for outcome in outcomes {
        match outcome {
            ProbeOutcome::Checked(info) => {
                result.successful_checks += 1;
                match info.status() {
                    Status::Expired => result.expired_domains.push(info),
                    Status::ExpiringSoon => result.expiring_domains.push(info),
                    Status::Invalid => result.invalid_domains.push(info),
                    Status::Healthy => result.healthy_domains.push(info),
                }
            }
            ProbeOutcome::Failed(failure) => {
                result.failed_checks += 1;
                result.errors.push(failure);
            }
        }
    }
    result
}

/// One-line subject for the rendered report.
pub fn subject(result: &CheckResult, ascii: bool) -> String {
    let expired = result.expired_domains.len();
    let expiring = result.expiring_domains.len();
    let attention = result.invalid_domains.len() + result.errors.len();
    let total = result.total_domains;
    if expired > 0 {
        format!(
            "{} certificate alert: {expired} expired, {expiring} expiring | {total} domains",
            Status::Expired.icon(ascii)
        )
    } else if expiring > 0 {
        format!(
            "{} certificate alert: {expiring} expiring soon | {total} domains",
            Status::ExpiringSoon.icon(ascii)
        )
    } else if attention > 0 {
        format!(
            "{} certificate alert: {attention} domains need attention | {total} domains",
            Status::Invalid.icon(ascii)
        )
    } else {
        format!(
            "{} certificates all clear | {total} domains",
            Status::Healthy.icon(ascii)
        )
    }
}

/// Renders the notification body for `result`.
///
/// Sections appear in urgency order and every input domain shows up in
/// exactly one of them. Output is deterministic for identical results.
pub fn render(result: &CheckResult, ascii: bool) -> String {
    let mut lines: Vec<String> = vec![
        "Certificate expiry report".to_string(),
        "=".repeat(40),
        format!(
            "checked at: {}",
            result.checked_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        format!(
            "domains: {} total, {} checked, {} failed",
            result.total_domains, result.successful_checks, result.failed_checks
        ),
        String::new(),
    ];

    if !result.needs_attention() {
        lines.push(format!(
            "{} all certificates are valid and outside the warning window",
            Status::Healthy.icon(ascii)
        ));
        lines.push(String::new());
    }

    if !result.expired_domains.is_empty() {
        lines.push(format!(
            "{} expired certificates, renew immediately:",
            Status::Expired.icon(ascii)
        ));
        for cert in &result.expired_domains {
            lines.push(format!("- {}", cert.domain));
            lines.push(format!(
                "    expired {} days ago ({})",
                (-cert.days_until_expiry).to_formatted_string(&Locale::en),
                cert.expiry_date.format("%Y-%m-%d")
            ));
            lines.push(format!("    issuer: {}", cert.issuer));
        }
        lines.push(String::new());
    }

    if !result.expiring_domains.is_empty() {
        lines.push(format!(
            "{} certificates expiring within {EXPIRY_WARNING_DAYS} days:",
            Status::ExpiringSoon.icon(ascii)
        ));
        for cert in &result.expiring_domains {
            lines.push(format!("- {}", cert.domain));
            lines.push(format!(
                "    expires in {} days ({})",
                cert.days_until_expiry.to_formatted_string(&Locale::en),
                cert.expiry_date.format("%Y-%m-%d")
            ));
            lines.push(format!("    issuer: {}", cert.issuer));
        }
        lines.push(String::new());
    }

    if !result.invalid_domains.is_empty() {
        lines.push(format!(
            "{} certificates failing validation:",
            Status::Invalid.icon(ascii)
        ));
        for cert in &result.invalid_domains {
            let reason = cert.error_message.as_deref().unwrap_or("validation failed");
            lines.push(format!(
                "- {}: {} (expires {})",
                cert.domain,
                reason,
                cert.expiry_date.format("%Y-%m-%d")
            ));
        }
        lines.push(String::new());
    }

    if !result.errors.is_empty() {
        lines.push(format!(
            "{} unreachable domains:",
            Status::Invalid.icon(ascii)
        ));
        for failure in &result.errors {
            lines.push(format!("- {failure}"));
        }
        lines.push(String::new());
    }

    if !result.healthy_domains.is_empty() {
        lines.push(format!(
            "{} healthy certificates:",
            Status::Healthy.icon(ascii)
        ));
        for cert in &result.healthy_domains {
            lines.push(format!(
                "- {}: {} days remaining ({})",
                cert.domain,
                cert.days_until_expiry.to_formatted_string(&Locale::en),
                cert.expiry_date.format("%Y-%m-%d")
            ));
        }
        lines.push(String::new());
    }

    lines.push(format!("completed in {}ms", result.elapsed.as_millis()));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration as ChronoDuration, TimeZone};

    use crate::domain::Domain;

    fn checked_at() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn checked(host: &str, days: i64, is_valid: bool, error: Option<&str>) -> ProbeOutcome {
        ProbeOutcome::Checked(CertificateInfo {
            domain: Domain::new(host).unwrap(),
            expiry_date: checked_at() + ChronoDuration::days(days),
            days_until_expiry: days,
            issuer: "Test CA".to_string(),
            is_valid,
            error_message: error.map(str::to_string),
        })
    }

    fn failed(host: &str, error: &str) -> ProbeOutcome {
        ProbeOutcome::Failed(ProbeFailure {
            domain: Domain::new(host).unwrap(),
            error: error.to_string(),
        })
    }

    fn mixed_outcomes() -> Vec<ProbeOutcome> {
        vec![
            checked("good.example", 90, true, None),
            checked("soon.example", 12, true, None),
            checked("old.example", -5, false, Some("certificate expired")),
            checked("bad.example", 200, false, Some("hostname mismatch")),
            failed("down.example", "connect of down.example timed out"),
        ]
    }

    #[test]
    fn t_aggregate_counts() {
        let result = aggregate(checked_at(), mixed_outcomes(), Duration::from_millis(10));
        assert_eq!(5, result.total_domains);
        assert_eq!(4, result.successful_checks);
        assert_eq!(1, result.failed_checks);
        assert_eq!(
            result.total_domains,
            result.successful_checks + result.failed_checks
        );
        assert_eq!(1, result.expired_domains.len());
        assert_eq!(1, result.expiring_domains.len());
        assert_eq!(1, result.invalid_domains.len());
        assert_eq!(1, result.healthy_domains.len());
        assert_eq!(1, result.errors.len());
        assert!(result.needs_attention());
    }

    #[test]
    fn t_aggregate_lists_are_disjoint() {
        let result = aggregate(checked_at(), mixed_outcomes(), Duration::from_millis(10));
        let mut seen = Vec::new();
        for cert in result
            .expired_domains
            .iter()
            .chain(&result.expiring_domains)
            .chain(&result.invalid_domains)
            .chain(&result.healthy_domains)
        {
            assert!(!seen.contains(&cert.domain), "{} listed twice", cert.domain);
            seen.push(cert.domain.clone());
        }
        assert_eq!(result.successful_checks, seen.len());
    }

    #[test]
    fn t_aggregate_counts_are_order_independent() {
        let forward = aggregate(checked_at(), mixed_outcomes(), Duration::from_millis(10));
        let mut reversed_outcomes = mixed_outcomes();
        reversed_outcomes.reverse();
        let reversed = aggregate(checked_at(), reversed_outcomes, Duration::from_millis(10));

        assert_eq!(forward.total_domains, reversed.total_domains);
        assert_eq!(forward.successful_checks, reversed.successful_checks);
        assert_eq!(forward.failed_checks, reversed.failed_checks);
        assert_eq!(forward.expired_domains.len(), reversed.expired_domains.len());
        assert_eq!(
            forward.expiring_domains.len(),
            reversed.expiring_domains.len()
        );
    }

    #[test]
    fn t_aggregate_preserves_error_order() {
        let outcomes = vec![
            failed("one.example", "timeout"),
            checked("good.example", 90, true, None),
            failed("two.example", "refused"),
        ];
        let result = aggregate(checked_at(), outcomes, Duration::from_millis(10));
        let order: Vec<&str> = result
            .errors
            .iter()
            .map(|failure| failure.domain.as_str())
            .collect();
        assert_eq!(vec!["one.example", "two.example"], order);
    }

    #[test]
    fn t_aggregate_empty_run() {
        let result = aggregate(checked_at(), Vec::new(), Duration::from_millis(0));
        assert_eq!(0, result.total_domains);
        assert_eq!(0, result.successful_checks);
        assert_eq!(0, result.failed_checks);
        assert!(result.expiring_domains.is_empty());
        assert!(result.expired_domains.is_empty());
        assert!(result.errors.is_empty());
    }

    #[test]
    fn t_zero_day_certificate_is_expiring_not_expired() {
        let result = aggregate(
            checked_at(),
            vec![checked("edge.example", 0, true, None)],
            Duration::from_millis(10),
        );
        assert_eq!(1, result.expiring_domains.len());
        assert!(result.expired_domains.is_empty());
    }

    #[test]
    fn t_subject_prioritizes_expired() {
        let result = aggregate(checked_at(), mixed_outcomes(), Duration::from_millis(10));
        assert_eq!(
            "[x] certificate alert: 1 expired, 1 expiring | 5 domains",
            subject(&result, true)
        );
    }

    #[test]
    fn t_subject_all_clear() {
        let result = aggregate(
            checked_at(),
            vec![checked("good.example", 90, true, None)],
            Duration::from_millis(10),
        );
        assert_eq!(
            "[v] certificates all clear | 1 domains",
            subject(&result, true)
        );
    }

    #[test]
    fn t_render_golden() {
        let outcomes = vec![
            checked("old.example", -5, false, Some("certificate expired")),
            failed(
                "down.example",
                "retries exhausted after 4 attempts: connect of down.example timed out",
            ),
            checked("good.example", 90, true, None),
        ];
        let result = aggregate(checked_at(), outcomes, Duration::from_millis(1234));
        let expected = "\
Certificate expiry report
========================================
checked at: 2023-11-14 22:13:20 UTC
domains: 3 total, 2 checked, 1 failed

[x] expired certificates, renew immediately:
- old.example
    expired 5 days ago (2023-11-09)
    issuer: Test CA

[x] unreachable domains:
- down.example: retries exhausted after 4 attempts: connect of down.example timed out

[v] healthy certificates:
- good.example: 90 days remaining (2024-02-12)

completed in 1234ms";
        assert_eq!(expected, render(&result, true));
    }

    #[test]
    fn t_render_all_clear() {
        let result = aggregate(
            checked_at(),
            vec![checked("good.example", 90, true, None)],
            Duration::from_millis(50),
        );
        let expected = "\
Certificate expiry report
========================================
checked at: 2023-11-14 22:13:20 UTC
domains: 1 total, 1 checked, 0 failed

[v] all certificates are valid and outside the warning window

[v] healthy certificates:
- good.example: 90 days remaining (2024-02-12)

completed in 50ms";
        assert_eq!(expected, render(&result, true));
    }

    #[test]
    fn t_render_is_deterministic() {
        let result = aggregate(checked_at(), mixed_outcomes(), Duration::from_millis(10));
        assert_eq!(render(&result, true), render(&result, true));
        assert_eq!(render(&result, false), render(&result, false));
    }

    #[test]
    fn t_summary_counts() {
        let result = aggregate(checked_at(), mixed_outcomes(), Duration::from_millis(10));
        let summary = result.summary();
        assert_eq!(5, summary.total_domains);
        assert_eq!(4, summary.successful_checks);
        assert_eq!(1, summary.failed_checks);
        assert_eq!(1, summary.expiring);
        assert_eq!(1, summary.expired);
    }

    #[test]
    fn t_json_serialization() {
        let result = aggregate(
            checked_at(),
            vec![checked("good.example", 90, true, None)],
            Duration::from_millis(42),
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(1, value["total_domains"]);
        assert_eq!(42, value["elapsed"]);
        assert_eq!("good.example", value["healthy_domains"][0]["domain"]);
    }
}
