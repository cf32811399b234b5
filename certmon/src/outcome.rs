//! Per-domain probe outcomes.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::Domain;

/// Days ahead of expiry at which a certificate is reported as expiring soon.
pub const EXPIRY_WARNING_DAYS: i64 = 30;

/// Metadata extracted from one domain's certificate.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateInfo {
    /// Probed host.
    pub domain: Domain,
    /// Certificate not-after instant.
    pub expiry_date: DateTime<Utc>,
    /// Whole days until `expiry_date`; negative once expired.
    pub days_until_expiry: i64,
    /// Issuer organization, or common name when no organization is present.
    pub issuer: String,
    /// False when the handshake surfaced a validation failure.
    pub is_valid: bool,
    /// Validation failure detail, populated when `is_valid` is false.
    pub error_message: Option<String>,
}

impl CertificateInfo {
    /// Certificate expires within the warning window (0 to 30 days).
    ///
    /// A certificate expiring in exactly 0 days is expiring soon, not
    /// expired.
    pub fn is_expiring_soon(&self) -> bool {
        (0..=EXPIRY_WARNING_DAYS).contains(&self.days_until_expiry)
    }

    /// Certificate not-after lies in the past.
    pub fn is_expired(&self) -> bool {
        self.days_until_expiry < 0
    }

    /// Reporting bucket for this certificate, most urgent first.
    pub fn status(&self) -> Status {
        if self.is_expired() {
            Status::Expired
        } else if self.is_expiring_soon() {
            Status::ExpiringSoon
        } else if !self.is_valid {
            Status::Invalid
        } else {
            Status::Healthy
        }
    }
}

/// Reporting bucket of a fetched certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Valid and outside the warning window.
    Healthy,
    /// Expires within the warning window.
    ExpiringSoon,
    /// Already expired.
    Expired,
    /// Failed validation without being expired or expiring.
    Invalid,
}

impl Status {
    /// Icon in ASCII or Unicode, following the terminal's capabilities.
    pub fn icon(self, ascii: bool) -> &'static str {
        match self {
            Status::Healthy => {
                if ascii {
                    "[v]"
                } else {
                    "\u{2705}"
                }
            }
            Status::ExpiringSoon => {
                if ascii {
                    "[-]"
                } else {
                    "\u{26a0}\u{fe0f}"
                }
            }
            Status::Expired | Status::Invalid => {
                if ascii {
                    "[x]"
                } else {
                    "\u{274c}"
                }
            }
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Healthy => write!(f, "HEALTHY"),
            Status::ExpiringSoon => write!(f, "EXPIRING"),
            Status::Expired => write!(f, "EXPIRED"),
            Status::Invalid => write!(f, "INVALID"),
        }
    }
}

/// One domain that could not be checked, and why.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeFailure {
    /// Host that could not be checked.
    pub domain: Domain,
    /// Failure description.
    pub error: String,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.domain, self.error)
    }
}

/// Result of probing one domain, one-to-one with the input list.
#[derive(Debug, Clone)]
pub enum ProbeOutcome {
    /// The certificate was fetched and classified.
    Checked(CertificateInfo),
    /// The domain could not be checked.
    Failed(ProbeFailure),
}

impl ProbeOutcome {
    /// Domain this outcome belongs to.
    pub fn domain(&self) -> &Domain {
        match self {
            ProbeOutcome::Checked(info) => &info.domain,
            ProbeOutcome::Failed(failure) => &failure.domain,
        }
    }
}
