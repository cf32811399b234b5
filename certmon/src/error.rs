//! Probe error taxonomy.

use std::io;

use thiserror::Error;

/// Classification hook consumed by the retry policy.
pub trait Retryable {
    /// Whether another attempt could plausibly succeed.
    fn is_retryable(&self) -> bool;
}

/// Failure while fetching a certificate from a remote host.
///
/// Transient network conditions are retryable; anything that reflects the
/// server's actual certificate content is terminal and reported as-is.
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS resolution failed for the host.
    #[error("failed to resolve {domain}: {source}")]
    DnsResolution {
        /// Host that failed to resolve.
        domain: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The TCP connection could not be established or broke down.
    #[error("connection to {address} failed: {source}")]
    Connect {
        /// `host:port` pair the connection was aimed at.
        address: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// A network operation exceeded its timeout.
    #[error("{operation} of {domain} timed out")]
    Timeout {
        /// Host being probed.
        domain: String,
        /// Which operation timed out.
        operation: &'static str,
    },
    /// The TLS handshake failed for a reason other than certificate
    /// validation, e.g. a fatal alert or a protocol mismatch.
    #[error("TLS handshake with {domain} failed: {reason}")]
    Handshake {
        /// Host being probed.
        domain: String,
        /// Handshake failure detail.
        reason: String,
    },
    /// The handshake reached the server but its certificate failed
    /// validation (expired, hostname mismatch, untrusted chain).
    #[error("certificate of {domain} failed validation: {reason}")]
    CertificateInvalid {
        /// Host being probed.
        domain: String,
        /// Validation failure detail.
        reason: String,
    },
    /// The server completed the handshake without presenting a certificate.
    #[error("{domain} presented no certificate")]
    NoCertificate {
        /// Host being probed.
        domain: String,
    },
    /// The certificate's not-after field matches no supported encoding.
    #[error("certificate of {domain} carries an unparsable expiry timestamp: {raw:?}")]
    UnparsableExpiry {
        /// Host being probed.
        domain: String,
        /// Raw not-after value, for diagnosis.
        raw: String,
    },
    /// The host is not a valid TLS server name.
    #[error("{name:?} is not a valid server name: {reason}")]
    InvalidName {
        /// Rejected host string.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::DnsResolution { .. }
                | FetchError::Connect { .. }
                | FetchError::Timeout { .. }
                | FetchError::Handshake { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t_transient_errors_are_retryable() {
        let errors = [
            FetchError::DnsResolution {
                domain: "example.com".into(),
                source: io::Error::from(io::ErrorKind::NotFound),
            },
            FetchError::Connect {
                address: "example.com:443".into(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            },
            FetchError::Timeout {
                domain: "example.com".into(),
                operation: "connect",
            },
            FetchError::Handshake {
                domain: "example.com".into(),
                reason: "received fatal alert".into(),
            },
        ];
        for error in errors {
            assert!(error.is_retryable(), "{error} should be retryable");
        }
    }

    #[test]
    fn t_certificate_errors_are_terminal() {
        let errors = [
            FetchError::CertificateInvalid {
                domain: "example.com".into(),
                reason: "certificate expired".into(),
            },
            FetchError::NoCertificate {
                domain: "example.com".into(),
            },
            FetchError::UnparsableExpiry {
                domain: "example.com".into(),
                raw: "whenever".into(),
            },
            FetchError::InvalidName {
                name: "exa mple".into(),
                reason: "invalid dns name".into(),
            },
        ];
        for error in errors {
            assert!(!error.is_retryable(), "{error} should be terminal");
        }
    }

    #[test]
    fn t_display_embeds_raw_timestamp() {
        let error = FetchError::UnparsableExpiry {
            domain: "example.com".into(),
            raw: "Not After: someday".into(),
        };
        assert!(error.to_string().contains("Not After: someday"));
    }
}
