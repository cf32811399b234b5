//! Validated domain names.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Reason a host string was rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    /// The host string was empty.
    #[error("domain is empty")]
    Empty,
    /// The host string exceeds the 253 character limit of a DNS name.
    #[error("domain exceeds 253 characters")]
    TooLong,
    /// The host string carries a scheme, path or port decoration.
    #[error("{0:?} is not a bare host name")]
    NotBareHost(String),
    /// Wildcard names cannot be connected to.
    #[error("{0:?} is a wildcard, not a host name")]
    Wildcard(String),
    /// IP literals carry no server name to verify a certificate against.
    #[error("{0:?} is an IP literal, not a host name")]
    IpLiteral(String),
    /// A DNS label violates length or character rules.
    #[error("{0:?} contains a malformed label")]
    BadLabel(String),
}

/// Normalized bare host name accepted by the prober.
///
/// Guaranteed lowercase and free of schemes, paths, ports, wildcards and IP
/// literals. Immutable once validated.
///
/// ```
/// use certmon::domain::Domain;
/// let domain: Domain = "Example.COM".parse().unwrap();
/// assert_eq!("example.com", domain.as_str());
/// assert!("https://example.com".parse::<Domain>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Domain(String);

impl Domain {
    /// Validates `host` and returns it lowercased.
    pub fn new<T: AsRef<str>>(host: T) -> Result<Domain, DomainError> {
        let host = host.as_ref().trim().to_ascii_lowercase();
        if host.is_empty() {
            return Err(DomainError::Empty);
        }
        if host.len() > 253 {
            return Err(DomainError::TooLong);
        }
        if host.contains("://") || host.contains('/') || host.contains(':') {
            return Err(DomainError::NotBareHost(host));
        }
        if host.contains('*') {
            return Err(DomainError::Wildcard(host));
        }
        if host.parse::<Ipv4Addr>().is_ok() {
            return Err(DomainError::IpLiteral(host));
        }

        let labels: Vec<&str> = host.split('.').collect();
        if labels.len() < 2 {
            return Err(DomainError::BadLabel(host));
        }
        for label in &labels {
            let valid = !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
            if !valid {
                return Err(DomainError::BadLabel(host));
            }
        }

        // The registry label is alphabetic, which also rules out dotted
        // quads that Ipv4Addr refuses to parse.
        let tld = labels[labels.len() - 1];
        if tld.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::IpLiteral(host));
        }
        if tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(DomainError::BadLabel(host));
        }

        Ok(Domain(host))
    }

    /// Host name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Domain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Domain::new(s)
    }
}
