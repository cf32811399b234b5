//! TLS certificate retrieval.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, NaiveDateTime, SubsecRound, TimeZone, Utc};
use log::debug;
use once_cell::sync::Lazy;
use rustls::client::{ServerCertVerified, ServerCertVerifier};
use rustls::{
    Certificate, ClientConfig, ClientConnection, OwnedTrustAnchor, RootCertStore, ServerName,
};
use x509_parser::parse_x509_certificate;
use x509_parser::time::ASN1Time;
use x509_parser::x509::X509Name;

use crate::classify;
use crate::domain::Domain;
use crate::error::FetchError;
use crate::outcome::CertificateInfo;

/// Default TLS port.
pub const DEFAULT_PORT: u16 = 443;

/// Default timeout per socket operation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retrieves one certificate per call.
///
/// The orchestrator only talks to this trait, so tests substitute scripted
/// fetchers for the network-bound implementation.
pub trait Fetch {
    /// Fetches and classifies the certificate served by `domain`.
    fn fetch(&self, domain: &Domain) -> Result<CertificateInfo, FetchError>;
}

static STRICT_CONFIG: Lazy<Arc<ClientConfig>> = Lazy::new(|| {
    let mut root_store = RootCertStore::empty();
    root_store.add_server_trust_anchors(webpki_roots::TLS_SERVER_ROOTS.0.iter().map(|ta| {
        OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));
    Arc::new(
        ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(root_store)
            .with_no_client_auth(),
    )
});

static PERMISSIVE_CONFIG: Lazy<Arc<ClientConfig>> = Lazy::new(|| {
    let mut config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(RootCertStore::empty())
        .with_no_client_auth();
    config
        .dangerous()
        .set_certificate_verifier(Arc::new(AcceptAnyCertificate));
    Arc::new(config)
});

// Used only for the metadata recovery handshake after strict validation
// already failed; its verdict is never treated as trust.
struct AcceptAnyCertificate;

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &Certificate,
        _intermediates: &[Certificate],
        _server_name: &ServerName,
        _scts: &mut dyn Iterator<Item = &[u8]>,
        _ocsp_response: &[u8],
        _now: SystemTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }
}

/// Network-bound certificate fetcher.
///
/// Validation failures are not dead ends: after a strict handshake reports
/// an invalid certificate, the fetcher reconnects without verification to
/// recover the certificate's expiry date and issuer, and reports the domain
/// as fetched-but-invalid instead of unreachable.
#[derive(Debug, Clone, Copy)]
pub struct CertFetcher {
    checked_at: DateTime<Utc>,
    port: u16,
    timeout: Duration,
}

impl Default for CertFetcher {
    fn default() -> Self {
        CertFetcher::new(DEFAULT_PORT, DEFAULT_TIMEOUT)
    }
}

impl CertFetcher {
    /// Creates a fetcher probing `port` with `timeout` per socket operation.
    pub fn new(port: u16, timeout: Duration) -> Self {
        CertFetcher {
            checked_at: Utc::now().round_subsecs(0),
            port,
            timeout,
        }
    }

    fn resolve(&self, domain: &Domain) -> Result<SocketAddr, FetchError> {
        let mut addresses =
            (domain.as_str(), self.port)
                .to_socket_addrs()
                .map_err(|source| FetchError::DnsResolution {
                    domain: domain.to_string(),
                    source,
                })?;
        addresses.next().ok_or_else(|| FetchError::DnsResolution {
            domain: domain.to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no address records"),
        })
    }

    fn connect(&self, domain: &Domain) -> Result<TcpStream, FetchError> {
        let address = self.resolve(domain)?;
        let stream = TcpStream::connect_timeout(&address, self.timeout)
            .map_err(|e| self.io_error(domain, "connect", e))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| self.io_error(domain, "connect", e))?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| self.io_error(domain, "connect", e))?;
        Ok(stream)
    }

    /// Runs the handshake and returns the DER-encoded peer chain.
    fn handshake(
        &self,
        config: Arc<ClientConfig>,
        domain: &Domain,
    ) -> Result<Vec<Certificate>, FetchError> {
        let server_name =
            ServerName::try_from(domain.as_str()).map_err(|e| FetchError::InvalidName {
                name: domain.to_string(),
                reason: e.to_string(),
            })?;
        let mut conn =
            ClientConnection::new(config, server_name).map_err(|e| FetchError::Handshake {
                domain: domain.to_string(),
                reason: e.to_string(),
            })?;
        let mut stream = self.connect(domain)?;

        while conn.is_handshaking() {
            conn.complete_io(&mut stream)
                .map_err(|e| self.tls_error(domain, e))?;
        }

        let certificates = conn
            .peer_certificates()
            .ok_or_else(|| FetchError::NoCertificate {
                domain: domain.to_string(),
            })?;
        if certificates.is_empty() {
            return Err(FetchError::NoCertificate {
                domain: domain.to_string(),
            });
        }
        Ok(certificates.to_vec())
    }

    fn extract(
        &self,
        domain: &Domain,
        chain: &[Certificate],
        is_valid: bool,
        error_message: Option<String>,
    ) -> Result<CertificateInfo, FetchError> {
        let leaf = chain.first().ok_or_else(|| FetchError::NoCertificate {
            domain: domain.to_string(),
        })?;
        let (_, cert) = parse_x509_certificate(leaf.as_ref()).map_err(|e| {
            FetchError::CertificateInvalid {
                domain: domain.to_string(),
                reason: format!("leaf certificate does not parse: {e}"),
            }
        })?;

        let expiry_date = self.not_after(domain, &cert.validity().not_after)?;
        Ok(CertificateInfo {
            domain: domain.clone(),
            expiry_date,
            days_until_expiry: classify::days_until_expiry(expiry_date, self.checked_at),
            issuer: issuer_name(cert.issuer()),
            is_valid,
            error_message,
        })
    }

    fn not_after(&self, domain: &Domain, not_after: &ASN1Time) -> Result<DateTime<Utc>, FetchError> {
        if let Some(parsed) = Utc.timestamp_opt(not_after.timestamp(), 0).single() {
            return Ok(parsed);
        }
        let raw = not_after.to_string();
        parse_openssl_time(&raw).ok_or(FetchError::UnparsableExpiry {
            domain: domain.to_string(),
            raw,
        })
    }

    fn io_error(&self, domain: &Domain, operation: &'static str, error: io::Error) -> FetchError {
        match error.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FetchError::Timeout {
                domain: domain.to_string(),
                operation,
            },
            _ => FetchError::Connect {
                address: format!("{domain}:{}", self.port),
                source: error,
            },
        }
    }

    fn tls_error(&self, domain: &Domain, error: io::Error) -> FetchError {
        let tls = error
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<rustls::Error>());
        if let Some(tls) = tls {
            return match tls {
                rustls::Error::InvalidCertificateData(reason) => FetchError::CertificateInvalid {
                    domain: domain.to_string(),
                    reason: reason.clone(),
                },
                rustls::Error::InvalidCertificateEncoding
                | rustls::Error::InvalidCertificateSignature
                | rustls::Error::InvalidCertificateSignatureType => {
                    FetchError::CertificateInvalid {
                        domain: domain.to_string(),
                        reason: tls.to_string(),
                    }
                }
                rustls::Error::NoCertificatesPresented => FetchError::NoCertificate {
                    domain: domain.to_string(),
                },
                other => FetchError::Handshake {
                    domain: domain.to_string(),
                    reason: other.to_string(),
                },
            };
        }
        self.io_error(domain, "handshake", error)
    }
}

impl Fetch for CertFetcher {
    fn fetch(&self, domain: &Domain) -> Result<CertificateInfo, FetchError> {
        match self.handshake(STRICT_CONFIG.clone(), domain) {
            Ok(chain) => self.extract(domain, &chain, true, None),
            Err(FetchError::CertificateInvalid { reason, .. }) => {
                debug!("{domain} failed validation ({reason}), recovering certificate metadata");
                let chain = self.handshake(PERMISSIVE_CONFIG.clone(), domain)?;
                self.extract(domain, &chain, false, Some(reason))
            }
            Err(e) => Err(e),
        }
    }
}

/// Recognizes the textual OpenSSL rendering, e.g. `Dec 31 23:59:59 2024 GMT`.
fn parse_openssl_time(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim().trim_end_matches(" GMT");
    NaiveDateTime::parse_from_str(trimmed, "%b %e %H:%M:%S %Y")
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn issuer_name(issuer: &X509Name<'_>) -> String {
    issuer
        .iter_organization()
        .chain(issuer.iter_common_name())
        .find_map(|attr| attr.as_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| String::from("Unknown Issuer"))
}
