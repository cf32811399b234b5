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

//! Small webhook client that delivers monitoring reports as JSON messages.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Delivery error.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Error from [`ureq`] crate.
    #[error("ureq error: {0}")]
    UReq(#[from] Box<ureq::Error>),
    /// The endpoint answered with a body that does not parse as a receipt.
    #[error("malformed receipt: {0}")]
    Receipt(#[from] std::io::Error),
    /// The endpoint parsed the request but refused the message.
    #[error("message rejected: {reasons}")]
    Rejected {
        /// Reasons reported by the endpoint.
        reasons: String,
    },
}

/// Payload posted to the endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
struct Message<'a> {
    subject: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a serde_json::Value>,
}

/// Endpoint acknowledgement. A `status` of `1` means the message was
/// accepted.
#[derive(Debug, Deserialize)]
pub struct Receipt {
    /// `1` when the message was accepted.
    pub status: u8,
    /// Identifier the endpoint assigned to the accepted message, if any.
    pub id: Option<String>,
    /// Reasons the message was refused, if any.
    pub errors: Option<Vec<String>>,
}

/// Webhook endpoint that receives reports.
///
/// ```
/// use webhook::Webhook;
/// Webhook::new("https://hooks.example.com/certs");
/// Webhook::new("https://hooks.example.com/certs").with_token("secret");
/// ```
#[derive(Debug, Clone)]
pub struct Webhook {
    url: String,
    token: Option<String>,
}

impl Webhook {
    /// Creates a publisher for `url`.
    pub fn new<T: Into<String>>(url: T) -> Self {
        Webhook {
            url: url.into(),
            token: None,
        }
    }

    /// Attaches a bearer token sent with every request.
    pub fn with_token<T: Into<String>>(mut self, token: T) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Posts `subject` and `body` to the endpoint and returns its receipt.
    pub fn send(&self, subject: &str, body: &str) -> Result<Receipt, PublishError> {
        self.post(Message {
            subject,
            body,
            summary: None,
        })
    }

    /// Posts a report along with machine-readable summary data.
    pub fn send_with_summary(
        &self,
        subject: &str,
        body: &str,
        summary: &serde_json::Value,
    ) -> Result<Receipt, PublishError> {
        self.post(Message {
            subject,
            body,
            summary: Some(summary),
        })
    }

    fn post(&self, message: Message<'_>) -> Result<Receipt, PublishError> {
        let mut request = ureq::post(&self.url);
        if let Some(token) = &self.token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }

        debug!("posting {:?} to {}", message.subject, self.url);
        let response = request
            .send_json(message)
            .map_err(|e| PublishError::UReq(Box::new(e)))?;

        let receipt: Receipt = response.into_json()?;
        if receipt.status != 1 {
            let reasons = receipt.errors.clone().unwrap_or_default().join(", ");
            return Err(PublishError::Rejected { reasons });
        }
        Ok(receipt)
    }
}
