//! Report delivery capability.

use thiserror::Error;

use crate::report::ReportSummary;

/// Failure to deliver a report.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct NotifyError(String);

impl NotifyError {
    /// Creates an error from any displayable cause.
    pub fn new<T: ToString>(cause: T) -> Self {
        NotifyError(cause.to_string())
    }
}

/// Single-capability publishing interface for notification transports.
///
/// The engine's obligation ends at producing the subject, body and summary
/// counts; delivery, its retries and its subscribers belong to whichever
/// transport implements this trait.
pub trait Notify {
    /// Delivers one report with its structured summary counts.
    fn publish(&self, subject: &str, body: &str, summary: &ReportSummary)
        -> Result<(), NotifyError>;
}

impl Notify for webhook::Webhook {
    fn publish(
        &self,
        subject: &str,
        body: &str,
        summary: &ReportSummary,
    ) -> Result<(), NotifyError> {
        let summary = serde_json::to_value(summary).map_err(NotifyError::new)?;
        let receipt = self
            .send_with_summary(subject, body, &summary)
            .map_err(NotifyError::new)?;
        log::debug!("webhook acknowledged message {:?}", receipt.id);
        Ok(())
    }
}
