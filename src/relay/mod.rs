//! Relay of mini-app submissions to the administrator chat.
//!
//! One best-effort attempt per submission: the notification (and the photo
//! placeholder, if any) is sent once, then the user is told whether it
//! worked. Nothing is stored and nothing is retried.

mod submission;

pub use submission::{
    escape_markdown, format_notification, is_truthy, normalize_field_name, render_value,
    Submission, Submitter, PHOTO_FIELD,
};

use crate::bot::{DeliveryError, Messenger, TextFormat};
use std::sync::Arc;
use teloxide::types::Recipient;
use thiserror::Error;
use tracing::{error, info, warn};

/// Reply sent to the user after a successful relay.
pub const SUCCESS_REPLY: &str =
    "Thank you! Your data has been sent successfully. We will contact you shortly.";
/// Reply sent to the user when the administrator could not be reached.
pub const FAILURE_REPLY: &str =
    "An error occurred while sending your data. Please try again later.";
/// Reply sent to the user when the form payload could not be read.
pub const MALFORMED_REPLY: &str =
    "We could not read the submitted form. Please open the form again and resubmit it.";
/// Placeholder sent to the administrator when a photo was attached.
pub const PHOTO_PLACEHOLDER: &str =
    "The photo will be sent separately once image handling is implemented.";

/// Errors from a single relay attempt.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The payload is not a JSON object.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    /// The administrator notification could not be sent.
    #[error("delivery to admin failed: {0}")]
    Delivery(#[from] DeliveryError),
}

/// What the originating user was told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// The submission reached the administrator.
    Delivered,
    /// Sending to the administrator failed; the submission is lost.
    Failed,
    /// The payload could not be parsed; nothing was sent to the administrator.
    Rejected,
}

impl Acknowledgement {
    /// Text of the reply for this outcome.
    #[must_use]
    pub const fn reply_text(self) -> &'static str {
        match self {
            Self::Delivered => SUCCESS_REPLY,
            Self::Failed => FAILURE_REPLY,
            Self::Rejected => MALFORMED_REPLY,
        }
    }
}

/// Forwards submissions to the fixed administrator chat.
#[derive(Clone)]
pub struct RelayService {
    messenger: Arc<dyn Messenger>,
    admin_chat: Recipient,
}

impl RelayService {
    /// Create a relay sending through `messenger` to `admin_chat`.
    #[must_use]
    pub fn new(messenger: Arc<dyn Messenger>, admin_chat: Recipient) -> Self {
        Self {
            messenger,
            admin_chat,
        }
    }

    /// Destination of relayed submissions.
    #[must_use]
    pub const fn admin_chat(&self) -> &Recipient {
        &self.admin_chat
    }

    /// Parse `payload` and deliver it to the administrator.
    ///
    /// Returns the parsed submission on success.
    ///
    /// # Errors
    ///
    /// `RelayError::MalformedPayload` if the payload cannot be parsed,
    /// `RelayError::Delivery` if any message to the administrator fails.
    pub async fn relay(
        &self,
        submitter: &Submitter,
        payload: &str,
    ) -> Result<Submission, RelayError> {
        let submission = Submission::parse(payload)?;
        let text = format_notification(submitter, &submission);

        self.messenger
            .send_text(self.admin_chat.clone(), text, TextFormat::Markdown)
            .await?;

        if submission.has_photo() {
            self.messenger
                .send_text(
                    self.admin_chat.clone(),
                    PHOTO_PLACEHOLDER.to_string(),
                    TextFormat::Plain,
                )
                .await?;
        }

        Ok(submission)
    }

    /// Relay a submission and acknowledge the user in `origin`.
    ///
    /// Exactly one acknowledgement is sent per call.
    ///
    /// # Errors
    ///
    /// Returns a `DeliveryError` only if the acknowledgement itself cannot
    /// be sent; relay failures are reported to the user instead.
    pub async fn process(
        &self,
        origin: Recipient,
        submitter: &Submitter,
        payload: &str,
    ) -> Result<Acknowledgement, DeliveryError> {
        info!(
            "Received form data from user {} ({})",
            submitter.id, submitter.first_name
        );

        let ack = match self.relay(submitter, payload).await {
            Ok(submission) => {
                info!(
                    "Data from user {} ({} fields) sent to admin",
                    submitter.id,
                    submission.text_fields().count()
                );
                Acknowledgement::Delivered
            }
            Err(RelayError::MalformedPayload(reason)) => {
                warn!(
                    "Malformed form data from user {}: {}",
                    submitter.id, reason
                );
                Acknowledgement::Rejected
            }
            Err(RelayError::Delivery(e)) => {
                error!("Failed to send data to admin: {}", e);
                Acknowledgement::Failed
            }
        };

        self.messenger
            .send_text(origin, ack.reply_text().to_string(), TextFormat::Plain)
            .await?;

        Ok(ack)
    }
}
