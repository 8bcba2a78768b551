//! Outbound messaging seam.
//!
//! Relay logic talks to [`Messenger`] instead of `teloxide::Bot` so it can
//! be exercised without a live token.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, Recipient};
use thiserror::Error;

/// A send request was rejected by the transport.
#[derive(Debug, Error)]
#[error("Telegram send error: {0}")]
pub struct DeliveryError(pub String);

impl From<teloxide::RequestError> for DeliveryError {
    fn from(e: teloxide::RequestError) -> Self {
        Self(e.to_string())
    }
}

/// How the text of an outbound message is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    /// Sent as-is
    Plain,
    /// Legacy Telegram Markdown (`*bold*`, `_italic_`)
    Markdown,
}

/// Sends text messages to a chat.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send `text` to `to`.
    async fn send_text(
        &self,
        to: Recipient,
        text: String,
        format: TextFormat,
    ) -> Result<(), DeliveryError>;
}

#[async_trait]
impl Messenger for Bot {
    #[allow(deprecated)]
    async fn send_text(
        &self,
        to: Recipient,
        text: String,
        format: TextFormat,
    ) -> Result<(), DeliveryError> {
        let req = self.send_message(to, text);
        let req = match format {
            TextFormat::Plain => req,
            TextFormat::Markdown => req.parse_mode(ParseMode::Markdown),
        };
        req.await?;
        Ok(())
    }
}
