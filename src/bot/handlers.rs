use crate::config::BotConfig;
use crate::relay::{RelayService, Submitter};
use anyhow::Result;
use std::sync::Arc;
use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, Recipient, User, WebAppInfo},
    utils::command::BotCommands,
};
use tracing::info;

/// Label of the button that opens the mini-app.
pub const FORM_BUTTON_TEXT: &str = "Fill in the insurance form";

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Show the welcome message and the form button
    #[command(description = "Open the insurance form.")]
    Start,
    /// List the supported commands
    #[command(description = "Show this help.")]
    Help,
}

impl From<&User> for Submitter {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.0.cast_signed(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            username: user.username.clone(),
        }
    }
}

/// Sender of `msg`, or an anonymous submitter if Telegram omitted it.
#[must_use]
pub fn submitter_of(msg: &Message) -> Submitter {
    msg.from.as_ref().map(Submitter::from).unwrap_or_default()
}

/// Greeting shown on `/start`.
#[must_use]
pub fn welcome_text(first_name: &str) -> String {
    format!(
        "Hello, {first_name}! 👋\n\n\
         I collect the information needed for medical insurance in Germany.\n\n\
         Tap the button below to open the form:"
    )
}

/// Inline keyboard with a single button launching the mini-app.
///
/// # Examples
///
/// ```
/// use insurance_miniapp_bot::bot::handlers::welcome_keyboard;
/// use url::Url;
///
/// # fn main() -> Result<(), url::ParseError> {
/// let url = Url::parse("https://example.com/form")?;
/// let keyboard = welcome_keyboard(&url);
/// assert_eq!(keyboard.inline_keyboard.len(), 1);
/// # Ok(())
/// # }
/// ```
#[must_use]
pub fn welcome_keyboard(webapp_url: &url::Url) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::web_app(
        FORM_BUTTON_TEXT,
        WebAppInfo {
            url: webapp_url.clone(),
        },
    )]])
}

/// Start handler
///
/// # Errors
///
/// Returns an error if the welcome message cannot be sent.
pub async fn start(bot: Bot, msg: Message, config: Arc<BotConfig>) -> Result<()> {
    let user = submitter_of(&msg);

    bot.send_message(msg.chat.id, welcome_text(&user.first_name))
        .reply_markup(welcome_keyboard(&config.webapp_url))
        .await?;

    info!("User {} ({}) started the bot", user.id, user.first_name);
    Ok(())
}

/// Help handler
///
/// # Errors
///
/// Returns an error if the reply cannot be sent.
pub async fn help(bot: Bot, msg: Message) -> Result<()> {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

/// Mini-app data handler: relays the payload and acknowledges the user.
///
/// # Errors
///
/// Returns an error if the acknowledgement cannot be sent.
pub async fn web_app_data(msg: Message, relay: Arc<RelayService>) -> Result<()> {
    let Some(data) = msg.web_app_data() else {
        return Ok(());
    };

    let submitter = submitter_of(&msg);
    relay
        .process(Recipient::Id(msg.chat.id), &submitter, &data.data)
        .await?;
    Ok(())
}
