use crate::bot::handlers::{self, Command};
use crate::config::BotConfig;
use crate::relay::RelayService;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{debug, error, info, warn};

/// Run the bot until Ctrl+C.
///
/// Takes an already validated [`BotConfig`], so a missing token never
/// reaches this point.
pub async fn run_bot(config: Arc<BotConfig>) {
    let bot = Bot::new(config.telegram_token.clone());
    register_commands(&bot).await;

    let relay = Arc::new(RelayService::new(
        Arc::new(bot.clone()),
        config.admin_chat.clone(),
    ));
    info!("Relaying submissions to {:?}", relay.admin_chat());

    let handler = setup_handler();

    info!("Bot is running. Press Ctrl+C to stop.");

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![config, relay])
        .default_handler(|upd| async move {
            debug!("Ignoring unhandled update {:?}", upd.id);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped.");
}

async fn register_commands(bot: &Bot) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            dptree::filter(|msg: Message| msg.web_app_data().is_some())
                .endpoint(handle_web_app_data),
        )
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    config: Arc<BotConfig>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => handlers::start(bot, msg, config).await,
        Command::Help => handlers::help(bot, msg).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_web_app_data(
    msg: Message,
    relay: Arc<RelayService>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = handlers::web_app_data(msg, relay).await {
        error!("Failed to acknowledge form submission: {}", e);
    }
    respond(())
}
