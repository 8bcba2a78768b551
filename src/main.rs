use dotenvy::dotenv;
use insurance_miniapp_bot::config::{BotConfig, Settings};
use insurance_miniapp_bot::logging::{init_logging, RedactionPatterns};
use insurance_miniapp_bot::runner::run_bot;
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting insurance mini-app bot...");

    let config = init_config();

    run_bot(config).await;

    Ok(())
}

fn init_config() -> Arc<BotConfig> {
    match Settings::new().and_then(Settings::validate) {
        Ok(config) => {
            info!("Configuration loaded successfully.");
            Arc::new(config)
        }
        Err(e) => {
            error!(
                "Failed to load configuration: {}. Make sure TELEGRAM_BOT_TOKEN, WEBAPP_URL and ADMIN_ID are set (e.g. in .env)",
                e
            );
            std::process::exit(1);
        }
    }
}
