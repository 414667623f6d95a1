mod config;
mod markdown;
mod openai;
mod prompt;
mod relay;
mod reporter;
mod telegram;

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::info;
use tracing_subscriber::prelude::*;

use config::Config;
use openai::Client as OpenAiClient;
use relay::Relay;
use reporter::ErrorReporter;
use telegram::{MessageReply, is_command};

struct BotState {
    relay: Relay<OpenAiClient>,
}

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Setup logging: stdout always, plus a file when LOG_DIR is set
    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive(tracing::Level::INFO.into()),
            ),
    );

    let _guard = if let Some(ref log_dir) = config.log_dir {
        std::fs::create_dir_all(log_dir).ok();
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_dir.join("svenskbot.log"))
            .expect("Failed to open log file");
        let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_filter(
                        tracing_subscriber::EnvFilter::from_default_env()
                            .add_directive(tracing::Level::INFO.into()),
                    ),
            )
            .init();
        Some(guard)
    } else {
        registry.init();
        None
    };

    info!("🚀 Starting svenskbot...");
    info!(
        "Model: {}, temperature: {:?}, soften_markdown: {}",
        config.model, config.temperature, config.soften_markdown
    );

    let bot = Bot::new(&config.telegram_bot_token);
    let api = OpenAiClient::new(config.openai_api_key.clone());
    let state = Arc::new(BotState {
        relay: Relay::new(
            api,
            config.model.clone(),
            config.temperature,
            config.soften_markdown,
        ),
    });

    // Commands never reach the relay; they are excluded at registration.
    let handler = Update::filter_message()
        .filter(|msg: Message| msg.text().is_some_and(|t| !is_command(t)))
        .endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .error_handler(Arc::new(ErrorReporter))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn handle_message(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    let sink = MessageReply::new(bot, &msg);
    state.relay.handle(&text, &sink).await;

    Ok(())
}
