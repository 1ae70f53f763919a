use std::sync::Arc;

use teloxide::Bot;
use tokio_util::sync::CancellationToken;

use tgmon_core::{
    config::{Config, DEFAULT_CHANNELS},
    monitor::Monitor,
    ports::MessagingClient,
    registry::ChannelRegistry,
    shutdown,
    sink::{MessageLog, MessageSink},
    store::{ChannelStore, QueryStore},
};
use tgmon_mistral::MistralClient;
use tgmon_mtproto::MtprotoClient;
use tgmon_telegram::{router::AppState, TelegramNotifier};

#[tokio::main]
async fn main() -> Result<(), tgmon_core::Error> {
    tgmon_core::logging::init("tgmon")?;

    let cfg = Config::load()?;

    let channel_store = ChannelStore::new(
        cfg.channel_store_file.clone(),
        DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
    );
    let query_store = QueryStore::new(cfg.query_file.clone());

    let identifiers = match &cfg.channels_override {
        Some(list) => list.clone(),
        None => channel_store.list()?,
    };

    let client: Arc<dyn MessagingClient> = Arc::new(
        MtprotoClient::connect(&cfg.credentials, &cfg.session_file, cfg.phone.as_deref()).await?,
    );

    let log = MessageLog::new(cfg.log_file.clone(), cfg.log_json);
    tracing::info!(log_file = %log.path().display(), "message log");

    let mut monitor = Monitor::new(
        client,
        ChannelRegistry::new(cfg.lookup_interval),
        MessageSink::stdout(log),
        cfg.event_buffer,
    );

    if let Some(api_key) = cfg.mistral_api_key.as_deref().filter(|_| cfg.relevance_enabled()) {
        let filter = MistralClient::new(api_key, cfg.mistral_model.clone())?;
        tracing::info!(model = filter.model(), query = %query_store.get(), "relevance filter enabled");
        monitor = monitor.with_relevance_filter(Arc::new(filter), query_store.clone());
    }

    let bot = cfg.bot_token.as_deref().map(Bot::new);
    if let (Some(bot), Some(chat_id)) = (&bot, cfg.user_chat_id) {
        if cfg.notifications_enabled() {
            monitor = monitor.with_notifier(Arc::new(TelegramNotifier::new(bot.clone(), chat_id)));
        }
    }

    let shutdown_token = CancellationToken::new();
    shutdown::cancel_on_signal(shutdown_token.clone());

    let commands = bot.map(|bot| {
        let state = Arc::new(AppState {
            channels: channel_store.clone(),
            query: query_store.clone(),
            user_chat_id: cfg.user_chat_id,
        });
        let token = shutdown_token.clone();
        tokio::spawn(async move {
            if let Err(e) = tgmon_telegram::router::run_polling(bot, state, token).await {
                tracing::error!("command bot failed: {e}");
            }
        })
    });

    let outcome = monitor.run(&identifiers, shutdown_token.clone()).await;

    shutdown_token.cancel();
    if let Some(task) = commands {
        task.abort();
    }

    let stats = outcome?;
    println!(
        "\n👋 Monitoring stopped. {} printed, {} skipped, {} failed.",
        stats.printed, stats.skipped, stats.failed
    );
    Ok(())
}
