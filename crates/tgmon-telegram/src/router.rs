use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};
use tokio_util::sync::CancellationToken;

use tgmon_core::store::{ChannelStore, QueryStore};

use crate::handlers;

#[derive(Clone, Debug)]
pub struct AppState {
    pub channels: ChannelStore,
    pub query: QueryStore,
    /// Only this chat may issue commands; `None` accepts everyone.
    pub user_chat_id: Option<i64>,
}

impl AppState {
    pub fn is_authorized(&self, chat_id: i64) -> bool {
        self.user_chat_id.map_or(true, |allowed| allowed == chat_id)
    }
}

/// Long-poll the Bot API for operator commands until `shutdown` fires.
pub async fn run_polling(
    bot: Bot,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    match bot.get_me().await {
        Ok(me) => tracing::info!("command bot started: @{}", me.username()),
        Err(e) => return Err(anyhow::anyhow!("bot token rejected: {e}")),
    }
    if state.user_chat_id.is_none() {
        tracing::warn!("USER_CHAT_ID not set; bot commands are open to every chat");
    }

    let handler =
        dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build();

    tokio::select! {
        _ = dispatcher.dispatch() => {}
        _ = shutdown.cancelled() => {
            tracing::info!("command bot stopping");
        }
    }

    Ok(())
}
