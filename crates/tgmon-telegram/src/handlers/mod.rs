//! Telegram update handlers.
//!
//! Every message is checked against `USER_CHAT_ID` before any command runs.

use std::sync::Arc;

use teloxide::{prelude::*, types::Message};

use crate::router::AppState;

mod commands;

pub use commands::{execute, parse_command};

pub async fn handle_message(bot: Bot, msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let chat_id = msg.chat.id.0;

    if !state.is_authorized(chat_id) {
        tracing::warn!(chat_id, "ignoring message from unauthorized chat");
        let _ = bot
            .send_message(
                msg.chat.id,
                "Unauthorized. Contact the bot owner for access.",
            )
            .await;
        return Ok(());
    }

    match msg.text() {
        Some(text) if text.starts_with('/') => commands::handle_command(bot, msg, state).await,
        Some(_) => {
            let _ = bot
                .send_message(msg.chat.id, "Send /help to see the available commands.")
                .await;
            Ok(())
        }
        None => Ok(()),
    }
}
