//! Telegram bot adapter (teloxide).
//!
//! Implements the `tgmon-core` `Notifier` port over the Bot API and hosts the
//! operator command dispatcher (see [`router`]).

use async_trait::async_trait;

use teloxide::{
    prelude::*,
    types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode},
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use tgmon_core::{
    errors::Error,
    formatting::{message_link, render_notification_html},
    ports::{Notifier, RelevantMessage},
    Result,
};

const LINK_BUTTON_LABEL: &str = "🔗 Open Original Message";

#[derive(Clone)]
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: teloxide::types::ChatId,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: teloxide::types::ChatId(chat_id),
        }
    }

    fn map_err(e: teloxide::RequestError) -> Error {
        Error::External(format!("telegram error: {e}"))
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, teloxide::RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    teloxide::RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

fn link_keyboard(link: Option<String>) -> Option<InlineKeyboardMarkup> {
    let url = reqwest::Url::parse(&link?).ok()?;
    Some(InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::url(LINK_BUTTON_LABEL, url),
    ]]))
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, message: &RelevantMessage) -> Result<()> {
        let html = render_notification_html(&message.event, message.query.as_deref());
        let keyboard = link_keyboard(message_link(&message.event));

        self.with_retry(|| {
            let req = self
                .bot
                .send_message(self.chat_id, html.clone())
                .parse_mode(ParseMode::Html)
                .disable_web_page_preview(true);
            match keyboard.clone() {
                Some(markup) => req.reply_markup(markup),
                None => req,
            }
        })
        .await?;

        tracing::info!(
            chat_id = self.chat_id.0,
            message_id = message.event.id.0,
            "notification sent"
        );
        Ok(())
    }
}
