//! Telegram user-client adapter (grammers / MTProto).
//!
//! Implements the `tgmon-core` `MessagingClient` port: channel lookup by username
//! and a filtered stream of new channel posts.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use grammers_client::{
    types::{Chat, Media, Message},
    Client, Config, InitParams, Update,
};
use grammers_session::Session;
use grammers_tl_types as tl;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tgmon_core::{
    config::Credentials,
    domain::{
        ChannelHandle, ChannelInfo, ChannelRef, InboundMessageEvent, MediaKind, MessageId,
        ResolvedChannel,
    },
    errors::Error,
    ports::MessagingClient,
    Result,
};

mod login;

pub struct MtprotoClient {
    client: Client,
    session_file: PathBuf,
}

impl MtprotoClient {
    /// Connect with `credentials`, reusing (or creating) the session at `session_file`.
    ///
    /// An unauthorized session is signed in interactively on stdin; the resulting
    /// session is saved so later runs skip that step.
    pub async fn connect(
        credentials: &Credentials,
        session_file: &Path,
        phone: Option<&str>,
    ) -> Result<Self> {
        let session = Session::load_file_or_create(session_file).map_err(|e| {
            Error::Config(format!(
                "cannot open session file {}: {e}",
                session_file.display()
            ))
        })?;

        tracing::info!("connecting to Telegram");
        let client = Client::connect(Config {
            session,
            api_id: credentials.api_id,
            api_hash: credentials.api_hash.clone(),
            params: InitParams {
                catch_up: false,
                ..Default::default()
            },
        })
        .await
        .map_err(|e| Error::External(format!("failed to connect to Telegram: {e}")))?;

        let this = Self {
            client,
            session_file: session_file.to_path_buf(),
        };

        let authorized = this
            .client
            .is_authorized()
            .await
            .map_err(|e| Error::External(format!("authorization check failed: {e}")))?;
        if !authorized {
            login::sign_in(&this.client, phone).await?;
            this.save_session()?;
        }

        match this.client.get_me().await {
            Ok(me) => tracing::info!(
                id = me.id(),
                username = me.username().unwrap_or("N/A"),
                "logged in"
            ),
            Err(e) => tracing::warn!("connected, but fetching own profile failed: {e}"),
        }

        Ok(this)
    }

    pub fn save_session(&self) -> Result<()> {
        self.client
            .session()
            .save_to_file(&self.session_file)
            .map_err(Error::Io)
    }
}

#[async_trait]
impl MessagingClient for MtprotoClient {
    async fn lookup_channel(&self, reference: &ChannelRef) -> Result<Option<ResolvedChannel>> {
        let chat = self
            .client
            .resolve_username(reference.as_str())
            .await
            .map_err(|e| Error::External(e.to_string()))?;

        Ok(chat.and_then(|chat| match chat {
            Chat::User(_) => None,
            other => Some(ResolvedChannel {
                reference: reference.clone(),
                handle: ChannelHandle(other.id()),
                title: other.name().to_string(),
                username: other.username().map(str::to_string),
            }),
        }))
    }

    async fn subscribe(
        &self,
        handles: &[ChannelHandle],
        events: mpsc::Sender<InboundMessageEvent>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        let watched: HashSet<i64> = handles.iter().map(|h| h.0).collect();

        let outcome = loop {
            let update = tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                update = self.client.next_update() => update,
            };

            let update = match update {
                Ok(update) => update,
                Err(e) => break Err(Error::External(format!("update stream failed: {e}"))),
            };

            let Update::NewMessage(message) = update else {
                continue;
            };
            if message.outgoing() || !watched.contains(&message.chat().id()) {
                continue;
            }

            if events.send(to_event(&message)).await.is_err() {
                break Ok(());
            }
        };

        if let Err(e) = self.save_session() {
            tracing::warn!("failed to save session: {e}");
        }
        outcome
    }
}

/// Fields pulled off a grammers message before normalisation.
struct RawMessage<'a> {
    id: i32,
    chat_id: i64,
    chat_title: &'a str,
    chat_username: Option<&'a str>,
    sender: Option<(&'a str, Option<&'a str>)>,
    date: chrono::DateTime<chrono::Utc>,
    text: &'a str,
    media: Option<MediaKind>,
    file_name: Option<&'a str>,
    sticker: Option<&'a str>,
    forwarded_from: Option<String>,
}

fn to_event(message: &Message) -> InboundMessageEvent {
    let chat = message.chat();
    let sender = message.sender();
    let media = message.media();

    build_event(RawMessage {
        id: message.id(),
        chat_id: chat.id(),
        chat_title: chat.name(),
        chat_username: chat.username(),
        sender: sender.as_ref().map(|s| (s.name(), s.username())),
        date: message.date(),
        text: message.text(),
        media: media.as_ref().map(media_kind),
        file_name: match &media {
            Some(Media::Document(doc)) => Some(doc.name()),
            _ => None,
        },
        sticker: match &media {
            Some(Media::Sticker(sticker)) => Some(sticker.emoji()),
            _ => None,
        },
        forwarded_from: message.forward_header().and_then(|header| match header {
            tl::enums::MessageFwdHeader::Header(h) => h.from_name,
        }),
    })
}

fn build_event(raw: RawMessage<'_>) -> InboundMessageEvent {
    InboundMessageEvent {
        id: MessageId(raw.id),
        channel: ChannelInfo {
            handle: ChannelHandle(raw.chat_id),
            title: raw.chat_title.to_string(),
            username: non_empty(raw.chat_username),
        },
        sender: raw
            .sender
            .and_then(|(name, username)| sender_label(name, username)),
        date: raw.date,
        text: Some(raw.text)
            .filter(|t| !t.trim().is_empty())
            .map(str::to_string),
        media: raw.media,
        file_name: non_empty(raw.file_name),
        sticker: non_empty(raw.sticker),
        forwarded_from: raw.forwarded_from.filter(|f| !f.trim().is_empty()),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn media_kind(media: &Media) -> MediaKind {
    match media {
        Media::Photo(_) => MediaKind::Photo,
        Media::Document(_) => MediaKind::Document,
        Media::Sticker(_) => MediaKind::Sticker,
        Media::Contact(_) => MediaKind::Contact,
        Media::Poll(_) => MediaKind::Poll,
        Media::Geo(_) => MediaKind::Location,
        _ => MediaKind::Other("Media".to_string()),
    }
}

/// Display name for a sender: its name, else `@username`, else nothing.
fn sender_label(name: &str, username: Option<&str>) -> Option<String> {
    let name = name.trim();
    if !name.is_empty() {
        return Some(name.to_string());
    }
    username
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(|u| format!("@{u}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;

    fn raw<'a>() -> RawMessage<'a> {
        RawMessage {
            id: 12345,
            chat_id: 1005640892,
            chat_title: "Telegram",
            chat_username: Some("telegram"),
            sender: Some(("Telegram", Some("telegram"))),
            date: chrono::Utc.with_ymd_and_hms(2025, 10, 13, 14, 30, 45).unwrap(),
            text: "Welcome to Telegram!",
            media: None,
            file_name: None,
            sticker: None,
            forwarded_from: None,
        }
    }

    #[test]
    fn builds_event_from_text_post() {
        let ev = build_event(raw());
        assert_eq!(ev.id, MessageId(12345));
        assert_eq!(ev.channel.handle, ChannelHandle(1005640892));
        assert_eq!(ev.channel.title, "Telegram");
        assert_eq!(ev.channel.username.as_deref(), Some("telegram"));
        assert_eq!(ev.sender.as_deref(), Some("Telegram"));
        assert_eq!(ev.text.as_deref(), Some("Welcome to Telegram!"));
        assert_eq!(ev.media, None);
    }

    #[test]
    fn blank_fields_become_absent() {
        let ev = build_event(RawMessage {
            chat_username: Some(""),
            sender: None,
            text: "",
            media: Some(MediaKind::Sticker),
            sticker: Some("🔥"),
            file_name: Some(" "),
            forwarded_from: Some("  ".to_string()),
            ..raw()
        });
        assert_eq!(ev.channel.username, None);
        assert_eq!(ev.sender, None);
        assert_eq!(ev.text, None);
        assert_eq!(ev.media, Some(MediaKind::Sticker));
        assert_eq!(ev.sticker.as_deref(), Some("🔥"));
        assert_eq!(ev.file_name, None);
        assert_eq!(ev.forwarded_from, None);
    }

    #[test]
    fn document_and_forward_details_are_kept() {
        let ev = build_event(RawMessage {
            media: Some(MediaKind::Document),
            file_name: Some("report.pdf"),
            forwarded_from: Some("Newsroom".to_string()),
            ..raw()
        });
        assert_eq!(ev.file_name.as_deref(), Some("report.pdf"));
        assert_eq!(ev.forwarded_from.as_deref(), Some("Newsroom"));
    }

    #[test]
    fn sender_label_prefers_name_then_username() {
        assert_eq!(sender_label("Pavel", Some("durov")).as_deref(), Some("Pavel"));
        assert_eq!(sender_label("  ", Some("durov")).as_deref(), Some("@durov"));
        assert_eq!(sender_label("", None), None);
        assert_eq!(sender_label("", Some(" ")), None);
    }
}
