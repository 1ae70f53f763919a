use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque resolved reference to a channel (Telegram peer id).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelHandle(pub i64);

/// Telegram message id (numeric, unique per channel).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub i32);

/// Operator-supplied channel identifier, normalised.
///
/// Accepts `name`, `@name` and `https://t.me/name`; the stored form is the bare name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelRef(String);

impl ChannelRef {
    /// Returns `None` for blank input.
    ///
    /// Links keep only the channel segment, so post links (`t.me/name/123`) and
    /// web previews (`t.me/s/name`) yield `name`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut s = raw.trim();
        for prefix in ["https://t.me/", "http://t.me/", "t.me/"] {
            if let Some(rest) = s.strip_prefix(prefix) {
                s = rest.strip_prefix("s/").unwrap_or(rest);
                break;
            }
        }
        let s = s.trim_start_matches('@');
        let s = s.split(['/', '?']).next().unwrap_or_default().trim();
        if s.is_empty() {
            return None;
        }
        Some(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A channel that was successfully looked up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedChannel {
    pub reference: ChannelRef,
    pub handle: ChannelHandle,
    pub title: String,
    pub username: Option<String>,
}

/// Kind of media attached to a message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Document,
    Sticker,
    Contact,
    Poll,
    Location,
    Other(String),
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Photo => f.write_str("Photo"),
            MediaKind::Document => f.write_str("Document"),
            MediaKind::Sticker => f.write_str("Sticker"),
            MediaKind::Contact => f.write_str("Contact"),
            MediaKind::Poll => f.write_str("Poll"),
            MediaKind::Location => f.write_str("Location"),
            MediaKind::Other(name) => f.write_str(name),
        }
    }
}

/// Channel identity as carried on an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub handle: ChannelHandle,
    pub title: String,
    pub username: Option<String>,
}

/// One arrived message, as delivered by the messaging client.
///
/// Everything except the id, channel and timestamp may be missing; consumers must
/// fall back instead of failing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessageEvent {
    pub id: MessageId,
    pub channel: ChannelInfo,
    pub sender: Option<String>,
    pub date: DateTime<Utc>,
    pub text: Option<String>,
    pub media: Option<MediaKind>,
    pub file_name: Option<String>,
    pub sticker: Option<String>,
    pub forwarded_from: Option<String>,
}

impl InboundMessageEvent {
    /// Text body if it carries anything besides whitespace.
    pub fn text_body(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}
