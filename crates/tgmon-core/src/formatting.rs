//! Text rendering for console/log blocks and Telegram HTML notifications.
//!
//! Everything here is pure: the same input always renders to the same bytes.

use std::fmt::Write as _;

use crate::domain::{InboundMessageEvent, ResolvedChannel};

pub const SEPARATOR_WIDTH: usize = 70;
pub const UNKNOWN_SENDER: &str = "Unknown";
pub const NO_TEXT_MARKER: &str = "[Media/File/Sticker/Other content]";
pub const NO_MEDIA: &str = "None";
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Filter outcome shown under a message block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterNote<'a> {
    pub query: &'a str,
}

pub fn separator() -> String {
    "=".repeat(SEPARATOR_WIDTH)
}

/// Render one event as the bordered console/log block.
pub fn render_message(event: &InboundMessageEvent, filter: Option<&FilterNote<'_>>) -> String {
    let sep = separator();
    let mut out = String::new();

    let _ = writeln!(out, "{sep}");
    let _ = writeln!(out, "📢 NEW MESSAGE FROM CHANNEL");
    let _ = writeln!(out, "{sep}");
    let _ = writeln!(out, "Channel: {}", display_title(event));
    if let Some(username) = non_blank(event.channel.username.as_deref()) {
        let _ = writeln!(out, "Username: @{username}");
    }
    let _ = writeln!(out, "Sender: {}", sender_name(event));
    let _ = writeln!(out, "Date: {}", event.date.format(DATE_FORMAT));
    let _ = writeln!(out, "Message ID: {}", event.id.0);
    let _ = writeln!(out, "Text: {}", message_text(event));
    let _ = writeln!(out, "Media Type: {}", media_label(event));
    if let Some(name) = non_blank(event.file_name.as_deref()) {
        let _ = writeln!(out, "File Name: {name}");
    }
    if let Some(emoji) = non_blank(event.sticker.as_deref()) {
        let _ = writeln!(out, "Sticker: {emoji}");
    }
    if let Some(from) = non_blank(event.forwarded_from.as_deref()) {
        let _ = writeln!(out, "Forwarded from: {from}");
    }

    if let Some(note) = filter {
        let rule = "-".repeat(50);
        let _ = writeln!(out, "{sep}");
        let _ = writeln!(out, "🎯 RELEVANCE FILTER");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Query: {}", note.query);
        let _ = writeln!(out, "Status: ✅ RELEVANT - message passed the filter");
        let _ = writeln!(out, "{rule}");
    }

    let _ = writeln!(out, "{sep}");
    out
}

/// Summary block printed once per channel after resolution.
pub fn render_channel_info(channel: &ResolvedChannel) -> String {
    let username = channel
        .username
        .as_deref()
        .map(|u| format!("@{u}"))
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "📊 CHANNEL INFO: @{}\nTitle: {}\nID: {}\nUsername: {username}\n",
        channel.reference, channel.title, channel.handle.0
    )
}

/// One-line summary for the diagnostic log.
pub fn summary_line(event: &InboundMessageEvent) -> String {
    let username = non_blank(event.channel.username.as_deref()).unwrap_or("N/A");
    format!(
        "New message from {} (@{username}): {}",
        display_title(event),
        truncate_text(message_text(event), 100)
    )
}

/// Public link to the original post, if one can be built.
///
/// Public channels link by username; others use the `t.me/c/` form, which only works
/// for members.
pub fn message_link(event: &InboundMessageEvent) -> Option<String> {
    if let Some(username) = non_blank(event.channel.username.as_deref()) {
        return Some(format!("https://t.me/{username}/{}", event.id.0));
    }
    let raw = event.channel.handle.0.to_string();
    let id = raw.strip_prefix("-100").unwrap_or(raw.trim_start_matches('-'));
    if id.is_empty() {
        return None;
    }
    Some(format!("https://t.me/c/{id}/{}", event.id.0))
}

/// Telegram HTML body for a forwarded notification.
pub fn render_notification_html(event: &InboundMessageEvent, query: Option<&str>) -> String {
    let mut out = String::from("🎯 <b>RELEVANT MESSAGE FOUND</b>\n\n");
    let _ = writeln!(out, "<b>Channel:</b> {}", escape_html(display_title(event)));
    if let Some(username) = non_blank(event.channel.username.as_deref()) {
        let _ = writeln!(out, "<b>Username:</b> @{}", escape_html(username));
    }
    let _ = writeln!(out, "<b>Sender:</b> {}", escape_html(sender_name(event)));
    let _ = writeln!(out, "<b>Date:</b> {}", event.date.format(DATE_FORMAT));
    if let Some(q) = query {
        let _ = writeln!(out, "<b>Query:</b> {}", escape_html(q));
    }
    out.push('\n');
    if let Some(link) = message_link(event) {
        let _ = writeln!(
            out,
            "🔗 <a href=\"{}\">Click to view original message</a>\n",
            escape_html(&link)
        );
    }
    let _ = write!(out, "<b>Message:</b>\n{}", escape_html(message_text(event)));
    out
}

pub fn display_title(event: &InboundMessageEvent) -> &str {
    non_blank(Some(event.channel.title.as_str()))
        .or_else(|| non_blank(event.channel.username.as_deref()))
        .unwrap_or("Unknown Channel")
}

pub fn sender_name(event: &InboundMessageEvent) -> &str {
    non_blank(event.sender.as_deref()).unwrap_or(UNKNOWN_SENDER)
}

pub fn message_text(event: &InboundMessageEvent) -> &str {
    event.text_body().unwrap_or(NO_TEXT_MARKER)
}

pub fn media_label(event: &InboundMessageEvent) -> String {
    event
        .media
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| NO_MEDIA.to_string())
}

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn truncate_text(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out = s.chars().take(max_chars).collect::<String>();
    out.push_str("...");
    out
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::{ChannelHandle, ChannelInfo, ChannelRef, MediaKind, MessageId};

    fn welcome() -> InboundMessageEvent {
        InboundMessageEvent {
            id: MessageId(12345),
            channel: ChannelInfo {
                handle: ChannelHandle(1005640892),
                title: "Telegram".to_string(),
                username: Some("telegram".to_string()),
            },
            sender: Some("Telegram".to_string()),
            date: Utc.with_ymd_and_hms(2025, 10, 13, 14, 30, 45).unwrap(),
            text: Some("Welcome to Telegram!".to_string()),
            media: None,
            file_name: None,
            sticker: None,
            forwarded_from: None,
        }
    }

    #[test]
    fn renders_welcome_message_block() {
        let block = render_message(&welcome(), None);
        let lines: Vec<&str> = block.lines().collect();

        for expected in [
            "Channel: Telegram",
            "Username: @telegram",
            "Sender: Telegram",
            "Date: 2025-10-13 14:30:45",
            "Message ID: 12345",
            "Text: Welcome to Telegram!",
            "Media Type: None",
        ] {
            assert!(lines.contains(&expected), "missing line {expected:?}");
        }

        let sep = "=".repeat(SEPARATOR_WIDTH);
        assert_eq!(lines.first(), Some(&sep.as_str()));
        assert_eq!(lines.last(), Some(&sep.as_str()));
    }

    #[test]
    fn missing_sender_uses_fallback() {
        let mut ev = welcome();
        ev.sender = None;
        let block = render_message(&ev, None);
        assert!(block.contains("Sender: Unknown\n"));
    }

    #[test]
    fn missing_text_with_media_shows_marker_and_kind() {
        let mut ev = welcome();
        ev.text = None;
        ev.media = Some(MediaKind::Photo);
        let block = render_message(&ev, None);
        assert!(block.contains(&format!("Text: {NO_TEXT_MARKER}\n")));
        assert!(block.contains("Media Type: Photo\n"));

        ev.text = Some("   ".to_string());
        assert!(render_message(&ev, None).contains(NO_TEXT_MARKER));
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut ev = welcome();
        ev.file_name = Some("report.pdf".to_string());
        ev.media = Some(MediaKind::Document);
        let note = FilterNote { query: "reports" };
        assert_eq!(
            render_message(&ev, Some(&note)),
            render_message(&ev, Some(&note))
        );
    }

    #[test]
    fn optional_lines_only_when_present() {
        let mut ev = welcome();
        ev.channel.username = None;
        let block = render_message(&ev, None);
        assert!(!block.contains("Username:"));
        assert!(!block.contains("File Name:"));
        assert!(!block.contains("Forwarded from:"));

        ev.forwarded_from = Some("Someone".to_string());
        ev.sticker = Some("🔥".to_string());
        let block = render_message(&ev, None);
        assert!(block.contains("Forwarded from: Someone\n"));
        assert!(block.contains("Sticker: 🔥\n"));
    }

    #[test]
    fn filter_note_is_inside_the_block() {
        let note = FilterNote { query: "news" };
        let block = render_message(&welcome(), Some(&note));
        assert!(block.contains("Query: news\n"));
        assert!(block.ends_with(&format!("{}\n", separator())));
    }

    #[test]
    fn links_public_and_private_channels() {
        let ev = welcome();
        assert_eq!(
            message_link(&ev).as_deref(),
            Some("https://t.me/telegram/12345")
        );

        let mut private = welcome();
        private.channel.username = None;
        private.channel.handle = ChannelHandle(-1001234567890);
        assert_eq!(
            message_link(&private).as_deref(),
            Some("https://t.me/c/1234567890/12345")
        );
    }

    #[test]
    fn notification_escapes_html() {
        let mut ev = welcome();
        ev.text = Some("<b>x</b> & y".to_string());
        let html = render_notification_html(&ev, Some("a<b"));
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt; &amp; y"));
        assert!(html.contains("<b>Query:</b> a&lt;b"));
        assert!(html.contains("https://t.me/telegram/12345"));
    }

    #[test]
    fn summary_truncates_long_text() {
        let mut ev = welcome();
        ev.text = Some("x".repeat(150));
        let line = summary_line(&ev);
        assert!(line.starts_with("New message from Telegram (@telegram): "));
        assert!(line.ends_with("..."));
    }

    #[test]
    fn channel_info_block() {
        let info = render_channel_info(&ResolvedChannel {
            reference: ChannelRef::parse("durov").unwrap(),
            handle: ChannelHandle(42),
            title: "Durov's Channel".to_string(),
            username: None,
        });
        assert!(info.contains("ID: 42\n"));
        assert!(info.contains("Username: N/A\n"));
    }

    #[test]
    fn escapes_html() {
        let s = r#"<a href="x&y">"#;
        assert_eq!(escape_html(s), "&lt;a href=&quot;x&amp;y&quot;&gt;");
    }
}
