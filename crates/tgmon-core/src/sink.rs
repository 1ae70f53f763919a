use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::Serialize;

use crate::{
    domain::InboundMessageEvent,
    errors::Error,
    formatting::{media_label, message_text, sender_name, DATE_FORMAT},
    Result,
};

/// Structured form of a log entry (JSON mode).
#[derive(Clone, Debug, Serialize)]
pub struct LogEntry<'a> {
    pub timestamp: String,
    pub message_id: i32,
    pub channel_id: i64,
    pub channel: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<&'a str>,
    pub sender: &'a str,
    pub date: String,
    pub text: &'a str,
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sticker: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarded_from: Option<&'a str>,
}

impl<'a> LogEntry<'a> {
    pub fn from_event(event: &'a InboundMessageEvent) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            message_id: event.id.0,
            channel_id: event.channel.handle.0,
            channel: &event.channel.title,
            username: event.channel.username.as_deref(),
            sender: sender_name(event),
            date: event.date.format(DATE_FORMAT).to_string(),
            text: message_text(event),
            media_type: media_label(event),
            file_name: event.file_name.as_deref(),
            sticker: event.sticker.as_deref(),
            forwarded_from: event.forwarded_from.as_deref(),
        }
    }
}

/// Append-only message log.
///
/// The file is opened per write so every entry is on disk before the next event is
/// taken, even if the process dies afterwards.
#[derive(Clone, Debug)]
pub struct MessageLog {
    path: PathBuf,
    json: bool,
}

impl MessageLog {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, event: &InboundMessageEvent, block: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        if self.json {
            let line = serde_json::to_string(&LogEntry::from_event(event))?;
            writeln!(file, "{line}")?;
        } else {
            file.write_all(block.as_bytes())?;
            if !block.ends_with('\n') {
                file.write_all(b"\n")?;
            }
        }
        file.flush()?;
        Ok(())
    }
}

/// Console + log file sink for rendered message blocks.
pub struct MessageSink {
    console: Mutex<Box<dyn Write + Send>>,
    log: MessageLog,
}

impl MessageSink {
    pub fn new(console: Box<dyn Write + Send>, log: MessageLog) -> Self {
        Self {
            console: Mutex::new(console),
            log,
        }
    }

    pub fn stdout(log: MessageLog) -> Self {
        Self::new(Box::new(io::stdout()), log)
    }

    /// Print `text` to the console only.
    pub fn print(&self, text: &str) -> Result<()> {
        let mut console = self
            .console
            .lock()
            .map_err(|_| Error::EventHandling("console writer poisoned".to_string()))?;
        console.write_all(text.as_bytes())?;
        console.flush()?;
        Ok(())
    }

    /// Write the block to both sinks.
    ///
    /// The log write is attempted even when the console write fails; the first error
    /// is returned.
    pub fn write_block(&self, event: &InboundMessageEvent, block: &str) -> Result<()> {
        let console = self.print(&format!("\n{block}"));
        let log = self.log.append(event, block);
        console.and(log)
    }
}
