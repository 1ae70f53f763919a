use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Channels watched when neither `MONITOR_CHANNELS` nor the channel store say otherwise.
pub const DEFAULT_CHANNELS: &[&str] = &["durov", "telegram"];

/// MTProto application credentials (from my.telegram.org).
#[derive(Clone)]
pub struct Credentials {
    pub api_id: i32,
    pub api_hash: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &"<redacted>")
            .finish()
    }
}

/// Typed configuration for the monitor.
#[derive(Clone, Debug)]
pub struct Config {
    // Telegram user client
    pub credentials: Credentials,
    pub session_file: PathBuf,
    pub phone: Option<String>,

    // Channels
    pub channels_override: Option<Vec<String>>,
    pub channel_store_file: PathBuf,
    pub lookup_interval: Duration,

    // Output
    pub log_file: PathBuf,
    pub log_json: bool,
    pub event_buffer: usize,

    // Relevance filter
    pub query_file: PathBuf,
    pub mistral_api_key: Option<String>,
    pub mistral_model: String,

    // Bot notifications / commands
    pub bot_token: Option<String>,
    pub user_chat_id: Option<i64>,
}

impl Config {
    /// Load from the process environment, after merging `.env` if present.
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let lookup = |keys: &[&str]| keys.iter().find_map(|k| get(*k).and_then(non_empty));

        // Required credentials
        let raw_id = lookup(&["TELEGRAM_API_ID", "api_id"]).ok_or_else(|| {
            Error::Config("TELEGRAM_API_ID (or api_id) environment variable is required".into())
        })?;
        let api_id = raw_id.trim().parse::<i32>().map_err(|_| {
            Error::Config(format!("TELEGRAM_API_ID must be numeric, got '{raw_id}'"))
        })?;
        let api_hash = lookup(&["TELEGRAM_API_HASH", "api_hash"]).ok_or_else(|| {
            Error::Config("TELEGRAM_API_HASH (or api_hash) environment variable is required".into())
        })?;

        let session_file = lookup(&["TELEGRAM_SESSION_FILE"])
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("telegram_session.session"));
        let phone = lookup(&["TELEGRAM_PHONE"]);

        // Channels
        let channels_override = lookup(&["MONITOR_CHANNELS"]).map(|s| parse_csv(&s));
        if matches!(&channels_override, Some(list) if list.is_empty()) {
            return Err(Error::Config(
                "MONITOR_CHANNELS is set but lists no channels".to_string(),
            ));
        }
        let channel_store_file = lookup(&["CHANNEL_STORE_FILE"])
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("monitored_channels.json"));
        let lookup_interval = Duration::from_millis(
            parse_num(lookup(&["LOOKUP_INTERVAL_MS"]), "LOOKUP_INTERVAL_MS")?.unwrap_or(500),
        );

        // Output
        let log_file = lookup(&["MONITOR_LOG_FILE"])
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("telegram_monitor.log"));
        let log_json = lookup(&["MONITOR_LOG_JSON"])
            .map(|s| parse_bool(&s))
            .unwrap_or(false);
        let event_buffer =
            parse_num::<usize>(lookup(&["EVENT_BUFFER"]), "EVENT_BUFFER")?.unwrap_or(64);
        if event_buffer == 0 {
            return Err(Error::Config(
                "EVENT_BUFFER must be greater than 0".to_string(),
            ));
        }

        // Relevance filter
        let query_file = lookup(&["QUERY_FILE"])
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("user_query.json"));
        let mistral_api_key = lookup(&["MISTRAL_API_KEY"]);
        let mistral_model =
            lookup(&["MISTRAL_MODEL"]).unwrap_or_else(|| "mistral-small-latest".to_string());

        // Bot
        let bot_token = lookup(&["BOT_TOKEN", "TELEGRAM_BOT_TOKEN"]);
        let user_chat_id = parse_num::<i64>(lookup(&["USER_CHAT_ID"]), "USER_CHAT_ID")?;

        Ok(Self {
            credentials: Credentials { api_id, api_hash },
            session_file,
            phone,
            channels_override,
            channel_store_file,
            lookup_interval,
            log_file,
            log_json,
            event_buffer,
            query_file,
            mistral_api_key,
            mistral_model,
            bot_token,
            user_chat_id,
        })
    }

    pub fn relevance_enabled(&self) -> bool {
        self.mistral_api_key.is_some()
    }

    /// Notifications need both a bot and somewhere to send to.
    pub fn notifications_enabled(&self) -> bool {
        self.bot_token.is_some() && self.user_chat_id.is_some()
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn parse_bool(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_num<T: std::str::FromStr>(v: Option<String>, key: &str) -> Result<Option<T>> {
    let Some(v) = v else {
        return Ok(None);
    };
    v.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} must be a number, got '{v}'")))
}

fn parse_csv(v: &str) -> Vec<String> {
    v.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
