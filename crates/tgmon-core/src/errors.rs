/// Core error type for the monitor.
///
/// Adapter crates map their specific errors into this type so the monitor can
/// tell fatal configuration problems apart from failures it recovers from.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("cannot resolve channel '{identifier}': {reason}")]
    ChannelResolution { identifier: String, reason: String },

    #[error("event handling error: {0}")]
    EventHandling(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    /// Configuration errors abort startup; everything else is handled locally.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
