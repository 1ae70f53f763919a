use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::{ChannelHandle, ChannelRef, InboundMessageEvent, ResolvedChannel},
    Result,
};

/// Hexagonal port for the Telegram user client.
///
/// Connecting and authenticating happen in the adapter's constructor; by the time a
/// value of this trait exists, it is a live session.
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Look up a public channel by name.
    ///
    /// `Ok(None)` means the name does not exist or is not a channel; `Err` means the
    /// lookup itself failed (private, banned, flood wait, network).
    async fn lookup_channel(&self, reference: &ChannelRef) -> Result<Option<ResolvedChannel>>;

    /// Deliver new messages posted to `handles` into `events` until `shutdown` fires
    /// or the connection is lost.
    ///
    /// Returns `Ok(())` on shutdown or when the receiving side is gone.
    async fn subscribe(
        &self,
        handles: &[ChannelHandle],
        events: mpsc::Sender<InboundMessageEvent>,
        shutdown: CancellationToken,
    ) -> Result<()>;
}

/// Decides whether a message matches the operator's query.
#[async_trait]
pub trait RelevanceFilter: Send + Sync {
    async fn is_relevant(&self, text: &str, query: &str) -> Result<bool>;
}

/// A message that passed filtering, with the query it matched.
#[derive(Clone, Debug)]
pub struct RelevantMessage {
    pub event: InboundMessageEvent,
    pub query: Option<String>,
}

/// Forwards relevant messages somewhere the operator will see them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &RelevantMessage) -> Result<()>;
}
