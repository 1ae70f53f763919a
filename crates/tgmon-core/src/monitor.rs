//! The monitoring loop: resolve channels, hand events from the client to a single
//! consumer, and push each one through filter → render → sinks → notifier.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    domain::InboundMessageEvent,
    formatting::{render_channel_info, render_message, summary_line, FilterNote},
    ports::{MessagingClient, Notifier, RelevanceFilter, RelevantMessage},
    registry::{ChannelRegistry, ChannelSet},
    sink::MessageSink,
    store::QueryStore,
    Result,
};

/// Text handed to the relevance filter when a message has no body.
const NON_TEXT_PLACEHOLDER: &str = "[Non-text content]";

/// What happened to a single event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Rendered and written to both sinks.
    Printed,
    /// Dropped by the relevance filter.
    Skipped,
    /// Rendered, but at least one sink write failed.
    Failed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub printed: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Events for chats outside the resolved set.
    pub ignored: u64,
}

impl MonitorStats {
    fn record(&mut self, d: Delivery) {
        match d {
            Delivery::Printed => self.printed += 1,
            Delivery::Skipped => self.skipped += 1,
            Delivery::Failed => self.failed += 1,
        }
    }
}

pub struct Monitor {
    client: Arc<dyn MessagingClient>,
    registry: ChannelRegistry,
    sink: MessageSink,
    event_buffer: usize,
    relevance: Option<(Arc<dyn RelevanceFilter>, QueryStore)>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl Monitor {
    pub fn new(
        client: Arc<dyn MessagingClient>,
        registry: ChannelRegistry,
        sink: MessageSink,
        event_buffer: usize,
    ) -> Self {
        Self {
            client,
            registry,
            sink,
            event_buffer: event_buffer.max(1),
            relevance: None,
            notifier: None,
        }
    }

    pub fn with_relevance_filter(
        mut self,
        filter: Arc<dyn RelevanceFilter>,
        queries: QueryStore,
    ) -> Self {
        self.relevance = Some((filter, queries));
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Resolve `identifiers` and print a summary of what will be watched.
    pub async fn start(&self, identifiers: &[String]) -> Result<ChannelSet> {
        let _ = self.sink.print(&format!(
            "\n🔗 Adding {} channels to monitoring...\n",
            identifiers.len()
        ));

        let channels = self.registry.resolve(self.client.as_ref(), identifiers).await?;

        let _ = self.sink.print(&format!(
            "✅ Successfully added {} channels to monitoring\n",
            channels.len()
        ));
        for failure in &channels.failures {
            let _ = self.sink.print(&format!("❌ {failure}\n"));
        }
        for channel in &channels.channels {
            let _ = self.sink.print(&format!("\n{}", render_channel_info(channel)));
        }

        Ok(channels)
    }

    /// Run until `shutdown` fires or the client's subscription ends.
    ///
    /// Shutdown is honoured during channel resolution too. Events already queued
    /// when the subscription stops are still processed.
    pub async fn run(
        &self,
        identifiers: &[String],
        shutdown: CancellationToken,
    ) -> Result<MonitorStats> {
        let channels = tokio::select! {
            started = self.start(identifiers) => started?,
            _ = shutdown.cancelled() => {
                tracing::info!("shutdown requested while resolving channels");
                return Ok(MonitorStats::default());
            }
        };
        let handles = channels.handles();

        let _ = self.sink.print(&format!(
            "\n👂 Monitoring {} channels for new messages...\nPress Ctrl+C to stop monitoring\n",
            channels.len()
        ));

        let (tx, mut rx) = mpsc::channel::<InboundMessageEvent>(self.event_buffer);
        let producer = self.client.subscribe(&handles, tx, shutdown.clone());
        let consumer = async {
            let mut stats = MonitorStats::default();
            while let Some(event) = rx.recv().await {
                if !channels.contains(event.channel.handle) {
                    tracing::debug!(
                        chat = event.channel.handle.0,
                        "ignoring message from unmonitored chat"
                    );
                    stats.ignored += 1;
                    continue;
                }
                stats.record(self.on_message(&event).await);
            }
            stats
        };

        let (subscription, stats) = tokio::join!(producer, consumer);
        tracing::info!(
            printed = stats.printed,
            skipped = stats.skipped,
            failed = stats.failed,
            ignored = stats.ignored,
            "monitoring stopped"
        );
        subscription?;
        Ok(stats)
    }

    /// Handle one event. Never fails: every error is logged and swallowed so the
    /// subscription keeps going.
    pub async fn on_message(&self, event: &InboundMessageEvent) -> Delivery {
        let query = match &self.relevance {
            Some((filter, queries)) => {
                let query = queries.get();
                let text = event.text_body().unwrap_or(NON_TEXT_PLACEHOLDER);
                match filter.is_relevant(text, &query).await {
                    Ok(true) => {
                        tracing::info!(id = event.id.0, "message is relevant to query");
                        Some(query)
                    }
                    Ok(false) => {
                        tracing::info!(id = event.id.0, "message not relevant to query, skipping");
                        return Delivery::Skipped;
                    }
                    Err(e) => {
                        tracing::warn!("relevance check failed, showing message: {e}");
                        Some(query)
                    }
                }
            }
            None => None,
        };

        let note = query.as_deref().map(|q| FilterNote { query: q });
        let block = render_message(event, note.as_ref());

        let delivery = match self.sink.write_block(event, &block) {
            Ok(()) => Delivery::Printed,
            Err(e) => {
                tracing::error!(id = event.id.0, "failed to write message: {e}");
                Delivery::Failed
            }
        };
        tracing::info!("{}", summary_line(event));

        if let Some(notifier) = &self.notifier {
            let relevant = RelevantMessage {
                event: event.clone(),
                query,
            };
            match notifier.notify(&relevant).await {
                Ok(()) => tracing::info!(id = event.id.0, "message forwarded via bot"),
                Err(e) => tracing::error!(id = event.id.0, "failed to forward message: {e}"),
            }
        }

        delivery
    }
}
