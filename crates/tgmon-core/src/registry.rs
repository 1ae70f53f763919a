//! Channel registry: turns operator-supplied names into subscribable handles.
//!
//! A bad entry never sinks the whole list; it is reported and skipped. Only an
//! empty input or a list where nothing resolves is a configuration error.

use std::{collections::HashSet, time::Duration};

use tokio::time::sleep;

use crate::{
    domain::{ChannelHandle, ChannelRef, ResolvedChannel},
    errors::Error,
    ports::MessagingClient,
    Result,
};

/// Outcome of resolving a list of identifiers.
#[derive(Debug, Default)]
pub struct ChannelSet {
    pub channels: Vec<ResolvedChannel>,
    /// One `Error::ChannelResolution` per identifier that was dropped.
    pub failures: Vec<Error>,
}

impl ChannelSet {
    pub fn handles(&self) -> Vec<ChannelHandle> {
        self.channels.iter().map(|c| c.handle).collect()
    }

    pub fn contains(&self, handle: ChannelHandle) -> bool {
        self.channels.iter().any(|c| c.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

pub struct ChannelRegistry {
    lookup_interval: Duration,
}

impl ChannelRegistry {
    pub fn new(lookup_interval: Duration) -> Self {
        Self { lookup_interval }
    }

    /// Resolve `identifiers` in order. Duplicates (by name or by handle) collapse.
    pub async fn resolve(
        &self,
        client: &dyn MessagingClient,
        identifiers: &[String],
    ) -> Result<ChannelSet> {
        let mut seen = HashSet::new();
        let refs: Vec<ChannelRef> = identifiers
            .iter()
            .filter_map(|raw| ChannelRef::parse(raw))
            .filter(|r| seen.insert(r.as_str().to_lowercase()))
            .collect();

        if refs.is_empty() {
            return Err(Error::Config("no channels configured to monitor".to_string()));
        }

        let mut set = ChannelSet::default();
        for (idx, reference) in refs.iter().enumerate() {
            if idx > 0 && !self.lookup_interval.is_zero() {
                sleep(self.lookup_interval).await;
            }

            match client.lookup_channel(reference).await {
                Ok(Some(channel)) => {
                    if set.contains(channel.handle) {
                        tracing::debug!(channel = %reference, "duplicate channel handle, skipping");
                        continue;
                    }
                    tracing::info!(
                        channel = %reference,
                        id = channel.handle.0,
                        "added channel to monitoring"
                    );
                    set.channels.push(channel);
                }
                Ok(None) => {
                    let err = Error::ChannelResolution {
                        identifier: reference.to_string(),
                        reason: "channel not found".to_string(),
                    };
                    tracing::warn!("{err}");
                    set.failures.push(err);
                }
                Err(e) => {
                    let err = Error::ChannelResolution {
                        identifier: reference.to_string(),
                        reason: e.to_string(),
                    };
                    tracing::warn!("{err}");
                    set.failures.push(err);
                }
            }
        }

        if set.is_empty() {
            return Err(Error::Config(format!(
                "none of the {} configured channels could be resolved",
                refs.len()
            )));
        }

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Mutex};

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::domain::InboundMessageEvent;

    #[derive(Default)]
    struct FakeClient {
        known: HashMap<String, i64>,
        broken: Vec<String>,
        lookups: Mutex<Vec<String>>,
    }

    impl FakeClient {
        fn with(known: &[(&str, i64)], broken: &[&str]) -> Self {
            Self {
                known: known.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                broken: broken.iter().map(|s| s.to_string()).collect(),
                lookups: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MessagingClient for FakeClient {
        async fn lookup_channel(&self, reference: &ChannelRef) -> Result<Option<ResolvedChannel>> {
            let name = reference.as_str().to_string();
            self.lookups.lock().unwrap().push(name.clone());
            if self.broken.contains(&name) {
                return Err(Error::External("CHANNEL_PRIVATE".to_string()));
            }
            Ok(self.known.get(&name).map(|id| ResolvedChannel {
                reference: reference.clone(),
                handle: ChannelHandle(*id),
                title: name.to_uppercase(),
                username: Some(name.clone()),
            }))
        }

        async fn subscribe(
            &self,
            _handles: &[ChannelHandle],
            _events: mpsc::Sender<InboundMessageEvent>,
            _shutdown: CancellationToken,
        ) -> Result<()> {
            Ok(())
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn keeps_valid_subset_and_reports_invalid() {
        let client = FakeClient::with(&[("durov", 1), ("telegram", 2)], &["secret"]);
        let registry = ChannelRegistry::new(Duration::ZERO);

        let set = registry
            .resolve(&client, &ids(&["@durov", "nope", "secret", "telegram"]))
            .await
            .unwrap();

        assert_eq!(set.handles(), vec![ChannelHandle(1), ChannelHandle(2)]);
        assert_eq!(set.failures.len(), 2);
        assert!(set
            .failures
            .iter()
            .all(|e| matches!(e, Error::ChannelResolution { .. })));
        let reported: Vec<String> = set
            .failures
            .iter()
            .filter_map(|e| match e {
                Error::ChannelResolution { identifier, .. } => Some(identifier.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(reported, vec!["nope".to_string(), "secret".to_string()]);
    }

    #[tokio::test]
    async fn empty_list_is_configuration_error() {
        let client = FakeClient::default();
        let registry = ChannelRegistry::new(Duration::ZERO);

        let err = registry.resolve(&client, &[]).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = registry.resolve(&client, &ids(&["  ", "@"])).await.unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(client.lookups.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn nothing_resolved_is_configuration_error() {
        let client = FakeClient::with(&[], &["secret"]);
        let registry = ChannelRegistry::new(Duration::ZERO);

        let err = registry
            .resolve(&client, &ids(&["nope", "secret"]))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn duplicates_are_looked_up_once() {
        let client = FakeClient::with(&[("durov", 1)], &[]);
        let registry = ChannelRegistry::new(Duration::ZERO);

        let set = registry
            .resolve(&client, &ids(&["durov", "@durov", "https://t.me/durov"]))
            .await
            .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(client.lookups.lock().unwrap().len(), 1);
    }
}
