//! Small JSON-file stores shared by the monitor and the bot commands.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{domain::ChannelRef, Result};

pub const DEFAULT_QUERY: &str = "Find all messages that have words on it.";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ChannelFile {
    #[serde(default)]
    channels: Vec<String>,
}

/// Persisted list of channel identifiers to watch.
#[derive(Clone, Debug)]
pub struct ChannelStore {
    path: PathBuf,
    defaults: Vec<String>,
}

impl ChannelStore {
    pub fn new(path: impl Into<PathBuf>, defaults: Vec<String>) -> Self {
        Self {
            path: path.into(),
            defaults,
        }
    }

    /// Sorted, de-duplicated identifiers. A missing file yields the defaults.
    pub fn list(&self) -> Result<Vec<String>> {
        Ok(self.load()?.into_iter().collect())
    }

    /// Returns `false` when the channel is already present (or the name is blank).
    pub fn add(&self, raw: &str) -> Result<bool> {
        let Some(channel) = ChannelRef::parse(raw) else {
            return Ok(false);
        };
        let mut set = self.load()?;
        if !set.insert(channel_key(&channel)) {
            return Ok(false);
        }
        self.save(&set)?;
        Ok(true)
    }

    /// Returns `false` when the channel was not in the list.
    pub fn remove(&self, raw: &str) -> Result<bool> {
        let Some(channel) = ChannelRef::parse(raw) else {
            return Ok(false);
        };
        let mut set = self.load()?;
        if !set.remove(&channel_key(&channel)) {
            return Ok(false);
        }
        self.save(&set)?;
        Ok(true)
    }

    fn load(&self) -> Result<BTreeSet<String>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(normalize(&self.defaults));
            }
            Err(e) => return Err(e.into()),
        };
        let file: ChannelFile = serde_json::from_str(&raw)?;
        Ok(normalize(&file.channels))
    }

    fn save(&self, set: &BTreeSet<String>) -> Result<()> {
        let file = ChannelFile {
            channels: set.iter().cloned().collect(),
        };
        write_json(&self.path, &file)
    }
}

fn normalize(raw: &[String]) -> BTreeSet<String> {
    raw.iter()
        .filter_map(|s| ChannelRef::parse(s))
        .map(|c| channel_key(&c))
        .collect()
}

/// Usernames are case-insensitive, so the store keeps them lowercased.
fn channel_key(channel: &ChannelRef) -> String {
    channel.as_str().to_lowercase()
}

#[derive(Debug, Serialize, Deserialize)]
struct QueryFile {
    query: String,
}

/// Persisted relevance query.
#[derive(Clone, Debug)]
pub struct QueryStore {
    path: PathBuf,
}

impl QueryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current query; unreadable or missing files fall back to [`DEFAULT_QUERY`].
    pub fn get(&self) -> String {
        fs::read_to_string(&self.path)
            .ok()
            .and_then(|raw| serde_json::from_str::<QueryFile>(&raw).ok())
            .map(|f| f.query)
            .filter(|q| !q.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUERY.to_string())
    }

    pub fn set(&self, query: &str) -> Result<()> {
        write_json(
            &self.path,
            &QueryFile {
                query: query.trim().to_string(),
            },
        )
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let body = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, body)?;
    fs::rename(&tmp, path)?;
    Ok(())
}
