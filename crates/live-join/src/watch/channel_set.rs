//! Concurrency-safe set of monitored channels.

use std::collections::{BTreeMap, HashSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Durable form of the monitored set.
///
/// Serializes as `{"Channels": {"<channel id>": true, ...}}`, which is the
/// layout existing state files use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(rename = "Channels", default)]
    pub channels: BTreeMap<String, bool>,
}

impl PersistedState {
    /// Channels flagged as monitored. Entries stored as `false` are skipped.
    pub fn monitored(&self) -> impl Iterator<Item = &str> {
        self.channels
            .iter()
            .filter(|(_, monitored)| **monitored)
            .map(|(id, _)| id.as_str())
    }
}

/// Set of channel ids currently monitored.
///
/// Writers are exclusive with each other and with readers. The lock is never
/// exposed, so no guard can be held across an `.await`.
#[derive(Debug, Default)]
pub struct ChannelSet {
    inner: RwLock<HashSet<String>>,
}

impl ChannelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.inner.read().contains(channel_id)
    }

    /// Add a channel. Returns `false` if it was already present.
    pub fn insert(&self, channel_id: &str) -> bool {
        let mut channels = self.inner.write();
        if channels.contains(channel_id) {
            return false;
        }
        channels.insert(channel_id.to_string())
    }

    /// Remove a channel. Returns `false` if it was not present.
    pub fn remove(&self, channel_id: &str) -> bool {
        self.inner.write().remove(channel_id)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Sorted copy of the monitored ids.
    pub fn channels(&self) -> Vec<String> {
        let mut channels: Vec<String> = self.inner.read().iter().cloned().collect();
        channels.sort();
        channels
    }

    /// Owned copy suitable for serialization.
    pub fn snapshot(&self) -> PersistedState {
        let channels = self.inner.read();
        PersistedState {
            channels: channels.iter().map(|id| (id.clone(), true)).collect(),
        }
    }
}
