//! Watcher lifecycle events and counters.
//!
//! These events are an observability side channel: they report what the
//! watcher did, they are not the live-event stream itself.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::dispatcher::JoinDecision;

/// Events emitted by the watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WatcherEvent {
    /// A channel was added and registered with the notification source.
    ChannelMonitored {
        channel_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A channel was removed and its chat sessions left.
    ChannelUnmonitored {
        channel_id: String,
        timestamp: DateTime<Utc>,
    },
    /// A join was dispatched to the chat-session controller.
    JoinDispatched {
        channel_id: String,
        video_id: String,
        chat_id: String,
        timestamp: DateTime<Utc>,
    },
    /// The chat-session controller rejected a join.
    JoinFailed {
        channel_id: String,
        video_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    /// A live event did not satisfy the join policy.
    EventIgnored {
        channel_id: String,
        video_id: String,
        reason: JoinDecision,
        timestamp: DateTime<Utc>,
    },
}

impl WatcherEvent {
    pub fn channel_id(&self) -> &str {
        match self {
            WatcherEvent::ChannelMonitored { channel_id, .. }
            | WatcherEvent::ChannelUnmonitored { channel_id, .. }
            | WatcherEvent::JoinDispatched { channel_id, .. }
            | WatcherEvent::JoinFailed { channel_id, .. }
            | WatcherEvent::EventIgnored { channel_id, .. } => channel_id,
        }
    }

    /// Get a human-readable description of the event.
    pub fn description(&self) -> String {
        match self {
            WatcherEvent::ChannelMonitored { channel_id, .. } => {
                format!("Now monitoring {}", channel_id)
            }
            WatcherEvent::ChannelUnmonitored { channel_id, .. } => {
                format!("Stopped monitoring {}", channel_id)
            }
            WatcherEvent::JoinDispatched {
                channel_id,
                chat_id,
                ..
            } => format!("Joined chat {} of {}", chat_id, channel_id),
            WatcherEvent::JoinFailed {
                channel_id, error, ..
            } => format!("Failed to join {}: {}", channel_id, error),
            WatcherEvent::EventIgnored {
                channel_id, reason, ..
            } => format!("Ignored event for {}: {:?}", channel_id, reason),
        }
    }
}

/// Broadcaster for watcher events.
#[derive(Clone)]
pub struct WatcherEventBroadcaster {
    sender: broadcast::Sender<WatcherEvent>,
}

impl WatcherEventBroadcaster {
    /// Create a new broadcaster with default capacity (256).
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WatcherEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: WatcherEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for WatcherEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time watcher counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherStats {
    pub monitored_channels: usize,
    pub events_received: u64,
    pub joins_dispatched: u64,
    pub joins_failed: u64,
    pub events_ignored: u64,
}

/// Dispatch counters shared between the dispatcher task and the watcher.
#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    pub events_received: AtomicU64,
    pub joins_dispatched: AtomicU64,
    pub joins_failed: AtomicU64,
    pub events_ignored: AtomicU64,
}

impl DispatchCounters {
    pub fn stats(&self, monitored_channels: usize) -> WatcherStats {
        WatcherStats {
            monitored_channels,
            events_received: self.events_received.load(Ordering::Relaxed),
            joins_dispatched: self.joins_dispatched.load(Ordering::Relaxed),
            joins_failed: self.joins_failed.load(Ordering::Relaxed),
            events_ignored: self.events_ignored.load(Ordering::Relaxed),
        }
    }
}
