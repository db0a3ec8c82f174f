//! Collaborator contracts implemented by the host.
//!
//! - [`LiveChannelWatcher`] - notification source that pushes [`LiveVideoEvent`]s
//! - [`ChatSessionController`] - joins and leaves live chat sessions
//! - [`HostContext`] - the messaging service the watcher runs inside

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

use super::video::LiveVideoEvent;

/// Sending half of the watcher's event stream, handed to the notification source.
///
/// The stream is bounded: when the dispatcher falls behind, `send` waits.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: mpsc::Sender<LiveVideoEvent>,
}

impl EventSink {
    pub(crate) fn new(sender: mpsc::Sender<LiveVideoEvent>) -> Self {
        Self { sender }
    }

    /// Deliver an event, waiting for buffer space.
    ///
    /// Returns `false` if the watcher's dispatcher has stopped.
    pub async fn send(&self, event: LiveVideoEvent) -> bool {
        self.sender.send(event).await.is_ok()
    }

    /// Deliver an event without waiting. Returns `false` if the buffer is full
    /// or the dispatcher has stopped.
    pub fn try_send(&self, event: LiveVideoEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }

    /// Whether both sinks feed the same watcher.
    pub fn same_sink(&self, other: &EventSink) -> bool {
        self.sender.same_channel(&other.sender)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

/// Source of live-broadcast notifications.
#[async_trait]
pub trait LiveChannelWatcher: Send + Sync {
    /// Register interest in every broadcast of `channel_id`, delivering
    /// notifications into `sink`.
    async fn monitor_all(&self, channel_id: &str, sink: EventSink) -> Result<()>;

    /// Drop the registration made by [`monitor_all`](Self::monitor_all).
    /// Best-effort.
    async fn unmonitor_all(&self, channel_id: &str, sink: &EventSink);
}

/// Joins and leaves live chat sessions.
///
/// Implementations decide whether joining an already joined chat is a no-op.
#[async_trait]
pub trait ChatSessionController: Send + Sync {
    /// Join the live chat of the broadcast described by `event`.
    async fn join_video(&self, event: &LiveVideoEvent) -> Result<()>;

    /// Leave every joined chat session belonging to `channel_id`.
    async fn leave_all(&self, channel_id: &str) -> Result<()>;
}

/// The host messaging service.
pub trait HostContext: Send + Sync {
    /// Service name, used in logs and configuration errors.
    fn name(&self) -> &str;

    /// Chat-session operations, if this host supports joining live chats.
    fn chat_sessions(&self) -> Option<Arc<dyn ChatSessionController>>;
}
