//! Live broadcast notifications delivered by the notification source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single notification that a channel's broadcast state changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveVideoEvent {
    /// Broadcast (video) identifier.
    pub video_id: String,
    /// Channel that owns the broadcast.
    pub channel_id: String,
    /// Broadcast title, if the source provides one.
    #[serde(default)]
    pub title: String,
    /// Whether the broadcast is currently live.
    pub is_live: bool,
    /// Active live chat id. Empty means there is no open chat to join.
    #[serde(default)]
    pub active_chat_id: String,
    /// When the source observed this state.
    pub observed_at: DateTime<Utc>,
}

impl LiveVideoEvent {
    /// Create a non-live event for a broadcast.
    pub fn new(channel_id: impl Into<String>, video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            channel_id: channel_id.into(),
            title: String::new(),
            is_live: false,
            active_chat_id: String::new(),
            observed_at: Utc::now(),
        }
    }

    /// Mark the broadcast live with the given chat id (may be empty).
    pub fn live(mut self, active_chat_id: impl Into<String>) -> Self {
        self.is_live = true;
        self.active_chat_id = active_chat_id.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Live with an open chat session.
    pub fn has_joinable_chat(&self) -> bool {
        self.is_live && !self.active_chat_id.is_empty()
    }
}
