//! Live channel watching.
//!
//! This module is responsible for:
//! - Tracking the set of monitored channels
//! - Registering channels with the notification source
//! - Dispatching joins for channels that go live
//! - Saving and restoring the monitored set

mod channel_set;
mod dispatcher;
mod events;
mod service;
mod source;
mod video;

pub use channel_set::{ChannelSet, PersistedState};
pub use dispatcher::{JoinDecision, evaluate};
pub use events::{WatcherEvent, WatcherEventBroadcaster, WatcherStats};
pub use service::JoinWatcher;
pub use source::{ChatSessionController, EventSink, HostContext, LiveChannelWatcher};
pub use video::LiveVideoEvent;
