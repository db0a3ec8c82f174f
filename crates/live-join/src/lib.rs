//! live-join: watch live-broadcast channels and join their chat sessions.
//!
//! ## Core Types
//!
//! - [`JoinWatcher`] - Monitored channel set, event dispatch and persistence
//! - [`LiveVideoEvent`] - A broadcast state notification
//! - [`LiveChannelWatcher`] - Trait for the notification source
//! - [`ChatSessionController`] - Trait for joining and leaving live chats
//! - [`CommandHandler`] - Handles the `leave` chat command
//!
//! ## Support
//!
//! - [`WatcherConfig`] - TOML configuration
//! - [`StateStore`] - File storage for the persisted state
//! - [`logging::init_from_config`] - Subscriber setup

pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;
pub mod watch;

pub use command::{CommandHandler, CommandOutcome, InboundMessage};
pub use config::WatcherConfig;
pub use error::{Error, Result};
pub use store::StateStore;
pub use watch::{
    ChannelSet, ChatSessionController, EventSink, HostContext, JoinDecision, JoinWatcher,
    LiveChannelWatcher, LiveVideoEvent, PersistedState, WatcherEvent, WatcherStats,
};
