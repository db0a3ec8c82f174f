//! Chat command handling.
//!
//! The only command is `leave`: a bot owner or the channel owner can ask the
//! watcher to stop monitoring the channel the command was sent from.
//! Permission checks are evaluated by the host and passed in with the
//! message.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::watch::JoinWatcher;

/// Command word for leaving a channel.
pub const LEAVE_COMMAND: &str = "leave";

/// An inbound chat message with host-evaluated permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Channel the message was sent in.
    pub channel_id: String,
    /// Raw message text.
    pub text: String,
    pub is_bot_owner: bool,
    pub is_channel_owner: bool,
}

impl InboundMessage {
    pub fn new(channel_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            text: text.into(),
            is_bot_owner: false,
            is_channel_owner: false,
        }
    }

    pub fn from_bot_owner(mut self) -> Self {
        self.is_bot_owner = true;
        self
    }

    pub fn from_channel_owner(mut self) -> Self {
        self.is_channel_owner = true;
        self
    }

    fn is_privileged(&self) -> bool {
        self.is_bot_owner || self.is_channel_owner
    }
}

/// What the handler did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Not a command this handler understands.
    Ignored,
    /// A `leave` command from someone without permission.
    Denied,
    /// The channel is no longer monitored.
    Left,
    /// Unmonitoring failed; the error has been logged.
    Failed(String),
}

/// Whether `text` invokes `command` with the given prefix.
///
/// The command word is case-insensitive and must be followed by the end of
/// the message or whitespace: `!leave` and `!LEAVE now` match, `!leaves`
/// does not.
pub fn matches_command(prefix: &str, command: &str, text: &str) -> bool {
    let Some(rest) = text.trim_start().strip_prefix(prefix) else {
        return false;
    };
    let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    !command.is_empty() && rest[..word_end].eq_ignore_ascii_case(command)
}

/// Routes chat commands to the watcher.
pub struct CommandHandler {
    watcher: Arc<JoinWatcher>,
    prefix: String,
}

impl CommandHandler {
    pub fn new(watcher: Arc<JoinWatcher>, prefix: impl Into<String>) -> Self {
        Self {
            watcher,
            prefix: prefix.into(),
        }
    }

    /// Handle one inbound message.
    ///
    /// No reply is produced; failures are logged and reported in the
    /// returned outcome.
    pub async fn handle(&self, message: &InboundMessage) -> CommandOutcome {
        if !matches_command(&self.prefix, LEAVE_COMMAND, &message.text) {
            return CommandOutcome::Ignored;
        }

        if !message.is_privileged() {
            debug!(channel_id = %message.channel_id, "Ignoring leave command without permission");
            return CommandOutcome::Denied;
        }

        match self.watcher.unmonitor(&message.channel_id).await {
            Ok(()) => CommandOutcome::Left,
            Err(e) => {
                warn!(channel_id = %message.channel_id, error = %e, "Leave command failed");
                CommandOutcome::Failed(e.to_string())
            }
        }
    }
}
