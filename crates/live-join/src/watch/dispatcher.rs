//! Live event dispatcher.
//!
//! A single consumer reads [`LiveVideoEvent`]s from the watcher's event
//! stream and asks the chat-session controller to join every broadcast that
//! satisfies the join policy.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::channel_set::ChannelSet;
use super::events::{DispatchCounters, WatcherEvent, WatcherEventBroadcaster};
use super::source::ChatSessionController;
use super::video::LiveVideoEvent;

/// Outcome of the join policy for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinDecision {
    /// Join the broadcast's chat.
    Join,
    /// The channel is not monitored.
    NotMonitored,
    /// The broadcast is not live.
    NotLive,
    /// Live, but without an open chat.
    NoActiveChat,
    /// This chat was already joined (only with join deduplication enabled).
    AlreadyJoined,
}

impl JoinDecision {
    pub fn is_join(&self) -> bool {
        matches!(self, JoinDecision::Join)
    }
}

/// Apply the join policy to an event.
///
/// `last_joined` is the chat id most recently joined for the event's channel,
/// if join deduplication is enabled.
pub fn evaluate(event: &LiveVideoEvent, monitored: bool, last_joined: Option<&str>) -> JoinDecision {
    if !monitored {
        return JoinDecision::NotMonitored;
    }
    if !event.is_live {
        return JoinDecision::NotLive;
    }
    if event.active_chat_id.is_empty() {
        return JoinDecision::NoActiveChat;
    }
    if last_joined == Some(event.active_chat_id.as_str()) {
        return JoinDecision::AlreadyJoined;
    }
    JoinDecision::Join
}

/// Chats joined per channel, used for join deduplication.
#[derive(Debug, Default)]
pub(crate) struct JoinLedger {
    dedupe: bool,
    joined: HashMap<String, String>,
}

impl JoinLedger {
    pub fn new(dedupe: bool) -> Self {
        Self {
            dedupe,
            joined: HashMap::new(),
        }
    }

    pub fn last_joined(&self, channel_id: &str) -> Option<&str> {
        if !self.dedupe {
            return None;
        }
        self.joined.get(channel_id).map(String::as_str)
    }

    pub fn record(&mut self, channel_id: &str, chat_id: &str) {
        if self.dedupe {
            self.joined
                .insert(channel_id.to_string(), chat_id.to_string());
        }
    }

    pub fn forget(&mut self, channel_id: &str) {
        self.joined.remove(channel_id);
    }
}

/// Tracks the channel whose join is in flight.
///
/// The membership check and marking the channel in flight happen under the
/// watch channel's write lock, so a caller that removed a channel and then
/// calls [`wait_idle`](Self::wait_idle) either sees the join in flight or is
/// guaranteed the dispatcher saw the removal. Joins for other channels never
/// block the wait.
#[derive(Debug)]
pub(crate) struct JoinGate {
    in_flight: watch::Sender<Option<String>>,
    ledger: parking_lot::Mutex<JoinLedger>,
}

impl JoinGate {
    pub fn new(dedupe: bool) -> Self {
        let (in_flight, _) = watch::channel(None);
        Self {
            in_flight,
            ledger: parking_lot::Mutex::new(JoinLedger::new(dedupe)),
        }
    }

    /// Apply the join policy; on [`JoinDecision::Join`] the event's channel
    /// is marked in flight until the returned guard is dropped.
    fn begin(
        &self,
        event: &LiveVideoEvent,
        channels: &ChannelSet,
    ) -> (JoinDecision, Option<InFlight<'_>>) {
        let mut decision = JoinDecision::NotMonitored;
        self.in_flight.send_if_modified(|slot| {
            let ledger = self.ledger.lock();
            decision = evaluate(
                event,
                channels.contains(&event.channel_id),
                ledger.last_joined(&event.channel_id),
            );
            if decision.is_join() {
                *slot = Some(event.channel_id.clone());
            }
            decision.is_join()
        });

        let guard = decision.is_join().then_some(InFlight { gate: self });
        (decision, guard)
    }

    fn record(&self, channel_id: &str, chat_id: &str) {
        self.ledger.lock().record(channel_id, chat_id);
    }

    /// Wait until no join for `channel_id` is in flight.
    pub async fn wait_idle(&self, channel_id: &str) {
        let mut rx = self.in_flight.subscribe();
        // The sender lives as long as the gate, so this cannot fail.
        let _ = rx
            .wait_for(|current| current.as_deref() != Some(channel_id))
            .await;
    }

    pub fn forget(&self, channel_id: &str) {
        self.ledger.lock().forget(channel_id);
    }

    #[cfg(test)]
    fn in_flight(&self) -> Option<String> {
        self.in_flight.borrow().clone()
    }
}

/// Clears the in-flight marker when the join finishes, even on panic.
struct InFlight<'a> {
    gate: &'a JoinGate,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.send_replace(None);
    }
}

/// Single consumer of the live event stream.
pub(crate) struct LiveEventDispatcher {
    channels: Arc<ChannelSet>,
    controller: Arc<dyn ChatSessionController>,
    gate: Arc<JoinGate>,
    counters: Arc<DispatchCounters>,
    events: WatcherEventBroadcaster,
}

impl LiveEventDispatcher {
    pub fn new(
        channels: Arc<ChannelSet>,
        controller: Arc<dyn ChatSessionController>,
        gate: Arc<JoinGate>,
        counters: Arc<DispatchCounters>,
        events: WatcherEventBroadcaster,
    ) -> Self {
        Self {
            channels,
            controller,
            gate,
            counters,
            events,
        }
    }

    /// Consume events until cancelled or until every sender is dropped.
    pub async fn run(
        self,
        mut event_rx: mpsc::Receiver<LiveVideoEvent>,
        cancel_token: CancellationToken,
    ) {
        info!("Live event dispatcher started");

        loop {
            tokio::select! {
                biased;

                _ = cancel_token.cancelled() => {
                    debug!("Live event dispatcher cancelled");
                    break;
                }

                event = event_rx.recv() => {
                    match event {
                        Some(event) => {
                            self.dispatch(event).await;
                        }
                        None => {
                            debug!("Live event stream closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("Live event dispatcher stopped");
    }

    /// Apply the join policy to one event and join if it holds.
    pub async fn dispatch(&self, event: LiveVideoEvent) -> JoinDecision {
        self.counters.events_received.fetch_add(1, Ordering::Relaxed);

        let (decision, _in_flight) = self.gate.begin(&event, &self.channels);

        if !decision.is_join() {
            self.counters.events_ignored.fetch_add(1, Ordering::Relaxed);
            debug!(
                channel_id = %event.channel_id,
                video_id = %event.video_id,
                ?decision,
                "Ignoring live event"
            );
            self.events.publish(WatcherEvent::EventIgnored {
                channel_id: event.channel_id,
                video_id: event.video_id,
                reason: decision,
                timestamp: Utc::now(),
            });
            return decision;
        }

        match self.controller.join_video(&event).await {
            Ok(()) => {
                self.gate.record(&event.channel_id, &event.active_chat_id);
                self.counters.joins_dispatched.fetch_add(1, Ordering::Relaxed);
                info!(
                    channel_id = %event.channel_id,
                    video_id = %event.video_id,
                    chat_id = %event.active_chat_id,
                    "Joined live chat"
                );
                self.events.publish(WatcherEvent::JoinDispatched {
                    channel_id: event.channel_id,
                    video_id: event.video_id,
                    chat_id: event.active_chat_id,
                    timestamp: Utc::now(),
                });
            }
            Err(e) => {
                self.counters.joins_failed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    channel_id = %event.channel_id,
                    video_id = %event.video_id,
                    error = %e,
                    "Failed to join live chat"
                );
                self.events.publish(WatcherEvent::JoinFailed {
                    channel_id: event.channel_id,
                    video_id: event.video_id,
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }

        decision
    }
}
