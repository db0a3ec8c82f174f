//! Join watcher service.
//!
//! The JoinWatcher owns the monitored channel set, keeps it in step with
//! the notification source, and runs the live event dispatcher.
//!
//! Startup order:
//! 1. [`JoinWatcher::new`] validates configuration and the host context
//! 2. [`JoinWatcher::load`] restores state, re-registers channels and starts
//!    the dispatcher
//! 3. [`JoinWatcher::monitor`] / [`JoinWatcher::unmonitor`] at any time
//! 4. [`JoinWatcher::shutdown`] stops the dispatcher

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatcherConfig;
use crate::store::StateStore;
use crate::{Error, Result};

use super::channel_set::{ChannelSet, PersistedState};
use super::dispatcher::{JoinGate, LiveEventDispatcher};
use super::events::{DispatchCounters, WatcherEvent, WatcherEventBroadcaster, WatcherStats};
use super::source::{ChatSessionController, EventSink, HostContext, LiveChannelWatcher};
use super::video::LiveVideoEvent;

/// Watches channels for live broadcasts and joins their chat sessions.
pub struct JoinWatcher {
    /// Host service name, for logs.
    host_name: String,
    /// Monitored channels.
    channels: Arc<ChannelSet>,
    /// Notification source.
    source: Arc<dyn LiveChannelWatcher>,
    /// Chat-session controller taken from the host.
    controller: Arc<dyn ChatSessionController>,
    /// Sending half of the event stream, handed to the source.
    sink: EventSink,
    /// Receiving half, taken when the dispatcher starts.
    event_rx: parking_lot::Mutex<Option<mpsc::Receiver<LiveVideoEvent>>>,
    /// Channel whose join is in flight, plus the join ledger.
    gate: Arc<JoinGate>,
    /// Dispatcher task handle.
    dispatcher_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    counters: Arc<DispatchCounters>,
    events: WatcherEventBroadcaster,
    cancel_token: CancellationToken,
}

impl JoinWatcher {
    /// Create a watcher for a host.
    ///
    /// Fails with [`Error::Configuration`] if the configuration is invalid or
    /// the host cannot join live chats.
    pub fn new(
        config: &WatcherConfig,
        source: Arc<dyn LiveChannelWatcher>,
        host: &dyn HostContext,
    ) -> Result<Self> {
        config.validate()?;

        let controller = host.chat_sessions().ok_or_else(|| {
            Error::config(format!(
                "host service '{}' does not support joining live chats",
                host.name()
            ))
        })?;

        let (event_tx, event_rx) = mpsc::channel(config.event_buffer);

        Ok(Self {
            host_name: host.name().to_string(),
            channels: Arc::new(ChannelSet::new()),
            source,
            controller,
            sink: EventSink::new(event_tx),
            event_rx: parking_lot::Mutex::new(Some(event_rx)),
            gate: Arc::new(JoinGate::new(config.dedupe_joins)),
            dispatcher_task: parking_lot::Mutex::new(None),
            counters: Arc::new(DispatchCounters::default()),
            events: WatcherEventBroadcaster::new(),
            cancel_token: CancellationToken::new(),
        })
    }

    // ========== Monitor lifecycle ==========

    /// Start watching a channel.
    ///
    /// If registration with the notification source fails the error is
    /// returned and the channel stays in the monitored set.
    pub async fn monitor(&self, channel_id: &str) -> Result<()> {
        if !self.channels.insert(channel_id) {
            return Err(Error::already_monitored(channel_id));
        }

        if let Err(e) = self.source.monitor_all(channel_id, self.sink.clone()).await {
            warn!(channel_id = %channel_id, error = %e, "Failed to register channel with notification source");
            return Err(Error::Registration {
                channel_id: channel_id.to_string(),
                message: e.to_string(),
            });
        }

        info!(channel_id = %channel_id, host = %self.host_name, "Monitoring channel");
        self.events.publish(WatcherEvent::ChannelMonitored {
            channel_id: channel_id.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Stop watching a channel and leave its chat sessions.
    ///
    /// Once this returns no join is dispatched for the channel until it is
    /// monitored again.
    pub async fn unmonitor(&self, channel_id: &str) -> Result<()> {
        if !self.channels.remove(channel_id) {
            return Err(Error::not_monitored(channel_id));
        }

        // Wait out a join in flight for this channel; later dispatches see
        // the removal.
        self.gate.wait_idle(channel_id).await;
        self.gate.forget(channel_id);

        self.source.unmonitor_all(channel_id, &self.sink).await;

        self.controller.leave_all(channel_id).await.inspect_err(|e| {
            warn!(channel_id = %channel_id, error = %e, "Failed to leave chat sessions");
        })?;

        info!(channel_id = %channel_id, host = %self.host_name, "Stopped monitoring channel");
        self.events.publish(WatcherEvent::ChannelUnmonitored {
            channel_id: channel_id.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    // ========== Persistence ==========

    /// Restore monitored channels and start the dispatcher.
    ///
    /// `None` means there is no prior state. Malformed data is logged and
    /// ignored so startup never fails on persisted state.
    pub async fn load(&self, data: Option<&[u8]>) -> Result<()> {
        self.ensure_startable()?;

        let state = match data {
            Some(bytes) => decode_state(bytes).unwrap_or_else(|e| {
                warn!(error = %e, "Discarding unreadable watcher state");
                PersistedState::default()
            }),
            None => PersistedState::default(),
        };

        let mut restored = 0usize;
        for channel_id in state.monitored() {
            // Already monitored channels are registered with the source.
            if !self.channels.insert(channel_id) {
                continue;
            }
            restored += 1;
            if let Err(e) = self.source.monitor_all(channel_id, self.sink.clone()).await {
                warn!(channel_id = %channel_id, error = %e, "Failed to re-register restored channel");
            }
        }

        info!(channels = restored, host = %self.host_name, "Restored monitored channels");
        self.start()
    }

    /// Serialize the monitored set.
    pub fn save(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.channels.snapshot())?)
    }

    /// [`load`](Self::load) from a state store.
    ///
    /// A store that cannot be read is treated as having no prior state.
    pub async fn load_from(&self, store: &StateStore) -> Result<()> {
        let data = store.read().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read watcher state, starting empty");
            None
        });
        self.load(data.as_deref()).await
    }

    /// [`save`](Self::save) into a state store.
    pub async fn save_to(&self, store: &StateStore) -> Result<()> {
        let data = self.save()?;
        store.write(&data).await
    }

    // ========== Dispatcher ==========

    fn ensure_startable(&self) -> Result<()> {
        if self.cancel_token.is_cancelled() {
            return Err(Error::ShutDown);
        }
        if self.event_rx.lock().is_none() {
            return Err(Error::AlreadyRunning);
        }
        Ok(())
    }

    fn start(&self) -> Result<()> {
        self.ensure_startable()?;
        let event_rx = self.event_rx.lock().take().ok_or(Error::AlreadyRunning)?;

        let dispatcher = LiveEventDispatcher::new(
            Arc::clone(&self.channels),
            Arc::clone(&self.controller),
            Arc::clone(&self.gate),
            Arc::clone(&self.counters),
            self.events.clone(),
        );
        let task = tokio::spawn(dispatcher.run(event_rx, self.cancel_token.child_token()));
        *self.dispatcher_task.lock() = Some(task);

        debug!(host = %self.host_name, "Dispatcher spawned");
        Ok(())
    }

    /// Whether the dispatcher task is alive.
    pub fn is_running(&self) -> bool {
        self.dispatcher_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Stop the dispatcher and wait for it to finish.
    pub async fn shutdown(&self) {
        self.cancel_token.cancel();

        let task = self.dispatcher_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Dispatcher task ended abnormally");
            }
        }

        info!(host = %self.host_name, "Join watcher shut down");
    }

    // ========== Accessors ==========

    pub fn is_monitored(&self, channel_id: &str) -> bool {
        self.channels.contains(channel_id)
    }

    /// Sorted list of monitored channels.
    pub fn monitored_channels(&self) -> Vec<String> {
        self.channels.channels()
    }

    /// The event sink registered with the notification source.
    pub fn event_sink(&self) -> &EventSink {
        &self.sink
    }

    /// Subscribe to watcher events.
    pub fn subscribe(&self) -> broadcast::Receiver<WatcherEvent> {
        self.events.subscribe()
    }

    pub fn stats(&self) -> WatcherStats {
        self.counters.stats(self.channels.len())
    }
}

fn decode_state(bytes: &[u8]) -> Result<PersistedState> {
    serde_json::from_slice(bytes).map_err(Error::Decode)
}
