//! Test doubles for the watcher's collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, broadcast};

use live_join::{
    ChatSessionController, Error, EventSink, HostContext, JoinDecision, JoinWatcher,
    LiveChannelWatcher, LiveVideoEvent, Result, WatcherConfig, WatcherEvent,
};

/// Notification source that records (un)registrations and keeps every sink
/// it was given, so tests can deliver events even after unregistering.
#[derive(Default)]
pub struct MockSource {
    pub registered: Mutex<Vec<String>>,
    pub unregistered: Mutex<Vec<String>>,
    sinks: Mutex<HashMap<String, EventSink>>,
    failing: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make registration fail for a channel.
    pub fn fail_for(&self, channel_id: &str) {
        self.failing.lock().unwrap().push(channel_id.to_string());
    }

    pub fn registrations(&self) -> Vec<String> {
        let mut registered = self.registered.lock().unwrap().clone();
        registered.sort();
        registered
    }

    /// Deliver an event through the sink registered for its channel.
    pub async fn emit(&self, event: LiveVideoEvent) {
        // Events for unregistered channels go through any known sink.
        let sink = {
            let sinks = self.sinks.lock().unwrap();
            sinks
                .get(&event.channel_id)
                .or_else(|| sinks.values().next())
                .cloned()
        }
        .expect("no sink registered");
        assert!(sink.send(event).await, "dispatcher stopped");
    }

    pub fn sink(&self, channel_id: &str) -> Option<EventSink> {
        self.sinks.lock().unwrap().get(channel_id).cloned()
    }
}

#[async_trait]
impl LiveChannelWatcher for MockSource {
    async fn monitor_all(&self, channel_id: &str, sink: EventSink) -> Result<()> {
        if self.failing.lock().unwrap().iter().any(|c| c == channel_id) {
            return Err(Error::source_error("quota exceeded"));
        }
        self.registered.lock().unwrap().push(channel_id.to_string());
        self.sinks
            .lock()
            .unwrap()
            .insert(channel_id.to_string(), sink);
        Ok(())
    }

    async fn unmonitor_all(&self, channel_id: &str, sink: &EventSink) {
        if let Some(stored) = self.sink(channel_id) {
            assert!(stored.same_sink(sink));
        }
        self.registered.lock().unwrap().retain(|c| c != channel_id);
        self.unregistered.lock().unwrap().push(channel_id.to_string());
    }
}

/// Chat-session controller recording calls in order.
#[derive(Default)]
pub struct MockController {
    pub joins: Mutex<Vec<LiveVideoEvent>>,
    pub log: Mutex<Vec<String>>,
    /// When set, joins wait for `release` after signalling `entered`.
    pub hold_joins: bool,
    pub entered: Notify,
    pub release: Notify,
    pub fail_leave: bool,
}

impl MockController {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn holding() -> Arc<Self> {
        Arc::new(Self {
            hold_joins: true,
            ..Default::default()
        })
    }

    pub fn failing_leave() -> Arc<Self> {
        Arc::new(Self {
            fail_leave: true,
            ..Default::default()
        })
    }

    pub fn join_count(&self) -> usize {
        self.joins.lock().unwrap().len()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatSessionController for MockController {
    async fn join_video(&self, event: &LiveVideoEvent) -> Result<()> {
        if self.hold_joins {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.log
            .lock()
            .unwrap()
            .push(format!("join:{}", event.channel_id));
        self.joins.lock().unwrap().push(event.clone());
        Ok(())
    }

    async fn leave_all(&self, channel_id: &str) -> Result<()> {
        self.log.lock().unwrap().push(format!("leave:{}", channel_id));
        if self.fail_leave {
            return Err(Error::chat_error("not connected"));
        }
        Ok(())
    }
}

pub struct MockHost {
    controller: Option<Arc<MockController>>,
}

impl MockHost {
    pub fn youtube(controller: Arc<MockController>) -> Self {
        Self {
            controller: Some(controller),
        }
    }

    pub fn without_chat() -> Self {
        Self { controller: None }
    }
}

impl HostContext for MockHost {
    fn name(&self) -> &str {
        if self.controller.is_some() {
            "YouTube"
        } else {
            "Discord"
        }
    }

    fn chat_sessions(&self) -> Option<Arc<dyn ChatSessionController>> {
        self.controller
            .clone()
            .map(|c| c as Arc<dyn ChatSessionController>)
    }
}

pub fn watcher_with(
    config: &WatcherConfig,
    source: &Arc<MockSource>,
    controller: &Arc<MockController>,
) -> JoinWatcher {
    JoinWatcher::new(
        config,
        Arc::clone(source) as Arc<dyn LiveChannelWatcher>,
        &MockHost::youtube(Arc::clone(controller)),
    )
    .expect("valid watcher")
}

pub fn watcher(source: &Arc<MockSource>, controller: &Arc<MockController>) -> JoinWatcher {
    watcher_with(&WatcherConfig::default(), source, controller)
}

/// Outcome of one dispatched live event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    Joined(String),
    Failed,
    Ignored(JoinDecision),
}

/// Wait for the dispatcher to finish handling the next live event.
pub async fn next_dispatch(rx: &mut broadcast::Receiver<WatcherEvent>) -> Dispatched {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await.expect("watcher events closed") {
                WatcherEvent::JoinDispatched { chat_id, .. } => return Dispatched::Joined(chat_id),
                WatcherEvent::JoinFailed { .. } => return Dispatched::Failed,
                WatcherEvent::EventIgnored { reason, .. } => return Dispatched::Ignored(reason),
                _ => {}
            }
        }
    })
    .await
    .expect("timed out waiting for dispatch")
}
