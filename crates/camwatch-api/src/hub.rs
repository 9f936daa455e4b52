//! Event hub: the server-side event sink.
//!
//! Keeps a ring buffer of recent log entries (newest first) and fans every
//! entry out to the connected WebSocket subscribers. Subscribers whose
//! channel is closed are pruned on the next event.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Local;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};
use uuid::Uuid;

use camwatch_detector::EventSink;
use camwatch_models::{DetectionEvent, LogEntry};

use crate::metrics;

/// Entries buffered per WebSocket subscriber.
pub const SUBSCRIBER_BUFFER_SIZE: usize = 32;

/// Public URL of a clip path, e.g. `static/clips/cam1_rgb/x.mp4` →
/// `/clips/cam1_rgb/x.mp4`. Content that is not a clip yields `None`.
pub fn public_clip_url(static_root: &Path, content: &str) -> Option<String> {
    let normalized = content.replace('\\', "/");
    let root = static_root.to_string_lossy().replace('\\', "/");
    let root = root.trim_end_matches('/');

    if let Some(rest) = normalized.strip_prefix(root).and_then(|r| r.strip_prefix('/')) {
        return Some(format!("/{}", rest));
    }
    if normalized.ends_with(".mp4") {
        return Some(format!("/{}", normalized.trim_start_matches('/')));
    }
    None
}

struct HubInner {
    static_root: PathBuf,
    capacity: usize,
    log: Mutex<VecDeque<LogEntry>>,
    subscribers: Mutex<HashMap<Uuid, mpsc::Sender<LogEntry>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Recent-event log plus WebSocket fan-out.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    pub fn new(capacity: usize, static_root: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                static_root: static_root.into(),
                capacity: capacity.max(1),
                log: Mutex::new(VecDeque::with_capacity(capacity)),
                subscribers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Recent entries, newest first.
    pub fn recent(&self) -> Vec<LogEntry> {
        lock(&self.inner.log).iter().cloned().collect()
    }

    /// Register a subscriber for new entries.
    pub fn subscribe(&self) -> (Uuid, mpsc::Receiver<LogEntry>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER_SIZE);
        let id = Uuid::new_v4();
        lock(&self.inner.subscribers).insert(id, tx);
        debug!("Event subscriber {} registered", id);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: Uuid) {
        lock(&self.inner.subscribers).remove(&id);
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.subscribers).len()
    }

    /// Record an entry and deliver it to every live subscriber.
    pub fn publish(&self, entry: LogEntry) {
        {
            let mut log = lock(&self.inner.log);
            log.push_front(entry.clone());
            log.truncate(self.inner.capacity);
        }

        let mut subscribers = lock(&self.inner.subscribers);
        subscribers.retain(|id, tx| match tx.try_send(entry.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("Event subscriber {} is lagging, dropping event", id);
                metrics::record_event_dropped();
                true
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Event subscriber {} disconnected", id);
                false
            }
        });
    }
}

impl EventSink for EventHub {
    fn emit(&self, event: DetectionEvent) {
        let clip_url = public_clip_url(&self.inner.static_root, &event.content);
        let entry = LogEntry::from_event(&event, clip_url, Local::now());
        metrics::record_event(entry.label.as_str());
        self.publish(entry);
    }
}
