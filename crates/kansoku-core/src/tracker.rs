//! Binding to the page's `<video>` element.

use kansoku_dom::{Dom, NodeId, HAVE_CURRENT_DATA};
use serde::{Deserialize, Serialize};

/// Native media event names the tracker listens for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaEventKind {
    LoadStart,
    LoadedMetadata,
    Playing,
    Pause,
    Ended,
    Seeked,
    TimeUpdate,
}

impl MediaEventKind {
    pub const ALL: [MediaEventKind; 7] = [
        Self::LoadStart,
        Self::LoadedMetadata,
        Self::Playing,
        Self::Pause,
        Self::Ended,
        Self::Seeked,
        Self::TimeUpdate,
    ];
}

/// A native event fired by a media element on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEvent {
    pub node: NodeId,
    pub kind: MediaEventKind,
}

/// Signals derived from the tracked element. Times are in ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerEvent {
    Loading,
    Loaded,
    Started,
    Paused,
    Stopped,
    Seeked(Option<u64>),
    Progress(Option<u64>),
}

/// Follows at most one media element at a time.
#[derive(Debug, Default)]
pub struct MediaTracker {
    node: Option<NodeId>,
    listeners: Vec<MediaEventKind>,
}

impl MediaTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The element being tracked.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Start tracking `node`, dropping any element tracked before.
    pub fn start<D: Dom>(&mut self, dom: &D, node: NodeId) -> Vec<TrackerEvent> {
        if self.node.is_some() {
            self.stop();
        }

        tracing::debug!(?node, "Tracking media element");
        self.node = Some(node);
        self.listeners = MediaEventKind::ALL.to_vec();

        let mut events = vec![TrackerEvent::Loading];
        if dom
            .media(node)
            .is_some_and(|m| m.ready_state >= HAVE_CURRENT_DATA)
        {
            events.push(TrackerEvent::Loaded);
        }
        events
    }

    /// Stop tracking. Returns `false` when nothing was tracked.
    pub fn stop(&mut self) -> bool {
        let Some(node) = self.node.take() else {
            return false;
        };
        tracing::debug!(?node, "Stopped tracking media element");
        self.listeners.clear();
        true
    }

    /// Translate a native event. Events for other elements are dropped.
    pub fn handle<D: Dom>(&self, dom: &D, event: &MediaEvent) -> Option<TrackerEvent> {
        if self.node != Some(event.node) || !self.listeners.contains(&event.kind) {
            tracing::trace!(?event, "Ignoring event for untracked element");
            return None;
        }

        Some(match event.kind {
            MediaEventKind::LoadStart => TrackerEvent::Loading,
            MediaEventKind::LoadedMetadata => TrackerEvent::Loaded,
            MediaEventKind::Playing => TrackerEvent::Started,
            MediaEventKind::Pause => TrackerEvent::Paused,
            MediaEventKind::Ended => TrackerEvent::Stopped,
            MediaEventKind::Seeked => TrackerEvent::Seeked(self.time(dom)),
            MediaEventKind::TimeUpdate => TrackerEvent::Progress(self.time(dom)),
        })
    }

    /// Current position in ms; `None` at zero or when nothing is tracked.
    pub fn time<D: Dom>(&self, dom: &D) -> Option<u64> {
        let media = dom.media(self.node?)?;
        to_millis(media.current_time)
    }

    /// Duration in ms; `None` while unknown.
    pub fn duration<D: Dom>(&self, dom: &D) -> Option<u64> {
        let media = dom.media(self.node?)?;
        to_millis(media.duration)
    }
}

fn to_millis(seconds: f64) -> Option<u64> {
    if seconds.is_finite() && seconds > 0.0 {
        Some((seconds * 1000.0) as u64)
    } else {
        None
    }
}
