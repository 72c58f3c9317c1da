//! Fuses the player's DOM, its title panel and its media element into one
//! ordered stream of [`MonitorEvent`]s.

use kansoku_dom::{
    Dom, MutationRecord, MutationWatcher, NodeId, ObserveOptions, ObserverId, WatchEvent,
    WatchEventKind,
};
use kansoku_parse::MediaIdentity;
use tokio::time::Instant;

use crate::config::{MonitorConfig, SelectorConfig};
use crate::error::KansokuError;
use crate::resolver::IdentityResolver;
use crate::tracker::{MediaEvent, MediaTracker, TrackerEvent};

/// Player-level events. Times and durations are in ms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    Opened(Option<MediaIdentity>),
    Closed(Option<MediaIdentity>),
    Loading,
    Loaded,
    /// A new identity is ready to play.
    Created(MediaIdentity),
    Started,
    Progress {
        time: Option<u64>,
        duration: Option<u64>,
    },
    Seeked {
        time: Option<u64>,
        duration: Option<u64>,
    },
    Paused,
    Stopped,
}

#[derive(Debug, Clone, Copy)]
struct Observers {
    player: ObserverId,
    video: ObserverId,
    title: ObserverId,
    subtitle: ObserverId,
}

pub struct PlayerMonitor {
    watcher: MutationWatcher,
    observers: Observers,
    fullscreen_class: String,
    resolver: IdentityResolver,
    tracker: MediaTracker,
    video: Option<NodeId>,
    visible: bool,
    announced: Option<MediaIdentity>,
}

impl PlayerMonitor {
    /// Register the watch tree: body → player → container → {controls →
    /// info → {title, subtitle}, video}.
    pub fn new(selectors: &SelectorConfig, config: &MonitorConfig) -> Result<Self, KansokuError> {
        let mut watcher = MutationWatcher::new();

        let body = watcher.observe(None, &selectors.body, ObserveOptions::default())?;
        let player = watcher.observe(
            Some(body),
            &selectors.player,
            ObserveOptions::attributes(["class"]),
        )?;
        let container =
            watcher.observe(Some(player), &selectors.container, ObserveOptions::default())?;
        let controls =
            watcher.observe(Some(container), &selectors.controls, ObserveOptions::default())?;
        let info = watcher.observe(Some(controls), &selectors.info, ObserveOptions::default())?;
        let title = watcher.observe(Some(info), &selectors.title, ObserveOptions::text())?;
        let subtitle = watcher.observe(Some(info), &selectors.subtitle, ObserveOptions::text())?;
        let video = watcher.observe(Some(container), &selectors.video, ObserveOptions::default())?;

        Ok(Self {
            watcher,
            observers: Observers {
                player,
                video,
                title,
                subtitle,
            },
            fullscreen_class: selectors.fullscreen_class.clone(),
            resolver: IdentityResolver::new(config.debounce()),
            tracker: MediaTracker::new(),
            video: None,
            visible: false,
            announced: None,
        })
    }

    pub fn identity(&self) -> Option<&MediaIdentity> {
        self.resolver.current()
    }

    /// Forget that `identity` was announced, so the next load or play of it
    /// is announced again. Called once its session has ended.
    pub fn release(&mut self, identity: &MediaIdentity) {
        if self.announced.as_ref() == Some(identity) {
            tracing::debug!(%identity, "Released announced identity");
            self.announced = None;
        }
    }

    /// Nearest pending deadline.
    pub fn deadline(&self) -> Option<Instant> {
        self.resolver.deadline()
    }

    /// Match the whole page, as on first bind.
    pub fn refresh<D: Dom>(&mut self, dom: &D, now: Instant) -> Vec<MonitorEvent> {
        let changes = self.watcher.refresh(dom);
        self.handle_watch(dom, changes, now)
    }

    /// Handle a batch of mutation records from the page.
    pub fn handle_mutations<D: Dom>(
        &mut self,
        dom: &D,
        records: &[MutationRecord],
        now: Instant,
    ) -> Vec<MonitorEvent> {
        let changes = self.watcher.process(dom, records);
        self.handle_watch(dom, changes, now)
    }

    /// Handle a native media event.
    pub fn handle_media<D: Dom>(&mut self, dom: &D, event: &MediaEvent) -> Vec<MonitorEvent> {
        match self.tracker.handle(dom, event) {
            Some(signal) => self.relabel(dom, signal),
            None => Vec::new(),
        }
    }

    /// Fire the identity debounce if due.
    pub fn poll<D: Dom>(&mut self, dom: &D, now: Instant) -> Vec<MonitorEvent> {
        let Some(change) = self.resolver.poll(now) else {
            return Vec::new();
        };
        if change.current.is_none() {
            return Vec::new();
        }

        match self.video {
            Some(video) => self.track(dom, video),
            None => {
                tracing::debug!("No video element yet, tracking deferred");
                Vec::new()
            }
        }
    }

    fn handle_watch<D: Dom>(
        &mut self,
        dom: &D,
        changes: Vec<WatchEvent>,
        now: Instant,
    ) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        let mut text_changed = false;

        for change in changes {
            let observer = change.observer;
            if observer == self.observers.player {
                self.on_player(dom, &change.kind, &mut events);
            } else if observer == self.observers.video {
                self.on_video(dom, &change.kind, &mut events);
            } else if observer == self.observers.title || observer == self.observers.subtitle {
                text_changed = true;
            }
        }

        if text_changed {
            self.read_title_panel(dom, now);
        }
        events
    }

    fn on_player<D: Dom>(&mut self, dom: &D, kind: &WatchEventKind, events: &mut Vec<MonitorEvent>) {
        let visible = match kind {
            WatchEventKind::Added(node) | WatchEventKind::AttributeChanged { node, .. } => {
                dom.has_class(*node, &self.fullscreen_class)
            }
            WatchEventKind::Removed(_) => false,
            WatchEventKind::Mutation(_) => return,
        };

        if visible == self.visible {
            return;
        }
        self.visible = visible;

        let identity = self.resolver.current().cloned();
        if visible {
            tracing::info!(?identity, "Player opened");
            events.push(MonitorEvent::Opened(identity));
        } else {
            tracing::info!(?identity, "Player closed");
            self.announced = None;
            events.push(MonitorEvent::Closed(identity));
        }
    }

    fn on_video<D: Dom>(&mut self, dom: &D, kind: &WatchEventKind, events: &mut Vec<MonitorEvent>) {
        match *kind {
            WatchEventKind::Added(node) => {
                if self.tracker.node() == Some(node) {
                    self.video = Some(node);
                    return;
                }
                if let Some(old) = self.tracker.node() {
                    tracing::debug!(?old, ?node, "Video element replaced");
                    self.on_video(dom, &WatchEventKind::Removed(old), events);
                }

                self.video = Some(node);
                if self.resolver.current().is_some() {
                    events.extend(self.track(dom, node));
                }
            }
            WatchEventKind::Removed(node) => {
                if self.video == Some(node) {
                    self.video = None;
                }
                if self.tracker.node() == Some(node) {
                    self.tracker.stop();
                    self.announced = None;
                }
            }
            _ => {}
        }
    }

    fn read_title_panel<D: Dom>(&mut self, dom: &D, now: Instant) {
        let title = self
            .watcher
            .first(self.observers.title)
            .and_then(|node| dom.text_content(node));
        let subtitles: Vec<String> = self
            .watcher
            .all(self.observers.subtitle)
            .iter()
            .filter_map(|&node| dom.text_content(node))
            .collect();

        self.resolver.update(title.as_deref(), &subtitles, now);
    }

    fn track<D: Dom>(&mut self, dom: &D, node: NodeId) -> Vec<MonitorEvent> {
        let signals = self.tracker.start(dom, node);
        signals
            .into_iter()
            .flat_map(|signal| self.relabel(dom, signal))
            .collect()
    }

    /// Put a tracker signal on the monitor stream, announcing a new identity
    /// the first time the element is ready or plays.
    fn relabel<D: Dom>(&mut self, dom: &D, signal: TrackerEvent) -> Vec<MonitorEvent> {
        match signal {
            TrackerEvent::Loading => vec![MonitorEvent::Loading],
            TrackerEvent::Loaded => match self.announce() {
                Announcement::New(identity) => vec![MonitorEvent::Created(identity)],
                Announcement::Same => vec![MonitorEvent::Loaded],
                Announcement::Unknown => Vec::new(),
            },
            TrackerEvent::Started => match self.announce() {
                Announcement::New(identity) => {
                    vec![MonitorEvent::Created(identity), MonitorEvent::Started]
                }
                Announcement::Same => vec![MonitorEvent::Started],
                Announcement::Unknown => Vec::new(),
            },
            TrackerEvent::Paused => vec![MonitorEvent::Paused],
            TrackerEvent::Stopped => vec![MonitorEvent::Stopped],
            TrackerEvent::Progress(time) => vec![MonitorEvent::Progress {
                time,
                duration: self.tracker.duration(dom),
            }],
            TrackerEvent::Seeked(time) => vec![MonitorEvent::Seeked {
                time,
                duration: self.tracker.duration(dom),
            }],
        }
    }

    fn announce(&mut self) -> Announcement {
        let Some(current) = self.resolver.current() else {
            tracing::debug!("No identity yet, suppressing playback signal");
            return Announcement::Unknown;
        };
        if self.announced.as_ref() == Some(current) {
            return Announcement::Same;
        }
        let current = current.clone();
        self.announced = Some(current.clone());
        Announcement::New(current)
    }
}

enum Announcement {
    New(MediaIdentity),
    Same,
    Unknown,
}
