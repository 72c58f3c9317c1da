//! The session state machine.
//!
//! Reduces [`MonitorEvent`]s into one ordered lifecycle per playback session
//! (created → started → progress* → paused → ended), with stall detection
//! and a confirmation delay before pauses are published.

use kansoku_parse::{MediaIdentity, PageIdentifier, PatternSet};
use serde::Serialize;
use tokio::time::Instant;

use crate::config::SessionConfig;
use crate::models::{MediaItem, PlaybackSample, Session, SessionSnapshot, SessionState};
use crate::monitor::MonitorEvent;

/// What the host is told.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ActivityEvent {
    Opened(Option<MediaIdentity>),
    Closed(Option<MediaIdentity>),
    Created(SessionSnapshot),
    Started(SessionSnapshot),
    Progress(SessionSnapshot),
    Seeked(SessionSnapshot),
    Paused(SessionSnapshot),
    Ended(SessionSnapshot),
    Enriched(SessionSnapshot),
}

impl ActivityEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Opened(_) => "opened",
            Self::Closed(_) => "closed",
            Self::Created(_) => "created",
            Self::Started(_) => "started",
            Self::Progress(_) => "progress",
            Self::Seeked(_) => "seeked",
            Self::Paused(_) => "paused",
            Self::Ended(_) => "ended",
            Self::Enriched(_) => "enriched",
        }
    }

    pub fn snapshot(&self) -> Option<&SessionSnapshot> {
        match self {
            Self::Opened(_) | Self::Closed(_) => None,
            Self::Created(s)
            | Self::Started(s)
            | Self::Progress(s)
            | Self::Seeked(s)
            | Self::Paused(s)
            | Self::Ended(s)
            | Self::Enriched(s) => Some(s),
        }
    }
}

/// Where the page is, for identifier derivation.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub url: String,
    pub last_clicked: Option<PageIdentifier>,
}

pub struct SessionEngine {
    config: SessionConfig,
    patterns: PatternSet,
    session: Option<Session>,
    next_key: u64,
    last_progress_at: Option<Instant>,
    pause_deadline: Option<Instant>,
}

impl SessionEngine {
    pub fn new(config: SessionConfig, patterns: PatternSet) -> Self {
        Self {
            config,
            patterns,
            session: None,
            next_key: 0,
            last_progress_at: None,
            pause_deadline: None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// When the pending pause confirmation is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.pause_deadline
    }

    /// Apply one monitor event.
    pub fn handle(
        &mut self,
        event: MonitorEvent,
        page: &PageContext,
        now: Instant,
    ) -> Vec<ActivityEvent> {
        let mut out = Vec::new();
        match event {
            MonitorEvent::Opened(identity) => out.push(ActivityEvent::Opened(identity)),
            MonitorEvent::Closed(identity) => {
                out.push(ActivityEvent::Closed(identity));
                if self.live().is_some() {
                    self.end(&mut out);
                }
            }
            MonitorEvent::Created(identity) => self.create(identity, page, &mut out),
            MonitorEvent::Started => self.start(&mut out),
            MonitorEvent::Progress { time, duration } => {
                self.progress(time, duration, now, &mut out)
            }
            MonitorEvent::Seeked { time, duration } => self.seek(time, duration, &mut out),
            MonitorEvent::Paused => self.pause(now),
            MonitorEvent::Stopped => self.end(&mut out),
            MonitorEvent::Loading | MonitorEvent::Loaded => {
                tracing::trace!(?event, "Ignoring load signal");
            }
        }
        out
    }

    /// Publish a confirmed pause if its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Vec<ActivityEvent> {
        match self.pause_deadline {
            Some(deadline) if deadline <= now => self.pause_deadline = None,
            _ => return Vec::new(),
        }

        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        if session.state != SessionState::Pausing {
            return Vec::new();
        }

        session.state = SessionState::Paused;
        tracing::info!(key = session.key, "Session paused");
        vec![ActivityEvent::Paused(session.snapshot())]
    }

    /// Merge a finished enrichment into the session it was started for.
    pub fn apply_enrichment(&mut self, key: u64, item: &MediaItem) -> Option<ActivityEvent> {
        let session = self.session.as_mut().filter(|s| s.key == key);
        let Some(session) = session else {
            tracing::debug!(key, "Dropping enrichment for a stale session");
            return None;
        };

        if !session.item.refine(item) {
            tracing::warn!(key, "Enriched item doesn't match the session, ignoring");
            return None;
        }
        tracing::info!(key, "Session enriched");
        Some(ActivityEvent::Enriched(session.snapshot()))
    }

    fn live(&mut self) -> Option<&mut Session> {
        self.session.as_mut().filter(|s| s.state.is_active())
    }

    #[tracing::instrument(skip(self, page, out), fields(url = %page.url))]
    fn create(
        &mut self,
        identity: MediaIdentity,
        page: &PageContext,
        out: &mut Vec<ActivityEvent>,
    ) {
        let page_id =
            match PageIdentifier::derive(&self.patterns, &page.url, page.last_clicked.as_ref()) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(error = %e, %identity, "No page identifier, session not created");
                    return;
                }
            };

        if let Some(session) = self.live() {
            if session.identity == identity && session.page_id == page_id {
                tracing::debug!(key = session.key, "Session already exists, treating as started");
                self.start(out);
                return;
            }
        }

        if self.live().is_some() {
            self.end(out);
        }

        self.pause_deadline = None;
        self.last_progress_at = None;

        let key = self.next_key;
        self.next_key += 1;
        let session = Session::new(key, identity, page_id);
        tracing::info!(key, identity = %session.identity, page_id = %session.page_id, "Session created");
        out.push(ActivityEvent::Created(session.snapshot()));
        self.session = Some(session);
    }

    fn start(&mut self, out: &mut Vec<ActivityEvent>) {
        self.pause_deadline = None;
        let Some(session) = self.live() else {
            tracing::debug!("No active session, ignoring start");
            return;
        };

        if session.state == SessionState::Stalled {
            session.state = session
                .stalled_previous_state
                .unwrap_or(SessionState::Loading);
        }
        session.clear_stall();

        match session.state {
            SessionState::Playing | SessionState::Ended => {}
            SessionState::Pausing => {
                tracing::debug!(key = session.key, "Pause withdrawn before confirmation");
                session.state = SessionState::Playing;
            }
            SessionState::Loading | SessionState::Paused | SessionState::Stalled => {
                session.state = SessionState::Playing;
                tracing::info!(key = session.key, "Session started");
                out.push(ActivityEvent::Started(session.snapshot()));
            }
        }
    }

    fn pause(&mut self, now: Instant) {
        let deadline = now + self.config.pause_confirmation();
        let Some(session) = self.live() else {
            tracing::debug!("No active session, ignoring pause");
            return;
        };
        if !matches!(session.state, SessionState::Playing | SessionState::Stalled) {
            return;
        }

        session.state = SessionState::Pausing;
        session.clear_stall();
        tracing::debug!(key = session.key, "Session pausing");
        self.pause_deadline = Some(deadline);
    }

    fn progress(
        &mut self,
        time: Option<u64>,
        duration: Option<u64>,
        now: Instant,
        out: &mut Vec<ActivityEvent>,
    ) {
        let Some(time) = time else {
            tracing::trace!("Ignoring progress without a time");
            return;
        };
        let stall_threshold = self.config.stall_threshold();
        let progress_interval = self.config.progress_interval();
        let last_progress_at = self.last_progress_at;
        let Some(session) = self.live() else {
            return;
        };

        if duration.is_some() {
            session.duration_ms = duration;
        }
        let was = session.state;
        let forward = session.time_ms.map_or(true, |previous| time > previous);
        session.samples.push(PlaybackSample { time_ms: time });
        session.time_ms = Some(time);

        if forward {
            if was == SessionState::Playing {
                session.clear_stall();
            } else {
                self.start(out);
            }
        } else {
            let state = session.state;
            match state {
                SessionState::Stalled
                    if session
                        .stalled_at
                        .is_some_and(|at| now.duration_since(at) > stall_threshold) =>
                {
                    tracing::debug!(key = session.key, "Stalled past threshold, assuming paused");
                    self.pause(now);
                }
                SessionState::Stalled | SessionState::Pausing | SessionState::Paused => {}
                state => {
                    tracing::debug!(key = session.key, ?state, "Playback stalled");
                    session.stalled_previous_state = Some(state);
                    session.stalled_at = Some(now);
                    session.state = SessionState::Stalled;
                }
            }
        }

        if was != SessionState::Playing {
            return;
        }
        let Some(session) = self.live() else {
            return;
        };
        if session.state != SessionState::Playing {
            return;
        }

        if session.progress().is_some_and(|p| p >= 100.0) {
            tracing::info!(key = session.key, "Reached the end of the video");
            self.end(out);
            return;
        }

        let due = last_progress_at.map_or(true, |at| now.duration_since(at) >= progress_interval);
        if due {
            out.push(ActivityEvent::Progress(session.snapshot()));
            self.last_progress_at = Some(now);
        }
    }

    fn seek(&mut self, time: Option<u64>, duration: Option<u64>, out: &mut Vec<ActivityEvent>) {
        self.pause_deadline = None;
        let Some(session) = self.live() else {
            tracing::debug!("No active session, ignoring seek");
            return;
        };

        if time.is_some() {
            session.time_ms = time;
        }
        if duration.is_some() {
            session.duration_ms = duration;
        }
        session.state = SessionState::Playing;
        session.clear_stall();
        tracing::debug!(key = session.key, time = ?session.time_ms, "Session seeked");
        out.push(ActivityEvent::Seeked(session.snapshot()));
    }

    fn end(&mut self, out: &mut Vec<ActivityEvent>) {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("No session, ignoring end");
            return;
        };

        let state = match session.state {
            SessionState::Stalled => session
                .stalled_previous_state
                .unwrap_or(SessionState::Loading),
            state => state,
        };
        if matches!(state, SessionState::Loading | SessionState::Ended) {
            tracing::debug!(key = session.key, ?state, "Session never started, not ending");
            return;
        }

        session.state = SessionState::Ended;
        session.clear_stall();
        self.pause_deadline = None;
        tracing::info!(key = session.key, "Session ended");
        out.push(ActivityEvent::Ended(session.snapshot()));
    }
}
