use kansoku_parse::{MediaIdentity, PageIdentifier};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::item::MediaItem;

/// Lifecycle state of a playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Loading,
    Playing,
    /// Paused on the page, not yet published.
    Pausing,
    Paused,
    /// Position stopped advancing without a pause.
    Stalled,
    Ended,
}

impl SessionState {
    pub fn is_active(self) -> bool {
        self != Self::Ended
    }
}

/// One progress tick, as seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackSample {
    pub time_ms: u64,
}

/// The one playback session being tracked.
#[derive(Debug, Clone)]
pub struct Session {
    pub key: u64,
    pub identity: MediaIdentity,
    pub page_id: PageIdentifier,
    pub item: MediaItem,
    pub state: SessionState,
    pub time_ms: Option<u64>,
    pub duration_ms: Option<u64>,
    pub samples: Vec<PlaybackSample>,
    pub stalled_at: Option<Instant>,
    pub stalled_previous_state: Option<SessionState>,
}

impl Session {
    pub fn new(key: u64, identity: MediaIdentity, page_id: PageIdentifier) -> Self {
        let item = MediaItem::from_identity(&identity, page_id.clone());
        Self {
            key,
            identity,
            page_id,
            item,
            state: SessionState::Loading,
            time_ms: None,
            duration_ms: None,
            samples: Vec::new(),
            stalled_at: None,
            stalled_previous_state: None,
        }
    }

    /// Duration reported by the media element, else the catalog's.
    pub fn known_duration(&self) -> Option<u64> {
        self.duration_ms
            .or_else(|| self.item.duration_ms())
            .filter(|&d| d > 0)
    }

    /// Playback position as a percentage of the known duration.
    pub fn progress(&self) -> Option<f64> {
        let time = self.time_ms?;
        let duration = self.known_duration()?;
        Some(time as f64 / duration as f64 * 100.0)
    }

    pub fn clear_stall(&mut self) {
        self.stalled_at = None;
        self.stalled_previous_state = None;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            key: self.key,
            item: self.item.clone(),
            state: self.state,
            time_ms: self.time_ms,
            duration_ms: self.known_duration(),
            progress: self.progress(),
            sample_count: self.samples.len(),
        }
    }
}

/// What hosts receive about a session with each event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub key: u64,
    pub item: MediaItem,
    pub state: SessionState,
    pub time_ms: Option<u64>,
    pub duration_ms: Option<u64>,
    pub progress: Option<f64>,
    pub sample_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            0,
            MediaIdentity::Movie {
                title: "Manchester by the Sea".into(),
            },
            PageIdentifier::new("B00ABCDEF1").unwrap(),
        )
    }

    #[test]
    fn test_new_session_is_loading() {
        let s = session();
        assert_eq!(s.state, SessionState::Loading);
        assert!(s.progress().is_none());
        assert_eq!(s.item.page_id().map(|p| p.as_str()), Some("B00ABCDEF1"));
    }

    #[test]
    fn test_progress_prefers_media_duration() {
        let mut s = session();
        s.time_ms = Some(30_000);
        assert!(s.progress().is_none());

        if let MediaItem::Movie(m) = &mut s.item {
            m.duration_ms = Some(120_000);
        }
        assert_eq!(s.progress(), Some(25.0));

        s.duration_ms = Some(60_000);
        assert_eq!(s.progress(), Some(50.0));
        assert_eq!(s.snapshot().duration_ms, Some(60_000));
    }

    #[test]
    fn test_state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&SessionState::Pausing).unwrap(),
            r#""pausing""#
        );
    }
}
