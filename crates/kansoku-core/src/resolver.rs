use std::time::Duration;

use kansoku_parse::{parse_identity, text, MediaIdentity};
use tokio::time::Instant;

/// The identity moved from `previous` to `current`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityChange {
    pub previous: Option<MediaIdentity>,
    pub current: Option<MediaIdentity>,
}

/// Debounces title panel text into a settled [`MediaIdentity`].
///
/// The player rewrites the panel several times while an item loads, so text
/// is only parsed once it has been quiet for the debounce period.
#[derive(Debug)]
pub struct IdentityResolver {
    debounce: Duration,
    title: Option<String>,
    subtitles: Vec<String>,
    deadline: Option<Instant>,
    current: Option<MediaIdentity>,
}

impl IdentityResolver {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            title: None,
            subtitles: Vec::new(),
            deadline: None,
            current: None,
        }
    }

    /// The last identity emitted.
    pub fn current(&self) -> Option<&MediaIdentity> {
        self.current.as_ref()
    }

    /// When the pending recompute is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Record the panel text. Reschedules the recompute only if the
    /// normalized text differs from what was last seen.
    pub fn update<S: AsRef<str>>(
        &mut self,
        title: Option<&str>,
        subtitles: &[S],
        now: Instant,
    ) -> bool {
        let title = title.and_then(text::clean);
        let subtitles = text::clean_segments(subtitles).unwrap_or_default();

        if title == self.title && subtitles == self.subtitles {
            return false;
        }

        tracing::trace!(?title, ?subtitles, "Title panel changed");
        self.title = title;
        self.subtitles = subtitles;
        self.deadline = Some(now + self.debounce);
        true
    }

    /// Recompute the identity if the debounce deadline has passed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn poll(&mut self, now: Instant) -> Option<IdentityChange> {
        match self.deadline {
            Some(deadline) if deadline <= now => self.deadline = None,
            _ => return None,
        }

        let subtitles = (!self.subtitles.is_empty()).then_some(self.subtitles.as_slice());
        let identity = match parse_identity(self.title.as_deref(), subtitles) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(error = %e, "Unable to parse title panel");
                None
            }
        };

        if identity == self.current {
            tracing::trace!("Identity unchanged");
            return None;
        }

        let previous = std::mem::replace(&mut self.current, identity.clone());
        match &identity {
            Some(identity) => tracing::info!(%identity, "Identity changed"),
            None => tracing::info!("Identity cleared"),
        }
        Some(IdentityChange {
            previous,
            current: identity,
        })
    }
}
