//! Playback tracking for the video player page.
//!
//! [`PlayerMonitor`] watches the page and turns DOM and media changes into
//! [`MonitorEvent`]s. [`SessionEngine`] reduces those into per-session
//! [`ActivityEvent`]s, and [`enrich`] fills in catalog metadata.

pub mod activity_log;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod models;
pub mod monitor;
pub mod resolver;
pub mod tracker;

pub use activity_log::{shared_activity_log, ActivityEntry, ActivityLog, SharedActivityLog};
pub use config::AppConfig;
pub use engine::{ActivityEvent, PageContext, SessionEngine};
pub use enrich::enrich;
pub use error::KansokuError;
pub use models::{MediaItem, Session, SessionSnapshot, SessionState};
pub use monitor::{MonitorEvent, PlayerMonitor};
pub use resolver::{IdentityChange, IdentityResolver};
pub use tracker::{MediaEvent, MediaEventKind, MediaTracker, TrackerEvent};
