pub mod item;
pub mod session;

pub use item::{Episode, ItemKeys, MediaItem, Movie, Season, Show};
pub use session::{PlaybackSample, Session, SessionSnapshot, SessionState};
