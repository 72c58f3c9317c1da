//! Text-level recognition for the player page.
//!
//! Turns the title panel's text into a [`MediaIdentity`] and the page URL
//! into a [`PageIdentifier`]. Nothing here touches the DOM or keeps state.

pub mod error;
pub mod identity;
pub mod page;
pub mod text;

pub use error::ParseError;
pub use identity::{parse_identity, MediaIdentity};
pub use page::{PageIdentifier, PatternDef, PatternSet};
