use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::text;

/// "Season {N}, Ep. {M} {title}", with case-sensitive markers.
static RE_EPISODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Season (\d+), Ep\. (\d+) (.+)$").unwrap());

/// What is playing, as inferred from the player's title panel.
///
/// Equality is structural: two identities parsed from the same text are
/// equal even if they were produced by different mutations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaIdentity {
    Movie {
        title: String,
    },
    Episode {
        show_title: String,
        season_number: u32,
        episode_number: u32,
        episode_title: String,
    },
}

impl fmt::Display for MediaIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Movie { title } => write!(f, "{title}"),
            Self::Episode {
                show_title,
                season_number,
                episode_number,
                episode_title,
            } => write!(
                f,
                "{show_title} S{season_number:02}E{episode_number:02} \"{episode_title}\""
            ),
        }
    }
}

/// Build an identity from the title panel text.
///
/// - No title (or only whitespace) gives `Ok(None)`.
/// - No subtitle segments give a movie.
/// - Otherwise the first segment that follows the episode grammar gives an
///   episode; if none does, the subtitle is unrecognized.
pub fn parse_identity(
    title: Option<&str>,
    subtitles: Option<&[String]>,
) -> Result<Option<MediaIdentity>, ParseError> {
    let Some(title) = title.and_then(text::clean) else {
        return Ok(None);
    };

    let segments = match subtitles.and_then(text::clean_segments) {
        Some(segments) => segments,
        None => return Ok(Some(MediaIdentity::Movie { title })),
    };

    for segment in &segments {
        if let Some(episode) = parse_episode(&title, segment)? {
            return Ok(Some(episode));
        }
    }

    Err(ParseError::UnrecognizedSubtitle(segments.join(" | ")))
}

/// Parse one subtitle segment against the episode grammar.
fn parse_episode(show_title: &str, segment: &str) -> Result<Option<MediaIdentity>, ParseError> {
    let Some(caps) = RE_EPISODE.captures(segment) else {
        return Ok(None);
    };

    let season_number = parse_number(&caps[1])?;
    let episode_number = parse_number(&caps[2])?;
    let episode_title = caps[3].trim().to_string();

    Ok(Some(MediaIdentity::Episode {
        show_title: show_title.to_string(),
        season_number,
        episode_number,
        episode_title,
    }))
}

fn parse_number(digits: &str) -> Result<u32, ParseError> {
    digits
        .parse()
        .map_err(|_| ParseError::InvalidNumber(digits.to_string()))
}
