use chrono::{DateTime, Utc};
use kansoku_parse::{MediaIdentity, PageIdentifier};
use serde::{Deserialize, Serialize};

/// Identifiers an item is known by.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemKeys {
    /// Identifier taken from the page URL (or last play click).
    pub page_id: Option<PageIdentifier>,
    /// Canonical catalog id, once enrichment has resolved it.
    pub catalog_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub keys: ItemKeys,
    pub title: String,
    pub year: Option<i32>,
    pub duration_ms: Option<u64>,
    pub fetched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub keys: ItemKeys,
    pub title: String,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub keys: ItemKeys,
    pub number: u32,
    pub year: Option<i32>,
    pub show: Show,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub keys: ItemKeys,
    pub title: String,
    pub number: u32,
    pub duration_ms: Option<u64>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub season: Season,
}

/// The metadata record a session reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaItem {
    Movie(Movie),
    Episode(Episode),
}

impl MediaItem {
    /// Build the local item for an identity. The page id goes on the movie,
    /// or on the season for episodes (episode pages are season pages).
    pub fn from_identity(identity: &MediaIdentity, page_id: PageIdentifier) -> Self {
        let keys = ItemKeys {
            page_id: Some(page_id),
            catalog_id: None,
        };
        match identity {
            MediaIdentity::Movie { title } => Self::Movie(Movie {
                keys,
                title: title.clone(),
                year: None,
                duration_ms: None,
                fetched_at: None,
            }),
            MediaIdentity::Episode {
                show_title,
                season_number,
                episode_number,
                episode_title,
            } => Self::Episode(Episode {
                keys: ItemKeys::default(),
                title: episode_title.clone(),
                number: *episode_number,
                duration_ms: None,
                fetched_at: None,
                season: Season {
                    keys,
                    number: *season_number,
                    year: None,
                    show: Show {
                        keys: ItemKeys::default(),
                        title: show_title.clone(),
                        year: None,
                    },
                },
            }),
        }
    }

    pub fn page_id(&self) -> Option<&PageIdentifier> {
        match self {
            Self::Movie(movie) => movie.keys.page_id.as_ref(),
            Self::Episode(episode) => episode.season.keys.page_id.as_ref(),
        }
    }

    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            Self::Movie(movie) => movie.duration_ms,
            Self::Episode(episode) => episode.duration_ms,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Movie(movie) => &movie.title,
            Self::Episode(episode) => &episode.title,
        }
    }

    /// Take auxiliary fields (ids, years, durations, fetch time, movie and
    /// episode titles) from `other`.
    ///
    /// Returns `false` and changes nothing when `other` describes a
    /// different thing: another kind, or another season or episode number.
    pub fn refine(&mut self, other: &MediaItem) -> bool {
        match (self, other) {
            (Self::Movie(mine), Self::Movie(theirs)) => {
                refine_keys(&mut mine.keys, &theirs.keys);
                mine.title.clone_from(&theirs.title);
                mine.year = theirs.year.or(mine.year);
                mine.duration_ms = theirs.duration_ms.or(mine.duration_ms);
                mine.fetched_at = theirs.fetched_at.or(mine.fetched_at);
                true
            }
            (Self::Episode(mine), Self::Episode(theirs))
                if mine.number == theirs.number
                    && mine.season.number == theirs.season.number =>
            {
                refine_keys(&mut mine.keys, &theirs.keys);
                mine.title.clone_from(&theirs.title);
                mine.duration_ms = theirs.duration_ms.or(mine.duration_ms);
                mine.fetched_at = theirs.fetched_at.or(mine.fetched_at);

                refine_keys(&mut mine.season.keys, &theirs.season.keys);
                mine.season.year = theirs.season.year.or(mine.season.year);

                refine_keys(&mut mine.season.show.keys, &theirs.season.show.keys);
                mine.season.show.year = theirs.season.show.year.or(mine.season.show.year);
                true
            }
            _ => false,
        }
    }
}

fn refine_keys(mine: &mut ItemKeys, theirs: &ItemKeys) {
    if theirs.catalog_id.is_some() {
        mine.catalog_id.clone_from(&theirs.catalog_id);
    }
}
