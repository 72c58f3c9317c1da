//! Trait definitions for the catalog and the page transport.
//!
//! The enrichment flow only sees these traits, so tests drive it with stubs
//! and the runtime can swap the HTTP client for anything that answers the
//! same questions.

use std::future::Future;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Read access to the video catalog.
pub trait CatalogService: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Look up titles by catalog id.
    fn get_titles(
        &self,
        ids: &[String],
    ) -> impl Future<Output = Result<Vec<CatalogTitle>, Self::Error>> + Send;

    /// All seasons of a show.
    fn get_show_seasons(
        &self,
        show_id: &str,
    ) -> impl Future<Output = Result<Vec<CatalogTitle>, Self::Error>> + Send;

    /// All episodes of a season.
    fn get_season_episodes(
        &self,
        season_id: &str,
    ) -> impl Future<Output = Result<Vec<CatalogTitle>, Self::Error>> + Send;

    /// The season of a show with the given number, if listed.
    fn get_show_season(
        &self,
        show_id: &str,
        number: u32,
    ) -> impl Future<Output = Result<Option<CatalogTitle>, Self::Error>> + Send {
        async move {
            let seasons = self.get_show_seasons(show_id).await?;
            let found = seasons.into_iter().find(|s| s.number == Some(number));
            if found.is_none() {
                tracing::warn!(show_id, number, "Season not listed");
            }
            Ok(found)
        }
    }

    /// The episode of a season with the given number, if listed.
    ///
    /// Episode listings can span seasons, so the episode's own season
    /// ancestor must also match `season_number`.
    fn get_season_episode(
        &self,
        season_id: &str,
        season_number: u32,
        number: u32,
    ) -> impl Future<Output = Result<Option<CatalogTitle>, Self::Error>> + Send {
        async move {
            let episodes = self.get_season_episodes(season_id).await?;
            let found = episodes.into_iter().find(|e| {
                e.number == Some(number)
                    && e.ancestor(ContentType::Season)
                        .map_or(true, |s| s.number == Some(season_number))
            });
            if found.is_none() {
                tracing::warn!(season_id, season_number, number, "Episode not listed");
            }
            Ok(found)
        }
    }
}

/// Kind of catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentType {
    Movie,
    Series,
    Season,
    Episode,
    #[serde(other)]
    Other,
}

/// A catalog entry as the catalog describes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogTitle {
    pub title_id: String,
    pub title: String,
    #[serde(default)]
    pub number: Option<u32>,
    pub content_type: ContentType,
    #[serde(default)]
    pub runtime: Option<Runtime>,
    #[serde(default)]
    pub release_or_first_airing_date: Option<AiringDate>,
    #[serde(default)]
    pub ancestor_titles: Vec<AncestorTitle>,
}

impl CatalogTitle {
    /// First ancestor of the given kind.
    pub fn ancestor(&self, kind: ContentType) -> Option<&AncestorTitle> {
        self.ancestor_titles.iter().find(|a| a.content_type == kind)
    }

    pub fn year(&self) -> Option<i32> {
        self.release_or_first_airing_date.as_ref()?.year()
    }

    pub fn runtime_ms(&self) -> Option<u64> {
        self.runtime.as_ref().map(|r| r.value_millis)
    }
}

/// A parent entry (series or season) listed on a title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AncestorTitle {
    pub title_id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub number: Option<u32>,
    pub content_type: ContentType,
    #[serde(default)]
    pub release_or_first_airing_date: Option<AiringDate>,
}

impl AncestorTitle {
    pub fn year(&self) -> Option<i32> {
        self.release_or_first_airing_date.as_ref()?.year()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runtime {
    pub value_millis: u64,
}

/// Release date in microseconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiringDate {
    pub value_date: i64,
}

impl AiringDate {
    pub fn year(&self) -> Option<i32> {
        match DateTime::<Utc>::from_timestamp_millis(self.value_date / 1000) {
            Some(date) => Some(date.year()),
            None => {
                tracing::warn!(value = self.value_date, "Unable to parse release date");
                None
            }
        }
    }
}

/// Parameters every catalog request carries, read from the player page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageConfiguration {
    #[serde(rename = "deviceID")]
    pub device_id: String,
    #[serde(rename = "deviceTypeID")]
    pub device_type_id: String,
    pub firmware: u32,
    #[serde(rename = "marketplaceID")]
    pub marketplace_id: String,
    #[serde(rename = "customerID")]
    pub customer_id: String,
    pub token: String,
}

impl PageConfiguration {
    /// Device type the web player identifies as.
    pub const HTML5_DEVICE_TYPE: &'static str = "AOAGZA014O5RE";
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("configuration unavailable: {0}")]
    Unavailable(String),

    #[error("transport closed")]
    Closed,
}

/// The messaging channel to the page context.
pub trait Transport: Send + Sync {
    /// Ask the page for the catalog request configuration.
    fn request_configuration(
        &self,
    ) -> impl Future<Output = Result<PageConfiguration, TransportError>> + Send;
}
