//! Catalog lookups that refine a session's locally inferred item.

use chrono::Utc;
use kansoku_api::{CatalogService, CatalogTitle, ContentType};

use crate::error::KansokuError;
use crate::models::{Episode, MediaItem, Movie};

fn failure(err: impl std::fmt::Display) -> KansokuError {
    KansokuError::EnrichmentFailure(err.to_string())
}

/// Resolve catalog ids, years and durations for `item`.
///
/// Returns an enriched copy; `item` itself is never touched, so a failure
/// leaves the session with what it inferred from the page.
#[tracing::instrument(skip_all, fields(title = item.title()))]
pub async fn enrich<C: CatalogService>(
    catalog: &C,
    item: &MediaItem,
) -> Result<MediaItem, KansokuError> {
    let enriched = match item {
        MediaItem::Movie(movie) => MediaItem::Movie(enrich_movie(catalog, movie).await?),
        MediaItem::Episode(episode) => {
            MediaItem::Episode(enrich_episode(catalog, episode).await?)
        }
    };
    tracing::debug!("Enrichment complete");
    Ok(enriched)
}

async fn first_title<C: CatalogService>(
    catalog: &C,
    id: &str,
) -> Result<CatalogTitle, KansokuError> {
    catalog
        .get_titles(&[id.to_string()])
        .await
        .map_err(failure)?
        .into_iter()
        .next()
        .ok_or_else(|| failure(format!("no catalog entry for {id}")))
}

async fn enrich_movie<C: CatalogService>(
    catalog: &C,
    movie: &Movie,
) -> Result<Movie, KansokuError> {
    let page_id = movie
        .keys
        .page_id
        .as_ref()
        .ok_or_else(|| failure("movie has no page identifier"))?;

    tracing::debug!(%page_id, "Fetching movie");
    let metadata = first_title(catalog, page_id.as_str()).await?;

    let mut enriched = movie.clone();
    enriched.keys.catalog_id = Some(metadata.title_id.clone());
    enriched.title = metadata.title.clone();
    enriched.year = metadata.year();
    enriched.duration_ms = metadata.runtime_ms();
    enriched.fetched_at = Some(Utc::now());
    Ok(enriched)
}

async fn enrich_episode<C: CatalogService>(
    catalog: &C,
    episode: &Episode,
) -> Result<Episode, KansokuError> {
    let page_id = episode
        .season
        .keys
        .page_id
        .as_ref()
        .ok_or_else(|| failure("episode has no page identifier"))?;
    let fetched_at = Utc::now();
    let mut enriched = episode.clone();

    // The page describes the season (or the episode); its series ancestor
    // is the show.
    tracing::debug!(%page_id, "Fetching show");
    let page = first_title(catalog, page_id.as_str()).await?;
    let (show_id, series_year) = match page.content_type {
        ContentType::Series => (page.title_id.clone(), page.year()),
        _ => {
            let series = page
                .ancestor(ContentType::Series)
                .ok_or_else(|| failure(format!("{} has no series ancestor", page.title_id)))?;
            (series.title_id.clone(), series.year())
        }
    };

    // Show year is the earlier of the series date and season 1's.
    let first_season_year = catalog
        .get_show_season(&show_id, 1)
        .await
        .map_err(failure)?
        .and_then(|season| season.year());
    enriched.season.show.keys.catalog_id = Some(show_id.clone());
    enriched.season.show.year = match (series_year, first_season_year) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => b.or(a),
    };

    tracing::debug!(%show_id, number = episode.season.number, "Fetching season");
    let season = catalog
        .get_show_season(&show_id, episode.season.number)
        .await
        .map_err(failure)?
        .ok_or_else(|| failure(format!("season {} not listed", episode.season.number)))?;
    enriched.season.keys.catalog_id = Some(season.title_id.clone());
    enriched.season.year = season.year();

    tracing::debug!(season_id = %season.title_id, number = episode.number, "Fetching episode");
    let metadata = catalog
        .get_season_episode(&season.title_id, episode.season.number, episode.number)
        .await
        .map_err(failure)?
        .ok_or_else(|| {
            failure(format!(
                "episode {}x{} not listed",
                episode.season.number, episode.number
            ))
        })?;
    enriched.keys.catalog_id = Some(metadata.title_id.clone());
    enriched.title = metadata.title.clone();
    enriched.duration_ms = metadata.runtime_ms();
    enriched.fetched_at = Some(fetched_at);

    Ok(enriched)
}
