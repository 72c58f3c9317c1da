use reqwest::Client;

use super::error::CatalogError;
use super::types::parse_titles;
use crate::traits::{CatalogService, CatalogTitle, PageConfiguration};

const DETAILS_PATH: &str = "/cdp/catalog/GetASINDetails";

/// HTTP client for the video catalog.
///
/// Every request carries the page configuration as query parameters.
pub struct CatalogClient {
    base_url: String,
    configuration: PageConfiguration,
    http: Client,
}

impl CatalogClient {
    pub fn new(base_url: impl Into<String>, configuration: PageConfiguration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            configuration,
            http: Client::new(),
        }
    }

    async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            Err(CatalogError::Api {
                status,
                message: body,
            })
        }
    }

    async fn details(&self, params: &[(&str, String)]) -> Result<Vec<CatalogTitle>, CatalogError> {
        let resp = self
            .http
            .post(format!("{}{DETAILS_PATH}", self.base_url))
            .query(&self.configuration)
            .query(params)
            .send()
            .await?;

        let resp = Self::check_response(resp).await?;
        let body = resp.text().await?;
        let titles = parse_titles(&body)?;
        tracing::debug!(count = titles.len(), "Catalog returned titles");
        Ok(titles)
    }
}

impl CatalogService for CatalogClient {
    type Error = CatalogError;

    async fn get_titles(&self, ids: &[String]) -> Result<Vec<CatalogTitle>, CatalogError> {
        let titles = self
            .details(&[
                ("asinlist", ids.join(",")),
                ("IncludeAll", "T".into()),
                ("version", "2".into()),
            ])
            .await?;

        if titles.is_empty() {
            return Err(CatalogError::NotFound(ids.join(",")));
        }
        Ok(titles)
    }

    async fn get_show_seasons(&self, show_id: &str) -> Result<Vec<CatalogTitle>, CatalogError> {
        self.details(&[
            ("SeriesASIN", show_id.to_string()),
            ("ContentType", "TVSeason".into()),
            ("playbackInformationRequired", "false".into()),
            ("version", "2".into()),
        ])
        .await
    }

    async fn get_season_episodes(
        &self,
        season_id: &str,
    ) -> Result<Vec<CatalogTitle>, CatalogError> {
        self.details(&[
            ("SeasonASIN", season_id.to_string()),
            ("IncludeAll", "T".into()),
            ("NumberOfResults", "400".into()),
            ("playbackInformationRequired", "true".into()),
            ("version", "2".into()),
        ])
        .await
    }
}
