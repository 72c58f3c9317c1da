use serde::Deserialize;

use super::error::CatalogError;
use crate::traits::CatalogTitle;

// ── GetASINDetails response envelope ─────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DetailsResponse {
    pub message: DetailsMessage,
}

#[derive(Debug, Deserialize)]
pub struct DetailsMessage {
    #[serde(rename = "statusCode", default)]
    pub status_code: Option<String>,
    pub body: DetailsBody,
}

#[derive(Debug, Deserialize)]
pub struct DetailsBody {
    #[serde(default)]
    pub titles: Vec<CatalogTitle>,
}

/// Decode a `GetASINDetails` response body into its titles.
pub fn parse_titles(body: &str) -> Result<Vec<CatalogTitle>, CatalogError> {
    let response: DetailsResponse =
        serde_json::from_str(body).map_err(|e| CatalogError::Parse(e.to_string()))?;

    if let Some(status) = response.message.status_code.as_deref() {
        if status != "SUCCESS" {
            return Err(CatalogError::Api {
                status: 200,
                message: format!("catalog status {status}"),
            });
        }
    }

    Ok(response.message.body.titles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ContentType;

    const EPISODE_FIXTURE: &str = r#"{
        "message": {
            "statusCode": "SUCCESS",
            "body": {
                "titles": [{
                    "titleId": "B01J7AB8SA",
                    "title": "The Holy Trinity",
                    "number": 1,
                    "contentType": "EPISODE",
                    "runtime": { "valueMillis": 3840000 },
                    "releaseOrFirstAiringDate": { "valueDate": 1479427200000000 },
                    "ancestorTitles": [
                        {
                            "titleId": "B01J7AB7SE",
                            "title": "The Grand Tour - Season 1",
                            "number": 1,
                            "contentType": "SEASON",
                            "releaseOrFirstAiringDate": { "valueDate": 1479427200000000 }
                        },
                        {
                            "titleId": "B01J7AB6SH",
                            "title": "The Grand Tour",
                            "contentType": "SERIES",
                            "releaseOrFirstAiringDate": { "valueDate": 1479427200000000 }
                        }
                    ],
                    "synopsis": "ignored"
                }]
            }
        }
    }"#;

    #[test]
    fn test_parse_episode_fixture() {
        let titles = parse_titles(EPISODE_FIXTURE).unwrap();
        assert_eq!(titles.len(), 1);

        let episode = &titles[0];
        assert_eq!(episode.title_id, "B01J7AB8SA");
        assert_eq!(episode.content_type, ContentType::Episode);
        assert_eq!(episode.number, Some(1));
        assert_eq!(episode.runtime_ms(), Some(3_840_000));
        assert_eq!(episode.year(), Some(2016));

        let series = episode.ancestor(ContentType::Series).unwrap();
        assert_eq!(series.title_id, "B01J7AB6SH");
        let season = episode.ancestor(ContentType::Season).unwrap();
        assert_eq!(season.number, Some(1));
    }

    #[test]
    fn test_parse_movie_without_optional_fields() {
        let body = r#"{"message":{"body":{"titles":[
            {"titleId":"B00ABCDEF1","title":"Manchester by the Sea","contentType":"MOVIE"}
        ]}}}"#;
        let titles = parse_titles(body).unwrap();
        assert_eq!(titles[0].content_type, ContentType::Movie);
        assert!(titles[0].runtime.is_none());
        assert!(titles[0].ancestor_titles.is_empty());
        assert!(titles[0].year().is_none());
    }

    #[test]
    fn test_parse_empty_body() {
        let titles = parse_titles(r#"{"message":{"body":{}}}"#).unwrap();
        assert!(titles.is_empty());
    }

    #[test]
    fn test_parse_error_status() {
        let body = r#"{"message":{"statusCode":"ERROR","body":{"titles":[]}}}"#;
        assert!(matches!(parse_titles(body), Err(CatalogError::Api { .. })));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(
            parse_titles("<html>"),
            Err(CatalogError::Parse(_))
        ));
    }
}
