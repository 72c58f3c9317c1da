use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Embedded URL pattern database.
const EMBEDDED_DB: &str = include_str!("../data/patterns.toml");

/// The site-assigned catalog key of the page being watched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageIdentifier(String);

impl PageIdentifier {
    /// Wrap an identifier, rejecting empty or non-alphanumeric input.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            None
        } else {
            Some(Self(value.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the identifier for `url`, falling back to the last play click.
    ///
    /// Always re-derived; callers should not cache the result across
    /// navigations.
    pub fn derive(
        patterns: &PatternSet,
        url: &str,
        last_clicked: Option<&PageIdentifier>,
    ) -> Result<Self, ParseError> {
        if let Some(id) = patterns.extract(url) {
            return Ok(id);
        }

        match last_clicked {
            Some(id) => {
                tracing::debug!(url, fallback = %id, "Using last clicked identifier");
                Ok(id.clone())
            }
            None => Err(ParseError::IdentifierMissing {
                url: url.to_string(),
            }),
        }
    }
}

impl fmt::Display for PageIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Definition of one URL pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDef {
    /// Short name used in logs.
    pub name: String,
    /// Regex with capture group 1 holding the identifier.
    pub regex: String,
    /// Whether this pattern takes part in matching.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// Wrapper for TOML deserialization.
#[derive(Debug, Deserialize)]
struct PatternDbFile {
    #[serde(rename = "pattern")]
    patterns: Vec<PatternDef>,
}

/// Ordered list of compiled URL patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    defs: Vec<PatternDef>,
    compiled: Vec<Option<regex::Regex>>,
}

impl PatternSet {
    /// Load the embedded pattern database.
    pub fn embedded() -> Self {
        Self::from_toml(EMBEDDED_DB).expect("embedded patterns.toml should be valid")
    }

    /// Load a pattern database from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ParseError> {
        let db: PatternDbFile =
            toml::from_str(toml_str).map_err(|e| ParseError::Patterns(e.to_string()))?;
        Ok(Self::new(db.patterns))
    }

    /// Compile a list of definitions. Invalid regexes are kept but never match.
    pub fn new(defs: Vec<PatternDef>) -> Self {
        let compiled = defs
            .iter()
            .map(|def| match regex::Regex::new(&def.regex) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern = %def.name, error = %e, "Skipping invalid URL pattern");
                    None
                }
            })
            .collect();
        Self { defs, compiled }
    }

    /// Extract the identifier using the first enabled pattern that matches.
    pub fn extract(&self, url: &str) -> Option<PageIdentifier> {
        for (def, re) in self.defs.iter().zip(&self.compiled) {
            if !def.enabled {
                continue;
            }
            let Some(re) = re else { continue };
            let Some(caps) = re.captures(url) else {
                tracing::trace!(url, pattern = %def.name, "URL didn't match pattern");
                continue;
            };
            if let Some(id) = caps.get(1).and_then(|m| PageIdentifier::new(m.as_str())) {
                tracing::trace!(url, pattern = %def.name, id = %id, "URL matched pattern");
                return Some(id);
            }
        }

        tracing::debug!(url, "URL didn't match any pattern");
        None
    }

    /// Definitions in match order.
    pub fn defs(&self) -> &[PatternDef] {
        &self.defs
    }

    /// A set that tries `first` before every pattern in `self`.
    pub fn prepend(&self, first: Vec<PatternDef>) -> Self {
        Self::new(first.into_iter().chain(self.defs.iter().cloned()).collect())
    }

    /// Number of pattern definitions.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_loads() {
        let set = PatternSet::embedded();
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_detail_page() {
        let set = PatternSet::embedded();
        let id = set.extract("https://www.amazon.com/dp/B00ABCDEF1").unwrap();
        assert_eq!(id.as_str(), "B00ABCDEF1");
    }

    #[test]
    fn test_slug_detail_page() {
        let set = PatternSet::embedded();
        let id = set
            .extract("https://www.amazon.com/The-Grand-Tour/dp/B01J7AB8SA/ref=sr_1_1")
            .unwrap();
        assert_eq!(id.as_str(), "B01J7AB8SA");
    }

    #[test]
    fn test_video_detail_page() {
        let set = PatternSet::embedded();
        let id = set
            .extract("https://www.amazon.com/gp/video/detail/B075NVT2C1?autoplay=1")
            .unwrap();
        assert_eq!(id.as_str(), "B075NVT2C1");
    }

    #[test]
    fn test_other_site() {
        let set = PatternSet::embedded();
        assert!(set.extract("https://www.netflix.com/watch/81564905").is_none());
    }

    #[test]
    fn test_empty_capture_is_no_match() {
        let set = PatternSet::embedded();
        assert!(set.extract("https://www.amazon.com/dp/").is_none());
    }

    #[test]
    fn test_derive_falls_back_to_click() {
        let set = PatternSet::embedded();
        let clicked = PageIdentifier::new("B0CLICKED1").unwrap();
        let id = PageIdentifier::derive(&set, "https://www.amazon.com/", Some(&clicked)).unwrap();
        assert_eq!(id, clicked);
    }

    #[test]
    fn test_derive_prefers_url() {
        let set = PatternSet::embedded();
        let clicked = PageIdentifier::new("B0CLICKED1").unwrap();
        let id = PageIdentifier::derive(
            &set,
            "https://www.amazon.com/dp/B00ABCDEF1",
            Some(&clicked),
        )
        .unwrap();
        assert_eq!(id.as_str(), "B00ABCDEF1");
    }

    #[test]
    fn test_derive_missing() {
        let set = PatternSet::embedded();
        assert!(matches!(
            PageIdentifier::derive(&set, "https://www.amazon.com/", None),
            Err(ParseError::IdentifierMissing { .. })
        ));
    }

    #[test]
    fn test_disabled_and_invalid_patterns() {
        let set = PatternSet::from_toml(
            r#"
            [[pattern]]
            name = "broken"
            regex = "(unclosed"

            [[pattern]]
            name = "off"
            regex = '^https://example\.com/v/(\w+)$'
            enabled = false

            [[pattern]]
            name = "on"
            regex = '^https://example\.com/w/(\w+)$'
            "#,
        )
        .unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.extract("https://example.com/v/abc").is_none());
        assert_eq!(
            set.extract("https://example.com/w/abc").unwrap().as_str(),
            "abc"
        );
    }

    #[test]
    fn test_prepend_takes_priority() {
        let set = PatternSet::embedded().prepend(vec![PatternDef {
            name: "watch".into(),
            regex: r"^https://www\.amazon\.com/watch/(\w+)".into(),
            enabled: true,
        }]);
        assert_eq!(set.len(), 5);
        assert_eq!(set.defs()[0].name, "watch");
        assert_eq!(
            set.extract("https://www.amazon.com/watch/B0WATCH01").unwrap().as_str(),
            "B0WATCH01"
        );
        assert!(set.extract("https://www.amazon.com/dp/B00ABCDEF1").is_some());
    }

    #[test]
    fn test_identifier_rejects_garbage() {
        assert!(PageIdentifier::new("").is_none());
        assert!(PageIdentifier::new("B00/../x").is_none());
        assert_eq!(PageIdentifier::new(" B00X ").unwrap().as_str(), "B00X");
    }
}
