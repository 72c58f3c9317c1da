use std::sync::LazyLock;

use kansoku_parse::PatternSet;
use serde_json::json;
use wasm_bindgen::prelude::*;

static PATTERNS: LazyLock<PatternSet> = LazyLock::new(PatternSet::embedded);

/// Parse the title panel. Returns `{"identity": ...}` (null when there is no
/// title) or `{"error": "..."}`.
#[wasm_bindgen]
pub fn parse_identity(title: &str, subtitle: &str) -> String {
    let segments = [subtitle.to_string()];
    let subtitles = (!subtitle.trim().is_empty()).then_some(&segments[..]);

    let value = match kansoku_parse::parse_identity(Some(title), subtitles) {
        Ok(identity) => json!({ "identity": identity }),
        Err(e) => json!({ "error": e.to_string() }),
    };
    value.to_string()
}

/// The page identifier in `url` as a JSON string, or `null`.
#[wasm_bindgen]
pub fn page_identifier(url: &str) -> String {
    let id = PATTERNS.extract(url);
    serde_json::to_string(&id).unwrap_or_else(|_| "null".to_string())
}
