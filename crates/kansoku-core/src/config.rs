use std::time::Duration;

use kansoku_dom::RetryPolicy;
use kansoku_parse::{PatternDef, PatternSet};
use serde::{Deserialize, Serialize};

use crate::error::KansokuError;

const DEFAULT_CONFIG: &str = include_str!("../../../config/default.toml");

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub monitor: MonitorConfig,
    pub session: SessionConfig,
    pub selectors: SelectorConfig,
    pub page: PageConfig,
    pub catalog: CatalogConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Title text debounce, in ms.
    pub debounce: u64,
    pub bind: RetryPolicy,
}

impl MonitorConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce)
    }
}

/// Session timing, all in ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub progress_interval: u64,
    pub stall_threshold: u64,
    pub pause_confirmation: u64,
}

impl SessionConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval)
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_millis(self.stall_threshold)
    }

    pub fn pause_confirmation(&self) -> Duration {
        Duration::from_millis(self.pause_confirmation)
    }
}

/// Selectors for the player's element tree, each relative to its parent in
/// the watch tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub body: String,
    pub player: String,
    pub container: String,
    pub controls: String,
    pub info: String,
    pub video: String,
    pub title: String,
    pub subtitle: String,
    /// Class on the player element while it is showing.
    pub fullscreen_class: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// Extra URL regexes, tried before the built-in patterns.
    pub patterns: Vec<String>,
}

impl PageConfig {
    /// Compile the configured patterns ahead of the embedded database.
    pub fn pattern_set(&self) -> PatternSet {
        let extra = self
            .patterns
            .iter()
            .enumerate()
            .map(|(i, regex)| PatternDef {
                name: format!("config-{i}"),
                regex: regex.clone(),
                enabled: true,
            })
            .collect();
        PatternSet::embedded().prepend(extra)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub enabled: bool,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Configuration request bound, in ms.
    pub timeout: u64,
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }
}

impl AppConfig {
    /// Load config: `overrides` (TOML) merged key by key over the built-in
    /// defaults.
    pub fn load(overrides: Option<&str>) -> Result<Self, KansokuError> {
        let mut table: toml::Table =
            toml::from_str(DEFAULT_CONFIG).map_err(|e| KansokuError::Config(e.to_string()))?;

        if let Some(overrides) = overrides {
            let user: toml::Table =
                toml::from_str(overrides).map_err(|e| KansokuError::Config(e.to_string()))?;
            merge(&mut table, user);
        }

        toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| KansokuError::Config(e.to_string()))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("built-in default config is valid TOML")
    }
}

/// Recursively overlay `over` onto `base`. Tables merge; everything else is
/// replaced.
fn merge(base: &mut toml::Table, over: toml::Table) {
    for (key, value) in over {
        let toml::Value::Table(incoming) = value else {
            base.insert(key, value);
            continue;
        };
        if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
            merge(existing, incoming);
            continue;
        }
        base.insert(key, toml::Value::Table(incoming));
    }
}
