//! Engine tuning knobs, deserializable from whatever config file the host
//! application carries. Every field has a default so a partial document is
//! enough.

use std::time::Duration;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Snapshot cache lifetime in seconds.
    pub cache_ttl_secs: u64,
    /// Minimum concluded trials before a material shows up in yield stats.
    pub min_trials_per_material: usize,
    /// Minimum concluded trials per (location, material) pair.
    pub min_trials_per_location: usize,
    /// Cities expanded per region in the drilldown; the rest fold into a
    /// remainder row.
    pub drilldown_city_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 600,
            min_trials_per_material: 3,
            min_trials_per_location: 2,
            drilldown_city_limit: 10,
        }
    }
}

impl EngineConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_document_falls_back_to_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"cache_ttl_secs": 60}"#).unwrap();
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(60));
        assert_eq!(cfg.min_trials_per_material, 3);
        assert_eq!(cfg.drilldown_city_limit, 10);
    }

    #[test]
    fn empty_document_is_the_default() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }
}
