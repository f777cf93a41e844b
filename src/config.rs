//! Configuration for the ranking, sampling and scope engines
//!
//! Loaded from `pathrank.toml`; every field has a default so an empty (or
//! missing) file is valid.
//!
//! ```toml
//! # pathrank.toml
//!
//! [ranker]
//! k = 10
//! min_path_size = 0
//! single_hop_guard = true
//!
//! [sampler]
//! max_path_length = 10
//! sample_count = 1000
//! warmup_steps = 10
//! strategy = "metropolis"   # or "random-edges"
//!
//! [scope]
//! alpha = 0.05
//! abandon_pvalue = 0.1
//! echo = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use crate::errors::{PathRankError, Result};

/// Default config file name looked up by [`load_config`].
pub const CONFIG_FILE_NAME: &str = "pathrank.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathRankConfig {
    pub ranker: RankerConfig,
    pub sampler: SamplerConfig,
    pub scope: ScopeConfig,
}

impl PathRankConfig {
    pub fn validate(&self) -> Result<()> {
        self.ranker.validate()?;
        self.sampler.validate()?;
        self.scope.validate()
    }
}

/// K-shortest-path ranking parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankerConfig {
    /// Number of accepted paths to return
    pub k: usize,
    /// A path is emitted only if it has more than this many interior vertices
    pub min_path_size: usize,
    /// Also require score > 2 x first edge weight (filters single-hop paths
    /// with symmetric connector weights)
    pub single_hop_guard: bool,
    /// Narrate every ranking iteration at info level
    pub verbose: bool,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            k: 10,
            min_path_size: 0,
            single_hop_guard: true,
            verbose: false,
        }
    }
}

impl RankerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(PathRankError::InvalidParameter("k must be at least 1".into()));
        }
        Ok(())
    }
}

/// How null-distribution scores are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingStrategy {
    /// Metropolis independence sampler over loopless random walks
    #[default]
    Metropolis,
    /// Sum of independently drawn edge weights
    RandomEdges,
}

/// Null-distribution sampling parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Longest path length (in edges) to sample
    pub max_path_length: usize,
    /// Samples per length
    pub sample_count: usize,
    /// Chain iterations per recorded sample
    pub warmup_steps: usize,
    /// Dead ends tolerated while building a single proposal
    pub max_retries: usize,
    pub strategy: SamplingStrategy,
    /// Seed for reproducible sampling (CLI and parallel sampler)
    pub seed: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_path_length: 10,
            sample_count: 1000,
            warmup_steps: 10,
            max_retries: 100_000,
            strategy: SamplingStrategy::Metropolis,
            seed: 42,
        }
    }
}

impl SamplerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_path_length == 0 {
            return Err(PathRankError::InvalidParameter(
                "max_path_length must be at least 1".into(),
            ));
        }
        if self.sample_count == 0 {
            return Err(PathRankError::InvalidParameter(
                "sample_count must be at least 1".into(),
            ));
        }
        if self.warmup_steps == 0 {
            return Err(PathRankError::InvalidParameter(
                "warmup_steps must be at least 1".into(),
            ));
        }
        if self.max_retries == 0 {
            return Err(PathRankError::InvalidParameter(
                "max_retries must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Significance ("scope") parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// A path is significant when its p-value is below alpha
    pub alpha: f64,
    /// Stop trying longer paths for a target once its p-value exceeds this
    pub abandon_pvalue: f64,
    /// Samples per length when no null table is supplied
    pub fallback_samples: usize,
    /// Narrate per-target progress at info level
    pub echo: bool,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            abandon_pvalue: 0.1,
            fallback_samples: 10_000,
            echo: false,
        }
    }
}

impl ScopeConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(PathRankError::InvalidParameter(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.abandon_pvalue) {
            return Err(PathRankError::InvalidParameter(format!(
                "abandon_pvalue must be in [0, 1], got {}",
                self.abandon_pvalue
            )));
        }
        if self.fallback_samples == 0 {
            return Err(PathRankError::InvalidParameter(
                "fallback_samples must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Load `pathrank.toml` from `dir`.
///
/// Returns defaults if the file is missing or unreadable (a malformed file
/// is logged and ignored).
pub fn load_config(dir: &Path) -> PathRankConfig {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        debug!("No {} in {}, using defaults", CONFIG_FILE_NAME, dir.display());
        return PathRankConfig::default();
    }

    match load_config_file(&path) {
        Ok(config) => {
            debug!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("Failed to load {}: {}", path.display(), e);
            PathRankConfig::default()
        }
    }
}

/// Load and validate a specific config file.
pub fn load_config_file(path: &Path) -> Result<PathRankConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| PathRankError::Config(format!("{}: {}", path.display(), e)))?;
    let config: PathRankConfig =
        toml::from_str(&content).map_err(|e| PathRankError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config: PathRankConfig = toml::from_str("").unwrap();
        assert_eq!(config, PathRankConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config: PathRankConfig = toml::from_str(
            r#"
            [ranker]
            k = 3
            single_hop_guard = false

            [sampler]
            strategy = "random-edges"

            [scope]
            alpha = 0.01
            "#,
        )
        .unwrap();

        assert_eq!(config.ranker.k, 3);
        assert!(!config.ranker.single_hop_guard);
        assert_eq!(config.ranker.min_path_size, 0);
        assert_eq!(config.sampler.strategy, SamplingStrategy::RandomEdges);
        assert_eq!(config.sampler.sample_count, 1000);
        assert_eq!(config.scope.alpha, 0.01);
        assert_eq!(config.scope.abandon_pvalue, 0.1);
    }

    #[test]
    fn test_validation() {
        let mut config = PathRankConfig::default();
        config.ranker.k = 0;
        assert!(matches!(config.validate(), Err(PathRankError::InvalidParameter(_))));

        let mut config = PathRankConfig::default();
        config.sampler.warmup_steps = 0;
        assert!(config.validate().is_err());

        let mut config = PathRankConfig::default();
        config.scope.alpha = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_config(dir.path()), PathRankConfig::default());

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[ranker]\nk = \"many\"\n").unwrap();
        assert_eq!(load_config(dir.path()), PathRankConfig::default());
        assert!(matches!(
            load_config_file(&dir.path().join(CONFIG_FILE_NAME)),
            Err(PathRankError::Config(_))
        ));

        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[scope]\necho = true\n").unwrap();
        assert!(load_config(dir.path()).scope.echo);
    }
}
