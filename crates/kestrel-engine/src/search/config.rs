//! Engine-level settings for a search.

use crate::error::ConfigError;

use super::control::MAX_THREADS;
use super::params::SearchParams;
use super::value::{Depth, Value};

/// Largest accepted transposition table, in megabytes.
pub const MAX_HASH_MB: usize = 1 << 16;

#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Transposition table size in megabytes.
    pub hash_mb: usize,
    pub threads: usize,
    /// Score the engine side assigns to a draw is `-contempt`.
    pub contempt: Value,
    /// Largest piece count the tablebase is consulted for; 0 disables probing.
    pub tb_cardinality: u32,
    /// Minimum remaining depth for probing at exactly the cardinality.
    pub tb_probe_depth: Depth,
    /// Treat wins and losses spoiled by the 50-move rule as draws.
    pub tb_use_rule50: bool,
    pub params: SearchParams,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            hash_mb: 16,
            threads: 1,
            contempt: 0,
            tb_cardinality: 0,
            tb_probe_depth: 1,
            tb_use_rule50: true,
            params: SearchParams::default(),
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threads == 0 || self.threads > MAX_THREADS {
            return Err(ConfigError::ThreadCount {
                threads: self.threads,
                max: MAX_THREADS,
            });
        }
        if self.hash_mb == 0 || self.hash_mb > MAX_HASH_MB {
            return Err(ConfigError::HashSize {
                mb: self.hash_mb,
                max: MAX_HASH_MB,
            });
        }
        if self.tb_probe_depth < 1 {
            return Err(ConfigError::TablebaseProbeDepth {
                depth: self.tb_probe_depth,
            });
        }
        self.params.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_threads_and_empty_hash() {
        let config = SearchConfig {
            threads: 0,
            ..SearchConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ThreadCount { threads: 0, max: MAX_THREADS })
        );

        let config = SearchConfig {
            hash_mb: 0,
            ..SearchConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::HashSize { mb: 0, .. })));
    }

    #[test]
    fn params_errors_propagate() {
        let mut config = SearchConfig::default();
        config.params.iid_margin = -1;
        assert!(matches!(config.validate(), Err(ConfigError::NonPositive { name: "iid_margin", .. })));
    }
}
