// src/utils/matching_config.rs - Tunable matching policy knobs
//
// Thresholds and worker bounds are policy, not correctness: changing
// them shifts review burden, never match validity.

use std::env;

use log::info;

use crate::utils::constants::{
    DEFAULT_MAX_WORKERS, DEFAULT_PARALLEL_MIN_ROWS, DEFAULT_TIER1_FUZZY_THRESHOLD,
    DEFAULT_TIER2_FUZZY_THRESHOLD,
};

#[derive(Debug, Clone)]
pub struct MatchingConfig {
    /// Fuzzy threshold applied to Tier 1 (all hits reviewed).
    pub tier1_fuzzy_threshold: f64,
    /// Fuzzy threshold applied to Tier 2 (fuzzy hits reviewed).
    pub tier2_fuzzy_threshold: f64,
    /// Upper bound on fuzzy-matching workers.
    pub max_workers: usize,
    /// Minimum unmatched rows before the fuzzy pass parallelizes.
    pub parallel_min_rows: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            tier1_fuzzy_threshold: DEFAULT_TIER1_FUZZY_THRESHOLD,
            tier2_fuzzy_threshold: DEFAULT_TIER2_FUZZY_THRESHOLD,
            max_workers: DEFAULT_MAX_WORKERS,
            parallel_min_rows: DEFAULT_PARALLEL_MIN_ROWS,
        }
    }
}

impl MatchingConfig {
    /// Create configuration from environment variables, falling back to
    /// the built-in defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            tier1_fuzzy_threshold: env_parse("TIER1_FUZZY_THRESHOLD", defaults.tier1_fuzzy_threshold),
            tier2_fuzzy_threshold: env_parse("TIER2_FUZZY_THRESHOLD", defaults.tier2_fuzzy_threshold),
            max_workers: env_parse("MATCHING_MAX_WORKERS", defaults.max_workers),
            parallel_min_rows: env_parse("MATCHING_PARALLEL_MIN_ROWS", defaults.parallel_min_rows),
        }
    }

    /// Effective worker count: the configured cap, further bounded by
    /// cores minus one to leave headroom, and never below one.
    pub fn worker_count(&self) -> usize {
        self.max_workers
            .min(num_cpus::get().saturating_sub(1))
            .max(1)
    }

    /// Log the active configuration.
    pub fn log_config(&self) {
        info!(
            "⚙️  Matching configuration: tier1 fuzzy >= {}, tier2 fuzzy >= {}, {} workers (cap {}), parallel from {} rows",
            self.tier1_fuzzy_threshold,
            self.tier2_fuzzy_threshold,
            self.worker_count(),
            self.max_workers,
            self.parallel_min_rows
        );
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let config = MatchingConfig::default();
        assert_eq!(config.tier1_fuzzy_threshold, 90.0);
        assert_eq!(config.tier2_fuzzy_threshold, 100.0);
        assert_eq!(config.max_workers, 4);
        assert_eq!(config.parallel_min_rows, 100);
    }

    #[test]
    fn env_overrides_are_applied() {
        env::set_var("TIER1_FUZZY_THRESHOLD", "85");
        env::set_var("MATCHING_MAX_WORKERS", "2");

        let config = MatchingConfig::from_env();
        assert_eq!(config.tier1_fuzzy_threshold, 85.0);
        assert_eq!(config.max_workers, 2);

        env::remove_var("TIER1_FUZZY_THRESHOLD");
        env::remove_var("MATCHING_MAX_WORKERS");
    }

    #[test]
    fn unparseable_values_fall_back_to_defaults() {
        env::set_var("TIER2_FUZZY_THRESHOLD", "not-a-number");
        let config = MatchingConfig::from_env();
        assert_eq!(config.tier2_fuzzy_threshold, 100.0);
        env::remove_var("TIER2_FUZZY_THRESHOLD");
    }

    #[test]
    fn worker_count_is_at_least_one() {
        let config = MatchingConfig {
            max_workers: 0,
            ..MatchingConfig::default()
        };
        assert_eq!(config.worker_count(), 1);
    }
}
