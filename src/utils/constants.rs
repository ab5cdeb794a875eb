// src/utils/constants.rs - Pipeline-wide tuning constants

/// Default fuzzy threshold for the top-volume tier. All of its hits go
/// to manual review regardless of score.
pub const DEFAULT_TIER1_FUZZY_THRESHOLD: f64 = 90.0;

/// Default fuzzy threshold for the mid-volume tier. Effectively exact
/// modulo normalization; hits still go to review.
pub const DEFAULT_TIER2_FUZZY_THRESHOLD: f64 = 100.0;

/// Hard cap on parallel fuzzy-matching workers. Also bounded by
/// available cores minus one.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Below this many unmatched rows the fuzzy pass runs sequentially;
/// dispatch overhead exceeds the benefit for small batches.
pub const DEFAULT_PARALLEL_MIN_ROWS: usize = 100;

/// Matches scoring below this are counted for review prioritization.
pub const LOW_SCORE_REVIEW_FLOOR: f64 = 95.0;

/// Cleaned names shorter than this are flagged as false-positive risks.
pub const MIN_CLEAN_NAME_LEN: usize = 3;

/// Patent-count boundary between the mid tier and the long tail.
pub const TAIL_MAX_PATENT_COUNT: u64 = 5;

/// Share of the ranked list assigned to the top tier, in percent,
/// applied by truncation.
pub const TOP_TIER_PERCENT: usize = 5;

/// Default fuzzy threshold for Compustat verification matching.
pub const DEFAULT_COMPUSTAT_FUZZY_THRESHOLD: f64 = 90.0;
