// src/models/stats_models.rs - Per-stage statistics and audit reporting shapes

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::matching::Tier;

/// Outcome counts for one tier's matching pass.
#[derive(Debug, Clone, Serialize)]
pub struct TierMatchStats {
    pub tier: Tier,
    pub rows: usize,
    pub exact_matches: usize,
    pub fuzzy_matches: usize,
    pub unmatched: usize,
    pub elapsed_secs: f64,
}

/// Five-number summary plus mean of the similarity scores in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreDistribution {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub mean: f64,
}

/// Advisory findings from the match quality audit. Never blocks the
/// pipeline.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditStats {
    /// Assignees mapped to more than one distinct acquiror.
    pub one_to_many: usize,
    /// Matches with similarity below the review-priority floor.
    pub low_score_count: usize,
    /// Cleaned assignee names shorter than three characters.
    pub short_name_count: usize,
    pub exact_count: usize,
    pub approximate_count: usize,
    pub match_type_counts: HashMap<String, usize>,
    pub similarity: Option<ScoreDistribution>,
}

/// Contribution of one source file to the master dictionary build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBuildStats {
    pub file: String,
    pub valid_rows: usize,
    pub new_mappings: usize,
    pub duplicates: usize,
    pub conflicts: usize,
}

/// A mapping the merge rejected because an earlier source already claimed
/// the assignee. Audit output only; never consulted by matching logic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictRecord {
    pub assignee: String,
    pub existing_acquiror: String,
    pub new_acquiror: String,
    pub source_file: String,
}
