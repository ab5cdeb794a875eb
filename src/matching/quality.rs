// src/matching/quality.rs - Advisory quality checks over a completed match set

use std::collections::{HashMap, HashSet};

use crate::models::matching::{MatchKind, MatchRecord};
use crate::models::stats_models::{AuditStats, ScoreDistribution};
use crate::utils::constants::{LOW_SCORE_REVIEW_FLOOR, MIN_CLEAN_NAME_LEN};

/// Scan a completed match batch for structural risk signals. Purely
/// advisory: findings are returned as human-readable issues plus counts,
/// and never block pipeline progress.
pub fn validate_matches(matches: &[MatchRecord]) -> (Vec<String>, AuditStats) {
    let mut issues = Vec::new();
    let mut stats = AuditStats::default();

    if matches.is_empty() {
        return (issues, stats);
    }

    // One assignee mapped to several distinct acquirors
    let mut targets_per_assignee: HashMap<&str, HashSet<&str>> = HashMap::new();
    for record in matches {
        targets_per_assignee
            .entry(record.assignee_original.as_str())
            .or_default()
            .insert(record.matched_acquiror_clean.as_str());
    }
    stats.one_to_many = targets_per_assignee.values().filter(|t| t.len() > 1).count();
    if stats.one_to_many > 0 {
        issues.push(format!(
            "warning: {} assignees matched to more than one acquiror (manual resolution needed)",
            stats.one_to_many
        ));
    }

    // Similarity distribution
    let mut scores: Vec<f64> = matches.iter().map(|r| r.similarity).collect();
    scores.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    stats.similarity = Some(ScoreDistribution {
        min: scores[0],
        q1: percentile(&scores, 0.25),
        median: percentile(&scores, 0.5),
        q3: percentile(&scores, 0.75),
        max: scores[scores.len() - 1],
        mean: scores.iter().sum::<f64>() / scores.len() as f64,
    });

    stats.low_score_count = matches
        .iter()
        .filter(|r| r.similarity < LOW_SCORE_REVIEW_FLOOR)
        .count();
    if stats.low_score_count > 0 {
        issues.push(format!(
            "info: {} matches scored below {}, prioritize these in review",
            stats.low_score_count, LOW_SCORE_REVIEW_FLOOR
        ));
    }

    // Very short cleaned names carry a high false-positive risk
    stats.short_name_count = matches
        .iter()
        .filter(|r| r.assignee_clean.chars().count() < MIN_CLEAN_NAME_LEN)
        .count();
    if stats.short_name_count > 0 {
        issues.push(format!(
            "warning: {} cleaned assignee names are shorter than {} characters (e.g. '3M'), verify manually",
            stats.short_name_count, MIN_CLEAN_NAME_LEN
        ));
    }

    // Match kind distribution
    for record in matches {
        match record.kind {
            MatchKind::Exact => stats.exact_count += 1,
            MatchKind::Approximate => stats.approximate_count += 1,
        }
        *stats.match_type_counts.entry(record.match_type_label()).or_insert(0) += 1;
    }

    (issues, stats)
}

/// Linearly interpolated percentile over an already-sorted slice.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] * (1.0 - weight) + sorted[upper] * weight
}
