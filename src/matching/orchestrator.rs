// src/matching/orchestrator.rs - Tier-by-tier matching with bounded parallel fan-out
//
// Review burden scales with per-company volume: Tier 1 sends everything
// to a human, Tier 2 auto-accepts exact hits only, Tier 3 never runs the
// fuzzy pass at all. Rows that match nothing are dropped from every
// output channel; absence from the mapping is the valid "unresolved"
// state.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::future::join_all;
use indicatif::ProgressBar;

use crate::matching::engine::{CandidateSet, EngineMatch};
use crate::models::core::CompanyActivity;
use crate::models::matching::{MatchKind, MatchRecord, Tier};
use crate::models::stats_models::TierMatchStats;
use crate::utils::matching_config::MatchingConfig;
use crate::utils::progress_bars::logging::StageLogger;
use crate::utils::progress_bars::progress_config::ProgressConfig;

/// Matching policy for one tier.
#[derive(Debug, Clone)]
pub struct TierPolicy {
    pub tier: Tier,
    /// None disables the fuzzy pass entirely.
    pub fuzzy_threshold: Option<f64>,
    /// Whether exact hits require human confirmation.
    pub review_exact: bool,
    /// Whether fuzzy hits require human confirmation.
    pub review_fuzzy: bool,
    /// Whether the fuzzy pass may fan out over workers.
    pub parallel: bool,
}

impl TierPolicy {
    pub fn for_tier(tier: Tier, config: &MatchingConfig) -> Self {
        match tier {
            // Full manual audit of the highest-value tier
            Tier::Tier1 => Self {
                tier,
                fuzzy_threshold: Some(config.tier1_fuzzy_threshold),
                review_exact: true,
                review_fuzzy: true,
                parallel: true,
            },
            // Exact hits are free; near-exact fuzzy hits still reviewed
            Tier::Tier2 => Self {
                tier,
                fuzzy_threshold: Some(config.tier2_fuzzy_threshold),
                review_exact: false,
                review_fuzzy: true,
                parallel: true,
            },
            // Long tail: exact only
            Tier::Tier3 => Self {
                tier,
                fuzzy_threshold: None,
                review_exact: false,
                review_fuzzy: false,
                parallel: false,
            },
        }
    }
}

/// Matching output for one tier, split by review requirement.
#[derive(Debug)]
pub struct TierOutcome {
    pub auto_accepted: Vec<MatchRecord>,
    pub needs_review: Vec<MatchRecord>,
    pub stats: TierMatchStats,
}

/// Run one tier's matching pass: exact membership first, then the fuzzy
/// pass over the leftovers when the policy allows one. The candidate set
/// is shared read-only across workers; chunk results are concatenated in
/// chunk order, so output order is independent of scheduling.
pub async fn run_tier(
    rows: Vec<CompanyActivity>,
    candidates: Arc<CandidateSet>,
    policy: &TierPolicy,
    config: &MatchingConfig,
    progress: &ProgressConfig,
    logger: &StageLogger,
) -> Result<TierOutcome> {
    let started = Instant::now();
    let total_rows = rows.len();
    logger.log_phase(
        policy.tier.as_str(),
        Some(&format!("{} companies to match", total_rows)),
    );

    // Exact pass
    let mut exact_records = Vec::new();
    let mut unmatched = Vec::new();
    for row in rows {
        match candidates.exact_match(&row.clean_name) {
            Some(hit) => exact_records.push(to_record(&row, hit, &candidates, policy)),
            None => unmatched.push(row),
        }
    }
    logger.log_debug(&format!(
        "{}: exact pass matched {} of {}",
        policy.tier.as_str(),
        exact_records.len(),
        total_rows
    ));

    // Fuzzy pass
    let mut fuzzy_records = Vec::new();
    if let Some(threshold) = policy.fuzzy_threshold {
        if !unmatched.is_empty() && !candidates.is_empty() {
            let bar = progress.create_bar(unmatched.len() as u64, "fuzzy matching");
            if policy.parallel && unmatched.len() >= config.parallel_min_rows {
                let workers = config.worker_count();
                let chunk_size = (unmatched.len() + workers - 1) / workers;
                logger.log_debug(&format!(
                    "{}: fuzzy matching {} rows across {} workers",
                    policy.tier.as_str(),
                    unmatched.len(),
                    workers
                ));

                let mut tasks = Vec::new();
                for chunk in unmatched.chunks(chunk_size) {
                    let chunk = chunk.to_vec();
                    let candidates = Arc::clone(&candidates);
                    let bar = bar.clone();
                    let policy = policy.clone();
                    tasks.push(tokio::spawn(async move {
                        fuzzy_match_chunk(&chunk, &candidates, threshold, &policy, bar.as_ref())
                    }));
                }
                for task in join_all(tasks).await {
                    let batch = task.context("fuzzy matching worker panicked")?;
                    fuzzy_records.extend(batch);
                }
            } else {
                fuzzy_records =
                    fuzzy_match_chunk(&unmatched, &candidates, threshold, policy, bar.as_ref());
            }
            if let Some(bar) = bar {
                bar.finish_with_message("fuzzy matching complete");
            }
            logger.log_debug(&format!(
                "{}: fuzzy pass matched {} of {}",
                policy.tier.as_str(),
                fuzzy_records.len(),
                unmatched.len()
            ));
        }
    }

    let stats = TierMatchStats {
        tier: policy.tier,
        rows: total_rows,
        exact_matches: exact_records.len(),
        fuzzy_matches: fuzzy_records.len(),
        unmatched: total_rows - exact_records.len() - fuzzy_records.len(),
        elapsed_secs: started.elapsed().as_secs_f64(),
    };

    let mut auto_accepted = Vec::new();
    let mut needs_review = Vec::new();
    for record in exact_records {
        if policy.review_exact {
            needs_review.push(record);
        } else {
            auto_accepted.push(record);
        }
    }
    for record in fuzzy_records {
        if policy.review_fuzzy {
            needs_review.push(record);
        } else {
            auto_accepted.push(record);
        }
    }

    Ok(TierOutcome {
        auto_accepted,
        needs_review,
        stats,
    })
}

fn fuzzy_match_chunk(
    rows: &[CompanyActivity],
    candidates: &CandidateSet,
    threshold: f64,
    policy: &TierPolicy,
    bar: Option<&ProgressBar>,
) -> Vec<MatchRecord> {
    let mut records = Vec::new();
    for row in rows {
        if let Some(hit) = candidates.fuzzy_match(&row.clean_name, threshold) {
            records.push(to_record(row, hit, candidates, policy));
        }
        if let Some(bar) = bar {
            bar.inc(1);
        }
    }
    records
}

fn to_record(
    row: &CompanyActivity,
    hit: EngineMatch,
    candidates: &CandidateSet,
    policy: &TierPolicy,
) -> MatchRecord {
    let acquiror_original = candidates
        .display_name(&hit.matched_clean)
        .unwrap_or_default()
        .to_string();
    MatchRecord {
        assignee_original: row.assignee.clone(),
        assignee_clean: row.clean_name.clone(),
        matched_acquiror_clean: hit.matched_clean,
        kind: hit.kind,
        similarity: hit.similarity,
        fuzzy_floor: match hit.kind {
            MatchKind::Exact => None,
            MatchKind::Approximate => policy.fuzzy_threshold.map(|t| t as u32),
        },
        tier: policy.tier,
        acquiror_original,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::progress_bars::logging::PipelineStage;

    fn quiet_progress() -> ProgressConfig {
        ProgressConfig {
            enabled: false,
            detailed: false,
            show_memory: false,
        }
    }

    fn activity(assignee: &str, clean: &str, patent_count: u64) -> CompanyActivity {
        CompanyActivity {
            assignee: assignee.to_string(),
            clean_name: clean.to_string(),
            patent_count,
            inventor_sum: 0,
        }
    }

    fn roster() -> Arc<CandidateSet> {
        Arc::new(CandidateSet::from_roster(vec![
            "Acme Corporation",
            "General Dynamics Corp.",
            "Zenith Electronics Inc",
        ]))
    }

    #[tokio::test]
    async fn tier1_routes_everything_to_review() {
        let rows = vec![
            activity("Acme Corp", "ACME", 500),
            activity("General Dynamic", "GENERAL DYNAMIC", 400),
        ];
        let config = MatchingConfig::default();
        let policy = TierPolicy::for_tier(Tier::Tier1, &config);
        let logger = StageLogger::new(PipelineStage::AssigneeMatching);

        let outcome = run_tier(rows, roster(), &policy, &config, &quiet_progress(), &logger)
            .await
            .unwrap();

        assert!(outcome.auto_accepted.is_empty());
        assert_eq!(outcome.needs_review.len(), 2);

        let exact = &outcome.needs_review[0];
        assert_eq!(exact.kind, MatchKind::Exact);
        assert_eq!(exact.similarity, 100.0);
        assert_eq!(exact.fuzzy_floor, None);
        assert_eq!(exact.acquiror_original, "Acme Corporation");

        let fuzzy = &outcome.needs_review[1];
        assert_eq!(fuzzy.kind, MatchKind::Approximate);
        assert!(fuzzy.similarity >= 90.0);
        assert_eq!(fuzzy.fuzzy_floor, Some(90));
        assert_eq!(fuzzy.matched_acquiror_clean, "GENERAL DYNAMICS");
        assert_eq!(fuzzy.tier, Tier::Tier1);
    }

    #[tokio::test]
    async fn tier2_auto_accepts_exact_only() {
        let rows = vec![
            activity("Acme Corp", "ACME", 20),
            // Token reorder: token-set score 100 but not byte-identical
            activity("Electronics Zenith", "ELECTRONICS ZENITH", 15),
        ];
        let config = MatchingConfig::default();
        let policy = TierPolicy::for_tier(Tier::Tier2, &config);
        let logger = StageLogger::new(PipelineStage::AssigneeMatching);

        let outcome = run_tier(rows, roster(), &policy, &config, &quiet_progress(), &logger)
            .await
            .unwrap();

        assert_eq!(outcome.auto_accepted.len(), 1);
        assert_eq!(outcome.auto_accepted[0].kind, MatchKind::Exact);

        assert_eq!(outcome.needs_review.len(), 1);
        let fuzzy = &outcome.needs_review[0];
        assert_eq!(fuzzy.kind, MatchKind::Approximate);
        assert_eq!(fuzzy.similarity, 100.0);
        assert_eq!(fuzzy.matched_acquiror_clean, "ZENITH ELECTRONICS");
    }

    #[tokio::test]
    async fn tier3_skips_fuzzy_and_drops_unmatched() {
        let rows = vec![
            activity("Acme Corp", "ACME", 2),
            // Near miss that fuzzy matching would have caught
            activity("General Dynamic", "GENERAL DYNAMIC", 1),
        ];
        let config = MatchingConfig::default();
        let policy = TierPolicy::for_tier(Tier::Tier3, &config);
        let logger = StageLogger::new(PipelineStage::AssigneeMatching);

        let outcome = run_tier(rows, roster(), &policy, &config, &quiet_progress(), &logger)
            .await
            .unwrap();

        assert_eq!(outcome.auto_accepted.len(), 1);
        assert!(outcome.needs_review.is_empty());
        assert_eq!(outcome.stats.fuzzy_matches, 0);
        assert_eq!(outcome.stats.unmatched, 1);
    }

    #[tokio::test]
    async fn parallel_and_sequential_runs_agree() {
        let candidates: Vec<String> = (0..150)
            .map(|i| format!("Widget {} Factories Inc", i))
            .collect();
        let set = Arc::new(CandidateSet::from_roster(candidates));
        let rows: Vec<CompanyActivity> = (0..150)
            .map(|i| {
                activity(
                    &format!("Widget {} Factory", i),
                    &format!("WIDGET {} FACTORY", i),
                    600,
                )
            })
            .collect();

        let logger = StageLogger::new(PipelineStage::AssigneeMatching);
        let mut parallel_config = MatchingConfig::default();
        parallel_config.parallel_min_rows = 1;
        let mut sequential_config = MatchingConfig::default();
        sequential_config.parallel_min_rows = usize::MAX;

        let mut policy = TierPolicy::for_tier(Tier::Tier1, &parallel_config);
        policy.fuzzy_threshold = Some(70.0);

        let parallel = run_tier(
            rows.clone(),
            Arc::clone(&set),
            &policy,
            &parallel_config,
            &quiet_progress(),
            &logger,
        )
        .await
        .unwrap();
        let sequential = run_tier(
            rows,
            set,
            &policy,
            &sequential_config,
            &quiet_progress(),
            &logger,
        )
        .await
        .unwrap();

        assert!(!parallel.needs_review.is_empty());
        assert_eq!(parallel.needs_review.len(), sequential.needs_review.len());
        for (a, b) in parallel.needs_review.iter().zip(sequential.needs_review.iter()) {
            assert_eq!(a.assignee_original, b.assignee_original);
            assert_eq!(a.matched_acquiror_clean, b.matched_acquiror_clean);
            assert_eq!(a.similarity, b.similarity);
        }
    }
}
