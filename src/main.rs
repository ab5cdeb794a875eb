use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use linker_lib::export::{sort_for_review, write_match_batch};
use linker_lib::ingest::{read_acquiror_names, read_patent_records};
use linker_lib::matching::engine::CandidateSet;
use linker_lib::matching::orchestrator::{run_tier, TierPolicy};
use linker_lib::matching::quality::validate_matches;
use linker_lib::models::matching::Tier;
use linker_lib::tiering::{partition_by_volume, rank_company_activity};
use linker_lib::utils::env::load_env;
use linker_lib::utils::get_memory_usage;
use linker_lib::utils::matching_config::MatchingConfig;
use linker_lib::utils::progress_bars::logging::{PipelineStage, StageLogger};
use linker_lib::utils::progress_bars::progress_config::ProgressConfig;
use log::{info, warn};
use uuid::Uuid;

/// Stage 1: tiered matching of patent assignees against the acquiror
/// registry, producing the auto-accepted and manual-review batches.
#[derive(Parser, Debug)]
#[command(name = "match_assignees")]
struct Args {
    /// Acquiror registry CSV (requires an acquiror_name column)
    #[arg(long)]
    acquirors: PathBuf,

    /// Patent database CSV (requires an assignee column)
    #[arg(long)]
    patents: PathBuf,

    /// Output file for matches requiring manual review
    #[arg(long, default_value = "step1_manual_review.csv")]
    review_out: PathBuf,

    /// Output file for auto-accepted matches
    #[arg(long, default_value = "step1_auto_results.csv")]
    auto_out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = Args::parse();

    let logger = StageLogger::new(PipelineStage::AssigneeMatching);
    let run_id = Uuid::new_v4().to_string();
    let run_started = Utc::now();
    logger.log_start(&run_id);

    let config = MatchingConfig::from_env();
    config.log_config();
    let progress = ProgressConfig::from_env();
    let mut phase_times = HashMap::new();

    // Phase 1: Load datasets
    let phase_start = Instant::now();
    logger.log_phase("Loading data", None);
    let acquiror_names = read_acquiror_names(&args.acquirors)
        .context("Failed to read acquiror registry")?;
    logger.log_data_loaded(acquiror_names.len(), "acquiror");
    let patents = read_patent_records(&args.patents).context("Failed to read patent database")?;
    logger.log_data_loaded(patents.len(), "patent");
    phase_times.insert("loading", phase_start.elapsed());

    // Phase 2: Rank and tier
    let phase_start = Instant::now();
    logger.log_phase("Ranking companies", Some("grouping patents per assignee"));
    let ranked = rank_company_activity(&patents);
    let total_companies = ranked.len();
    info!("Summarized {} patent-holding companies", total_companies);

    let (tier1, tier2, tier3) = partition_by_volume(ranked);
    info!("Tier 1 (top 5%): {} companies", tier1.len());
    info!("Tier 2 (>5 patents): {} companies", tier2.len());
    info!("Tier 3 (long tail): {} companies", tier3.len());
    phase_times.insert("tiering", phase_start.elapsed());

    // Phase 3: Build the candidate set
    let phase_start = Instant::now();
    logger.log_phase("Preparing candidates", Some("normalizing the acquiror roster"));
    let candidates = Arc::new(CandidateSet::from_roster(acquiror_names));
    info!("Acquiror roster holds {} unique cleaned names", candidates.len());
    if candidates.is_empty() {
        warn!("Candidate set is empty; every assignee will stay unresolved");
    }
    phase_times.insert("candidates", phase_start.elapsed());

    // Phase 4: Per-tier matching
    let phase_start = Instant::now();
    logger.log_phase("Matching", None);
    let mut needs_review = Vec::new();
    let mut auto_accepted = Vec::new();
    let mut tier_stats = Vec::new();

    for (rows, tier) in [(tier1, Tier::Tier1), (tier2, Tier::Tier2), (tier3, Tier::Tier3)] {
        let policy = TierPolicy::for_tier(tier, &config);
        let outcome = run_tier(
            rows,
            Arc::clone(&candidates),
            &policy,
            &config,
            &progress,
            &logger,
        )
        .await
        .with_context(|| format!("{} matching pass failed", tier.as_str()))?;
        needs_review.extend(outcome.needs_review);
        auto_accepted.extend(outcome.auto_accepted);
        tier_stats.push(outcome.stats);
    }
    phase_times.insert("matching", phase_start.elapsed());

    // Phase 5: Quality checks
    logger.log_phase("Quality checks", None);
    let all_matches: Vec<_> = needs_review
        .iter()
        .chain(auto_accepted.iter())
        .cloned()
        .collect();
    let (issues, audit) = validate_matches(&all_matches);
    for issue in &issues {
        warn!("{}", issue);
    }
    if let Some(dist) = &audit.similarity {
        info!(
            "Similarity distribution: min {:.1}, q1 {:.1}, median {:.1}, q3 {:.1}, max {:.1}, mean {:.1}",
            dist.min, dist.q1, dist.median, dist.q3, dist.max, dist.mean
        );
    }

    // Phase 6: Export batches
    logger.log_phase("Exporting results", None);
    if needs_review.is_empty() {
        info!("No matches require manual review");
    } else {
        sort_for_review(&mut needs_review);
        write_match_batch(&args.review_out, &needs_review)
            .context("Failed to write manual review file")?;
        info!(
            "Manual review file: {} ({} rows)",
            args.review_out.display(),
            needs_review.len()
        );
    }
    if auto_accepted.is_empty() {
        info!("No auto-accepted matches");
    } else {
        write_match_batch(&args.auto_out, &auto_accepted)
            .context("Failed to write auto results file")?;
        info!(
            "Auto results file: {} ({} rows)",
            args.auto_out.display(),
            auto_accepted.len()
        );
    }

    // Summary
    let total_matches = needs_review.len() + auto_accepted.len();
    info!("=== Matching Summary ===");
    info!("Run ID: {}", run_id);
    info!("Run started: {}", run_started.format("%Y-%m-%d %H:%M:%S UTC"));
    info!("Total matches: {}", total_matches);
    info!("Needs review: {}", needs_review.len());
    info!("Auto-accepted: {}", auto_accepted.len());
    if total_companies > 0 {
        info!(
            "Match rate: {:.2}%",
            total_matches as f64 / total_companies as f64 * 100.0
        );
    }
    for stats in &tier_stats {
        info!(
            "{}: {} rows, {} exact, {} fuzzy, {} unmatched ({:.1}s)",
            stats.tier.as_str(),
            stats.rows,
            stats.exact_matches,
            stats.fuzzy_matches,
            stats.unmatched,
            stats.elapsed_secs
        );
    }
    if !audit.match_type_counts.is_empty() {
        info!("=== Match Type Distribution ===");
        let mut labels: Vec<_> = audit.match_type_counts.iter().collect();
        labels.sort();
        for (label, count) in labels {
            info!("{}: {}", label, count);
        }
    }
    info!("=== Timing Breakdown ===");
    for phase in ["loading", "tiering", "candidates", "matching"] {
        if let Some(duration) = phase_times.get(phase) {
            info!("{}: {:.2?}", phase, duration);
        }
    }
    if progress.should_show_memory() {
        info!("Final memory usage: {} MB", get_memory_usage().await);
    }

    logger.log_completion("Assignee matching stage finished");
    Ok(())
}
