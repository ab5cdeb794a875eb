use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use linker_lib::dictionary::{
    build_master_dictionary, load_sources, save_dictionary_json, variant_counts,
};
use linker_lib::export::{write_build_stats, write_conflicts, write_dictionary_view};
use linker_lib::utils::env::load_env;
use linker_lib::utils::progress_bars::logging::{PipelineStage, StageLogger};
use log::{info, warn};
use uuid::Uuid;

/// Stage 2: fold reviewed and auto match batches into the master
/// assignee -> acquiror dictionary.
#[derive(Parser, Debug)]
#[command(name = "build_dictionary")]
struct Args {
    /// Match batch files in priority order; the first source to map an
    /// assignee wins on conflict. Put reviewed files before raw-auto
    /// files.
    #[arg(required = true)]
    sources: Vec<PathBuf>,

    /// Machine-readable dictionary artifact
    #[arg(long, default_value = "master_company_dictionary.json")]
    dictionary_out: PathBuf,

    /// Human-viewable dictionary table
    #[arg(long, default_value = "master_company_dictionary_view.csv")]
    view_out: PathBuf,

    /// Per-source build statistics
    #[arg(long, default_value = "dictionary_build_statistics.csv")]
    stats_out: PathBuf,

    /// Conflict report, written only when conflicts occurred
    #[arg(long, default_value = "dictionary_conflicts.csv")]
    conflicts_out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = Args::parse();

    let logger = StageLogger::new(PipelineStage::DictionaryBuild);
    let run_id = Uuid::new_v4().to_string();
    logger.log_start(&run_id);

    logger.log_phase("Loading sources", Some(&format!("{} files listed", args.sources.len())));
    let sources = load_sources(&args.sources);
    if sources.is_empty() {
        bail!("none of the listed source files could be read");
    }
    logger.log_data_loaded(sources.len(), "source batch");

    let (master, source_stats, conflicts) = build_master_dictionary(&sources, &logger);

    // Per-source statistics are reported even when the merge produced no
    // mappings and the save below fails the stage.
    logger.log_phase("Saving results", None);
    for stats in &source_stats {
        info!(
            "{}: {} valid rows, {} new, {} duplicates, {} conflicts",
            stats.file, stats.valid_rows, stats.new_mappings, stats.duplicates, stats.conflicts
        );
    }
    if !source_stats.is_empty() {
        write_build_stats(&args.stats_out, &source_stats)
            .context("Failed to write build statistics")?;
        info!("Build statistics: {}", args.stats_out.display());
    }
    if !conflicts.is_empty() {
        write_conflicts(&args.conflicts_out, &conflicts)
            .context("Failed to write conflict report")?;
        warn!(
            "Conflict report: {} ({} conflicts)",
            args.conflicts_out.display(),
            conflicts.len()
        );
    }

    save_dictionary_json(&master, &args.dictionary_out)
        .context("Failed to save master dictionary")?;
    info!("Dictionary artifact: {}", args.dictionary_out.display());

    write_dictionary_view(&args.view_out, &master).context("Failed to write dictionary view")?;
    info!("Dictionary view: {}", args.view_out.display());

    // Summary
    info!("=== Dictionary Build Summary ===");
    info!("Total mappings: {}", master.len());
    info!("Sources processed: {}", source_stats.len());
    info!("Conflicts detected: {}", conflicts.len());

    info!("=== Acquirors With Most Variants (top 10) ===");
    for (acquiror, count) in variant_counts(&master).into_iter().take(10) {
        info!("{}: {} variants", acquiror, count);
    }

    if !conflicts.is_empty() {
        warn!(
            "Review {} before aggregating; the first mapping was kept in each case",
            args.conflicts_out.display()
        );
    }
    info!(
        "Next: verify {} and run aggregate_patents with {}",
        args.view_out.display(),
        args.dictionary_out.display()
    );

    logger.log_completion("Dictionary build stage finished");
    Ok(())
}
