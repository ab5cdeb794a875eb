use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use linker_lib::compustat::{
    match_against_roster, read_compustat_names, read_outcome_targets, sort_verification,
    write_verification,
};
use linker_lib::matching::engine::CandidateSet;
use linker_lib::utils::constants::DEFAULT_COMPUSTAT_FUZZY_THRESHOLD;
use linker_lib::utils::env::load_env;
use linker_lib::utils::progress_bars::logging::{PipelineStage, StageLogger};
use linker_lib::utils::progress_bars::progress_config::ProgressConfig;
use log::info;
use uuid::Uuid;

/// Stage 4A: match patent-bearing acquirors against the Compustat roster
/// and emit the manual verification file.
#[derive(Parser, Debug)]
#[command(name = "compustat_verify")]
struct Args {
    /// Completed outcome table from aggregate_patents
    #[arg(long)]
    outcome: PathBuf,

    /// Compustat extract CSV (conm column)
    #[arg(long)]
    compustat: PathBuf,

    /// Verification file for manual review
    #[arg(long, default_value = "company_match_verification.csv")]
    out: PathBuf,

    /// Fuzzy threshold for candidate pairings
    #[arg(long, default_value_t = DEFAULT_COMPUSTAT_FUZZY_THRESHOLD)]
    threshold: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = Args::parse();

    let logger = StageLogger::new(PipelineStage::CompustatVerify);
    let run_id = Uuid::new_v4().to_string();
    logger.log_start(&run_id);
    let progress = ProgressConfig::from_env();

    logger.log_phase("Loading data", None);
    let targets = read_outcome_targets(&args.outcome).context("Failed to read outcome table")?;
    logger.log_data_loaded(targets.len(), "acquiror target");
    let compustat_names =
        read_compustat_names(&args.compustat).context("Failed to read Compustat extract")?;
    logger.log_data_loaded(compustat_names.len(), "Compustat company");

    logger.log_phase("Preparing roster", None);
    let roster = CandidateSet::from_roster(compustat_names);
    info!("Compustat roster holds {} unique cleaned names", roster.len());

    logger.log_phase("Matching", Some(&format!("fuzzy threshold {}", args.threshold)));
    let mut rows = match_against_roster(&targets, &roster, args.threshold, &progress, &logger);
    if rows.is_empty() {
        bail!("no Compustat matches found; nothing to verify");
    }

    sort_verification(&mut rows);
    write_verification(&args.out, &rows).context("Failed to write verification file")?;

    let strict = rows.iter().filter(|row| row.match_type == "Strict").count();
    info!("=== Compustat Verification Summary ===");
    info!("Strict matches: {}", strict);
    info!("Fuzzy matches: {}", rows.len() - strict);
    info!("Verification file: {} ({} pairs)", args.out.display(), rows.len());
    info!("Next steps:");
    info!("  1. Open {} and delete wrong pairings", args.out.display());
    info!("  2. Save the file under the same name");
    info!("  3. Run compustat_apply");

    logger.log_completion("Compustat verification stage finished");
    Ok(())
}
