use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use linker_lib::compustat::{apply_verified_ids, read_compustat_ids, read_verified_pairs};
use linker_lib::utils::env::load_env;
use linker_lib::utils::progress_bars::logging::{PipelineStage, StageLogger};
use log::info;
use uuid::Uuid;

/// Stage 4B: apply the human-verified Compustat pairings, filling
/// gvkey/cusip/cik into the outcome table where blank.
#[derive(Parser, Debug)]
#[command(name = "compustat_apply")]
struct Args {
    /// Completed outcome table from aggregate_patents
    #[arg(long)]
    outcome: PathBuf,

    /// Compustat extract CSV (conm, gvkey, cusip, cik columns)
    #[arg(long)]
    compustat: PathBuf,

    /// Manually verified pairing file from compustat_verify
    #[arg(long)]
    verified: PathBuf,

    /// Output table with identifiers filled in
    #[arg(long, default_value = "final_outcome.csv")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = Args::parse();

    let logger = StageLogger::new(PipelineStage::CompustatApply);
    let run_id = Uuid::new_v4().to_string();
    logger.log_start(&run_id);

    logger.log_phase("Loading data", None);
    let verified = read_verified_pairs(&args.verified)
        .context("Failed to read verified pairings; run compustat_verify and review its output first")?;
    logger.log_data_loaded(verified.len(), "verified pairing");
    let ids = read_compustat_ids(&args.compustat).context("Failed to read Compustat extract")?;
    logger.log_data_loaded(ids.len(), "Compustat identifier");

    logger.log_phase("Applying identifiers", None);
    let stats = apply_verified_ids(&args.outcome, &args.out, &verified, &ids)
        .context("Failed to apply identifiers to outcome table")?;

    info!("=== Compustat Apply Summary ===");
    info!("Output file: {}", args.out.display());
    info!("Rows written: {}", stats.rows_written);
    info!("Rows with a verified pairing: {}", stats.rows_matched);
    info!("gvkey cells filled: {}", stats.filled_gvkey);
    info!("cusip cells filled: {}", stats.filled_cusip);
    info!("cik cells filled: {}", stats.filled_cik);

    logger.log_completion("Compustat apply stage finished");
    Ok(())
}
