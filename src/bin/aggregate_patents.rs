use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use linker_lib::aggregate::{aggregate_by_acquiror, write_final_outcome};
use linker_lib::dictionary::load_dictionary_json;
use linker_lib::ingest::read_patent_records;
use linker_lib::utils::env::load_env;
use linker_lib::utils::progress_bars::logging::{PipelineStage, StageLogger};
use log::info;
use uuid::Uuid;

/// Stage 3: apply the master dictionary to the patent database and pivot
/// per-year patent and inventor counts onto the acquiror registry.
#[derive(Parser, Debug)]
#[command(name = "aggregate_patents")]
struct Args {
    /// Master dictionary artifact produced by build_dictionary
    #[arg(long)]
    dictionary: PathBuf,

    /// Acquiror registry template CSV (acquiror_name column)
    #[arg(long)]
    registry: PathBuf,

    /// Patent database CSV (assignee column)
    #[arg(long)]
    patents: PathBuf,

    /// Completed outcome table
    #[arg(long, default_value = "final_outcome_complete.csv")]
    out: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    load_env();
    let args = Args::parse();

    let logger = StageLogger::new(PipelineStage::Aggregation);
    let run_id = Uuid::new_v4().to_string();
    logger.log_start(&run_id);

    logger.log_phase("Loading dictionary", None);
    let master = load_dictionary_json(&args.dictionary)
        .context("Failed to load master dictionary; run build_dictionary first")?;
    logger.log_data_loaded(master.len(), "mapping");

    logger.log_phase("Loading patents", None);
    let patents = read_patent_records(&args.patents).context("Failed to read patent database")?;
    logger.log_data_loaded(patents.len(), "patent");

    logger.log_phase("Aggregating", Some("applying dictionary and grouping per year"));
    let result = aggregate_by_acquiror(&patents, &master);
    if result.total_rows > 0 {
        info!(
            "Mapped {} of {} patent rows ({:.2}%)",
            result.matched_rows,
            result.total_rows,
            result.matched_rows as f64 / result.total_rows as f64 * 100.0
        );
    }
    info!(
        "{} mapped rows carried a usable application year",
        result.dated_rows
    );

    logger.log_phase("Merging outcome table", None);
    let summary = write_final_outcome(&args.registry, &args.out, &result)
        .context("Failed to write outcome table")?;

    info!("=== Aggregation Summary ===");
    info!("Outcome file: {}", args.out.display());
    info!("Rows written: {}", summary.rows_written);
    info!("Companies with patent data: {}", summary.companies_with_patents);
    if let (Some(first), Some(last)) = (summary.years.first(), summary.years.last()) {
        info!("Year range: {}..{}", first, last);
    }
    info!("Next: run compustat_verify against {}", args.out.display());

    logger.log_completion("Aggregation stage finished");
    Ok(())
}
