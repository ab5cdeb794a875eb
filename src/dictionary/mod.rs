// src/dictionary/mod.rs - Master dictionary construction
//
// Folds match batches from several review rounds into one authoritative
// assignee -> acquiror mapping. Source order is the caller's priority
// list: the first source to claim an assignee wins, later disagreements
// are recorded and discarded. The merge is strictly sequential; running
// sources concurrently would break the first-wins contract.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::{error, warn};

use crate::models::stats_models::{ConflictRecord, SourceBuildStats};
use crate::utils::progress_bars::logging::StageLogger;

/// One (assignee, acquiror) pair as read from a match batch. Fields may
/// still be blank; the builder skips those rows.
#[derive(Debug, Clone)]
pub struct MappingRow {
    pub assignee_original: String,
    pub acquiror_name: String,
}

/// A file-like batch of mapping rows with its provenance label.
#[derive(Debug, Clone)]
pub struct MappingSource {
    pub label: String,
    pub rows: Vec<MappingRow>,
}

const COL_ASSIGNEE: &str = "Assignee_Original";
const COL_ACQUIROR: &str = "Original_Acquiror_Name";

/// Read one match batch file into a MappingSource. Fails when the file
/// is unreadable or lacks the two required columns; the caller decides
/// whether that skips the source or aborts the run.
pub fn load_mapping_source(path: &Path) -> Result<MappingSource> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let source = read_mapping_source(BufReader::new(file), &label)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(source)
}

/// Parse mapping rows from any reader; extra columns are ignored and
/// column order does not matter.
pub fn read_mapping_source<R: Read>(reader: R, label: &str) -> Result<MappingSource> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers().context("missing header row")?.clone();
    let assignee_idx = headers.iter().position(|h| h == COL_ASSIGNEE);
    let acquiror_idx = headers.iter().position(|h| h == COL_ACQUIROR);
    let (assignee_idx, acquiror_idx) = match (assignee_idx, acquiror_idx) {
        (Some(a), Some(b)) => (a, b),
        _ => bail!(
            "required columns {} and {} not found",
            COL_ASSIGNEE,
            COL_ACQUIROR
        ),
    };

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.context("malformed CSV record")?;
        rows.push(MappingRow {
            assignee_original: record.get(assignee_idx).unwrap_or("").to_string(),
            acquiror_name: record.get(acquiror_idx).unwrap_or("").to_string(),
        });
    }
    Ok(MappingSource {
        label: label.to_string(),
        rows,
    })
}

/// Load an ordered list of source files, skipping (with a logged error)
/// any that are missing, unreadable or missing required columns. The
/// surviving sources keep the caller's order.
pub fn load_sources(paths: &[std::path::PathBuf]) -> Vec<MappingSource> {
    let mut sources = Vec::new();
    for path in paths {
        if !path.exists() {
            warn!("Skipping {}: file not found", path.display());
            continue;
        }
        match load_mapping_source(path) {
            Ok(source) => sources.push(source),
            Err(e) => error!("Skipping {}: {:#}", path.display(), e),
        }
    }
    sources
}

/// Fold the ordered sources into the master mapping.
///
/// Per pair: blank fields are skipped silently; a new assignee inserts;
/// an identical repeat counts as a duplicate; a differing target keeps
/// the existing mapping and records a conflict.
pub fn build_master_dictionary(
    sources: &[MappingSource],
    logger: &StageLogger,
) -> (BTreeMap<String, String>, Vec<SourceBuildStats>, Vec<ConflictRecord>) {
    let mut master: BTreeMap<String, String> = BTreeMap::new();
    let mut source_stats = Vec::new();
    let mut conflicts = Vec::new();

    for source in sources {
        logger.log_phase("Merging source", Some(&source.label));

        let mut valid_rows = 0usize;
        let mut new_mappings = 0usize;
        let mut duplicates = 0usize;
        let mut conflict_count = 0usize;

        for row in &source.rows {
            let assignee = row.assignee_original.trim();
            let acquiror = row.acquiror_name.trim();
            if assignee.is_empty() || acquiror.is_empty() {
                continue;
            }
            valid_rows += 1;

            match master.get(assignee) {
                None => {
                    master.insert(assignee.to_string(), acquiror.to_string());
                    new_mappings += 1;
                }
                Some(existing) if existing == acquiror => {
                    duplicates += 1;
                }
                Some(existing) => {
                    conflict_count += 1;
                    warn!(
                        "Conflict: '{}' already mapped to '{}', ignoring new value '{}' from {}",
                        assignee, existing, acquiror, source.label
                    );
                    conflicts.push(ConflictRecord {
                        assignee: assignee.to_string(),
                        existing_acquiror: existing.clone(),
                        new_acquiror: acquiror.to_string(),
                        source_file: source.label.clone(),
                    });
                }
            }
        }

        logger.log_debug(&format!(
            "{}: {} valid rows, {} new, {} duplicates, {} conflicts",
            source.label, valid_rows, new_mappings, duplicates, conflict_count
        ));
        source_stats.push(SourceBuildStats {
            file: source.label.clone(),
            valid_rows,
            new_mappings,
            duplicates,
            conflicts: conflict_count,
        });
    }

    (master, source_stats, conflicts)
}

/// Persist the machine-readable dictionary artifact. Fails when the
/// mapping is empty: nothing downstream can proceed without mappings,
/// and the caller surfaces that as the stage outcome.
pub fn save_dictionary_json(master: &BTreeMap<String, String>, path: &Path) -> Result<()> {
    if master.is_empty() {
        bail!("dictionary is empty: no mappings extracted from any source");
    }
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), master)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Load a previously persisted dictionary artifact.
pub fn load_dictionary_json(path: &Path) -> Result<BTreeMap<String, String>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let master: BTreeMap<String, String> = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(master)
}

/// Acquirors ranked by how many assignee variants map to them; used in
/// the build summary (top ten).
pub fn variant_counts(master: &BTreeMap<String, String>) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for acquiror in master.values() {
        *counts.entry(acquiror).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> =
        counts.into_iter().map(|(name, n)| (name.to_string(), n)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}
