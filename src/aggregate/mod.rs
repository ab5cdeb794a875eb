// src/aggregate/mod.rs - Final aggregation of mapped patents
//
// Consumes the master dictionary as a pure lookup table: assignees it
// does not know stay out of the totals entirely. Counts pivot into
// per-year columns merged onto the acquiror registry template.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::models::core::PatentRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YearCounts {
    pub patents: u64,
    pub inventors: u64,
}

#[derive(Debug, Clone, Default)]
pub struct AcquirorTotals {
    pub per_year: BTreeMap<i32, YearCounts>,
    /// Distinct assignee spellings that resolved to this acquiror.
    pub aliases: BTreeSet<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AggregateResult {
    pub totals: BTreeMap<String, AcquirorTotals>,
    pub total_rows: usize,
    /// Rows whose assignee the dictionary resolved.
    pub matched_rows: usize,
    /// Matched rows that also carried a usable application year.
    pub dated_rows: usize,
}

/// Group mapped patent records per acquiror and application year.
pub fn aggregate_by_acquiror(
    records: &[PatentRecord],
    master: &BTreeMap<String, String>,
) -> AggregateResult {
    let mut result = AggregateResult {
        total_rows: records.len(),
        ..AggregateResult::default()
    };

    for record in records {
        let assignee = record.assignee.trim();
        let Some(acquiror) = master.get(assignee) else {
            continue;
        };
        result.matched_rows += 1;

        let Some(year) = record.application_year else {
            continue;
        };
        result.dated_rows += 1;

        let totals = result.totals.entry(acquiror.clone()).or_default();
        let counts = totals.per_year.entry(year).or_default();
        counts.patents += 1;
        counts.inventors += record.inventor_count();
        totals.aliases.insert(assignee.to_string());
    }
    result
}

#[derive(Debug, Clone, Default)]
pub struct OutcomeSummary {
    pub rows_written: usize,
    pub companies_with_patents: usize,
    pub years: Vec<i32>,
}

/// Merge aggregated totals onto the acquiror registry template and write
/// the completed outcome table.
pub fn write_final_outcome(
    registry_path: &Path,
    out_path: &Path,
    result: &AggregateResult,
) -> Result<OutcomeSummary> {
    let registry = File::open(registry_path)
        .with_context(|| format!("failed to open {}", registry_path.display()))?;
    let out = File::create(out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;
    merge_outcome(BufReader::new(registry), BufWriter::new(out), result)
        .with_context(|| format!("failed to merge outcome into {}", out_path.display()))
}

/// Registry-template merge over arbitrary reader/writer pairs. Existing
/// `patent_*` columns (stale statistics from a previous vintage) are
/// dropped before the fresh pivots are appended; registry rows without
/// patents keep zero counts and blank alias cells.
pub fn merge_outcome<R: Read, W: Write>(
    registry: R,
    writer: W,
    result: &AggregateResult,
) -> Result<OutcomeSummary> {
    let mut csv_reader = csv::Reader::from_reader(registry);
    let headers = csv_reader.headers().context("missing header row")?.clone();
    let name_idx = match headers.iter().position(|h| h == "acquiror_name") {
        Some(idx) => idx,
        None => bail!("required column acquiror_name not found in registry"),
    };

    let kept_indices: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, header)| !header.starts_with("patent_"))
        .map(|(idx, _)| idx)
        .collect();

    let years: Vec<i32> = result
        .totals
        .values()
        .flat_map(|totals| totals.per_year.keys().copied())
        .collect::<BTreeSet<i32>>()
        .into_iter()
        .collect();
    let max_aliases = result
        .totals
        .values()
        .map(|totals| totals.aliases.len())
        .max()
        .unwrap_or(0);

    let mut out_headers: Vec<String> = kept_indices
        .iter()
        .map(|&idx| headers[idx].to_string())
        .collect();
    for year in &years {
        out_headers.push(format!("patent_{}", year));
    }
    for year in &years {
        out_headers.push(format!("patent_inventor_{}", year));
    }
    for alias_idx in 0..max_aliases {
        if alias_idx == 0 {
            out_headers.push("patent_name".to_string());
        } else {
            out_headers.push(format!("patent_name_{}", alias_idx));
        }
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&out_headers)?;

    let mut summary = OutcomeSummary {
        years: years.clone(),
        ..OutcomeSummary::default()
    };
    let mut seen_names = BTreeSet::new();

    for record in csv_reader.records() {
        let record = record.context("malformed CSV record")?;
        let name = record.get(name_idx).unwrap_or("").trim().to_string();
        // Registry duplicates keep their first row only
        if !name.is_empty() && !seen_names.insert(name.clone()) {
            continue;
        }

        let totals = result.totals.get(&name);
        let mut row: Vec<String> = kept_indices
            .iter()
            .map(|&idx| record.get(idx).unwrap_or("").to_string())
            .collect();
        for year in &years {
            let patents = totals
                .and_then(|t| t.per_year.get(year))
                .map_or(0, |c| c.patents);
            row.push(patents.to_string());
        }
        for year in &years {
            let inventors = totals
                .and_then(|t| t.per_year.get(year))
                .map_or(0, |c| c.inventors);
            row.push(inventors.to_string());
        }
        let aliases: Vec<&String> = totals
            .map(|t| t.aliases.iter().collect())
            .unwrap_or_default();
        for alias_idx in 0..max_aliases {
            row.push(aliases.get(alias_idx).map(|s| s.as_str()).unwrap_or("").to_string());
        }

        if totals.map_or(false, |t| !t.per_year.is_empty()) {
            summary.companies_with_patents += 1;
        }
        summary.rows_written += 1;
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;
    Ok(summary)
}
