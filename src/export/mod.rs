// src/export/mod.rs - CSV writers for pipeline artifacts
//
// Column names are the contract with the human reviewer and the next
// stage; they match the shapes the dictionary builder re-imports.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::models::matching::MatchRecord;
use crate::models::stats_models::{ConflictRecord, SourceBuildStats};

#[derive(Serialize)]
struct MatchBatchRow<'a> {
    #[serde(rename = "Assignee_Original")]
    assignee_original: &'a str,
    #[serde(rename = "Assignee_Clean")]
    assignee_clean: &'a str,
    #[serde(rename = "Matched_Acquiror_Clean")]
    matched_acquiror_clean: &'a str,
    #[serde(rename = "Match_Type")]
    match_type: String,
    #[serde(rename = "Similarity")]
    similarity: f64,
    #[serde(rename = "Tier")]
    tier: &'static str,
    #[serde(rename = "Original_Acquiror_Name")]
    original_acquiror_name: &'a str,
}

#[derive(Serialize)]
struct DictionaryViewRow<'a> {
    #[serde(rename = "Assignee_Original_Name")]
    assignee_original_name: &'a str,
    #[serde(rename = "Mapped_Acquiror_Name")]
    mapped_acquiror_name: &'a str,
}

#[derive(Serialize)]
struct BuildStatsRow<'a> {
    #[serde(rename = "File")]
    file: &'a str,
    #[serde(rename = "Valid_Rows")]
    valid_rows: usize,
    #[serde(rename = "New_Mappings")]
    new_mappings: usize,
    #[serde(rename = "Duplicates")]
    duplicates: usize,
    #[serde(rename = "Conflicts")]
    conflicts: usize,
}

#[derive(Serialize)]
struct ConflictRow<'a> {
    #[serde(rename = "Assignee")]
    assignee: &'a str,
    #[serde(rename = "Existing_Acquiror")]
    existing_acquiror: &'a str,
    #[serde(rename = "New_Acquiror")]
    new_acquiror: &'a str,
    #[serde(rename = "Source_File")]
    source_file: &'a str,
}

/// Sort a batch for the human reviewer: weakest matches first, fuzzy
/// before strict (lexicographic on the type label, then ascending
/// similarity).
pub fn sort_for_review(records: &mut [MatchRecord]) {
    records.sort_by(|a, b| {
        a.match_type_label()
            .cmp(&b.match_type_label())
            .then_with(|| a.similarity.partial_cmp(&b.similarity).unwrap_or(Ordering::Equal))
            .then_with(|| a.assignee_original.cmp(&b.assignee_original))
    });
}

/// Write a match batch in the seven-column review/auto shape.
pub fn write_match_batch(path: &Path, records: &[MatchRecord]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_match_batch_to(BufWriter::new(file), records)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_match_batch_to<W: Write>(writer: W, records: &[MatchRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for record in records {
        csv_writer.serialize(MatchBatchRow {
            assignee_original: &record.assignee_original,
            assignee_clean: &record.assignee_clean,
            matched_acquiror_clean: &record.matched_acquiror_clean,
            match_type: record.match_type_label(),
            similarity: record.similarity,
            tier: record.tier.as_str(),
            original_acquiror_name: &record.acquiror_original,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the human-viewable dictionary table, sorted by mapped acquiror
/// name then assignee.
pub fn write_dictionary_view(path: &Path, master: &BTreeMap<String, String>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_dictionary_view_to(BufWriter::new(file), master)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_dictionary_view_to<W: Write>(
    writer: W,
    master: &BTreeMap<String, String>,
) -> Result<()> {
    let mut rows: Vec<(&String, &String)> = master.iter().collect();
    rows.sort_by(|(assignee_a, target_a), (assignee_b, target_b)| {
        target_a.cmp(target_b).then_with(|| assignee_a.cmp(assignee_b))
    });

    let mut csv_writer = csv::Writer::from_writer(writer);
    for (assignee, target) in rows {
        csv_writer.serialize(DictionaryViewRow {
            assignee_original_name: assignee,
            mapped_acquiror_name: target,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write per-source build statistics.
pub fn write_build_stats(path: &Path, stats: &[SourceBuildStats]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));
    for entry in stats {
        csv_writer.serialize(BuildStatsRow {
            file: &entry.file,
            valid_rows: entry.valid_rows,
            new_mappings: entry.new_mappings,
            duplicates: entry.duplicates,
            conflicts: entry.conflicts,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the conflict report. Callers only invoke this when conflicts
/// occurred.
pub fn write_conflicts(path: &Path, conflicts: &[ConflictRecord]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));
    for conflict in conflicts {
        csv_writer.serialize(ConflictRow {
            assignee: &conflict.assignee,
            existing_acquiror: &conflict.existing_acquiror,
            new_acquiror: &conflict.new_acquiror,
            source_file: &conflict.source_file,
        })?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::matching::{MatchKind, Tier};

    fn record(original: &str, kind: MatchKind, similarity: f64) -> MatchRecord {
        MatchRecord {
            assignee_original: original.to_string(),
            assignee_clean: original.to_uppercase(),
            matched_acquiror_clean: "ACME".to_string(),
            kind,
            similarity,
            fuzzy_floor: if kind == MatchKind::Approximate { Some(90) } else { None },
            tier: Tier::Tier1,
            acquiror_original: "Acme Inc".to_string(),
        }
    }

    #[test]
    fn match_batch_header_shape() {
        let records = vec![record("Acme Corp", MatchKind::Exact, 100.0)];
        let mut buffer = Vec::new();
        write_match_batch_to(&mut buffer, &records).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let mut lines = output.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Assignee_Original,Assignee_Clean,Matched_Acquiror_Clean,Match_Type,Similarity,Tier,Original_Acquiror_Name"
        );
        assert_eq!(
            lines.next().unwrap(),
            "Acme Corp,ACME CORP,ACME,Strict,100.0,Tier 1,Acme Inc"
        );
    }

    #[test]
    fn review_sorting_puts_weak_fuzzy_first() {
        let mut records = vec![
            record("c", MatchKind::Exact, 100.0),
            record("a", MatchKind::Approximate, 97.0),
            record("b", MatchKind::Approximate, 91.5),
        ];
        sort_for_review(&mut records);
        assert_eq!(records[0].assignee_original, "b");
        assert_eq!(records[1].assignee_original, "a");
        assert_eq!(records[2].assignee_original, "c");
    }

    #[test]
    fn dictionary_view_is_sorted_by_target() {
        let mut master = BTreeMap::new();
        master.insert("zeta".to_string(), "Acme".to_string());
        master.insert("alpha".to_string(), "Zenith".to_string());
        master.insert("beta".to_string(), "Acme".to_string());

        let mut buffer = Vec::new();
        write_dictionary_view_to(&mut buffer, &master).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "Assignee_Original_Name,Mapped_Acquiror_Name");
        assert_eq!(lines[1], "beta,Acme");
        assert_eq!(lines[2], "zeta,Acme");
        assert_eq!(lines[3], "alpha,Zenith");
    }
}
