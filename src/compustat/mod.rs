// src/compustat/mod.rs - Acquiror to Compustat identity resolution
//
// Stage A matches acquiror names against the Compustat company roster
// and emits a verification file for a human to prune. Stage B trusts the
// pruned file and fills gvkey/cusip/cik into the outcome table, touching
// only blank cells. Identifiers stay strings end to end so leading
// zeros survive.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::matching::engine::CandidateSet;
use crate::models::matching::MatchKind;
use crate::normalize::clean_company_name;
use crate::utils::progress_bars::logging::StageLogger;
use crate::utils::progress_bars::progress_config::ProgressConfig;

/// One candidate pairing for the human verifier.
#[derive(Debug, Clone, Serialize)]
pub struct VerificationRow {
    #[serde(rename = "Acquiror_Original")]
    pub acquiror_original: String,
    #[serde(rename = "Matched_Compustat_Original")]
    pub matched_compustat_original: String,
    #[serde(rename = "Match_Type")]
    pub match_type: String,
    #[serde(rename = "Score")]
    pub score: f64,
    #[serde(rename = "Acquiror_Clean")]
    pub acquiror_clean: String,
    #[serde(rename = "Matched_Compustat_Clean")]
    pub matched_compustat_clean: String,
}

/// Compustat identifiers for one company row. Blank when the roster row
/// itself was blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompustatIds {
    pub gvkey: String,
    pub cusip: String,
    pub cik: String,
}

/// Acquiror names from the completed outcome table that have patent
/// evidence attached (non-blank patent_name), deduplicated keep-first.
pub fn read_outcome_targets(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_outcome_targets(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_outcome_targets<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers().context("missing header row")?.clone();
    let name_idx = match headers.iter().position(|h| h == "acquiror_name") {
        Some(idx) => idx,
        None => bail!("required column acquiror_name not found"),
    };
    let patent_name_idx = match headers.iter().position(|h| h == "patent_name") {
        Some(idx) => idx,
        None => bail!("required column patent_name not found"),
    };

    let mut seen = std::collections::HashSet::new();
    let mut targets = Vec::new();
    for record in csv_reader.records() {
        let record = record.context("malformed CSV record")?;
        if record.get(patent_name_idx).unwrap_or("").trim().is_empty() {
            continue;
        }
        let name = record.get(name_idx).unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.to_string()) {
            targets.push(name.to_string());
        }
    }
    Ok(targets)
}

/// Company display names from the Compustat extract (conm column).
pub fn read_compustat_names(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_compustat_names(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_compustat_names<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers().context("missing header row")?.clone();
    let conm_idx = match headers.iter().position(|h| h == "conm") {
        Some(idx) => idx,
        None => bail!("required column conm not found"),
    };
    let mut names = Vec::new();
    for record in csv_reader.records() {
        let record = record.context("malformed CSV record")?;
        let name = record.get(conm_idx).unwrap_or("").trim();
        if !name.is_empty() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Match acquiror names against the Compustat roster: exact membership
/// first, then one fuzzy lookup at the verification threshold. Runs
/// sequentially; the verification list is small compared to stage 1.
pub fn match_against_roster(
    targets: &[String],
    roster: &CandidateSet,
    threshold: f64,
    progress: &ProgressConfig,
    logger: &StageLogger,
) -> Vec<VerificationRow> {
    let bar = progress.create_bar(targets.len() as u64, "matching against Compustat");
    let mut rows = Vec::new();
    let mut exact_hits = 0usize;
    let mut fuzzy_hits = 0usize;

    for target in targets {
        if let Some(bar) = &bar {
            bar.inc(1);
        }
        let clean = clean_company_name(target);
        if clean.is_empty() {
            continue;
        }
        let hit = match roster.exact_match(&clean) {
            Some(hit) => Some(hit),
            None => roster.fuzzy_match(&clean, threshold),
        };
        let Some(hit) = hit else {
            continue;
        };
        match hit.kind {
            MatchKind::Exact => exact_hits += 1,
            MatchKind::Approximate => fuzzy_hits += 1,
        }
        rows.push(VerificationRow {
            acquiror_original: target.clone(),
            matched_compustat_original: roster
                .display_name(&hit.matched_clean)
                .unwrap_or_default()
                .to_string(),
            match_type: match hit.kind {
                MatchKind::Exact => "Strict".to_string(),
                MatchKind::Approximate => "Fuzzy".to_string(),
            },
            score: hit.similarity,
            acquiror_clean: clean,
            matched_compustat_clean: hit.matched_clean,
        });
    }

    if let Some(bar) = bar {
        bar.finish_with_message("Compustat matching complete");
    }
    logger.log_debug(&format!(
        "Compustat matching: {} strict, {} fuzzy of {} targets",
        exact_hits,
        fuzzy_hits,
        targets.len()
    ));
    rows
}

/// Sort for the verifier: fuzzy pairings before strict, weakest scores
/// first.
pub fn sort_verification(rows: &mut [VerificationRow]) {
    rows.sort_by(|a, b| {
        a.match_type
            .cmp(&b.match_type)
            .then_with(|| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal))
            .then_with(|| a.acquiror_original.cmp(&b.acquiror_original))
    });
}

pub fn write_verification(path: &Path, rows: &[VerificationRow]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut csv_writer = csv::Writer::from_writer(BufWriter::new(file));
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Compustat identifiers keyed by display name, keep-first on conm.
pub fn read_compustat_ids(path: &Path) -> Result<HashMap<String, CompustatIds>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_compustat_ids(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_compustat_ids<R: Read>(reader: R) -> Result<HashMap<String, CompustatIds>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers().context("missing header row")?.clone();
    let conm_idx = match headers.iter().position(|h| h == "conm") {
        Some(idx) => idx,
        None => bail!("required column conm not found"),
    };
    let gvkey_idx = headers.iter().position(|h| h == "gvkey");
    let cusip_idx = headers.iter().position(|h| h == "cusip");
    let cik_idx = headers.iter().position(|h| h == "cik");

    let mut ids = HashMap::new();
    for record in csv_reader.records() {
        let record = record.context("malformed CSV record")?;
        let conm = record.get(conm_idx).unwrap_or("").trim();
        if conm.is_empty() {
            continue;
        }
        let get = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .unwrap_or("")
                .trim()
                .to_string()
        };
        ids.entry(conm.to_string()).or_insert_with(|| CompustatIds {
            gvkey: get(gvkey_idx),
            cusip: get(cusip_idx),
            cik: get(cik_idx),
        });
    }
    Ok(ids)
}

/// The human-verified pairings: acquiror display name to Compustat
/// display name, deduplicated keep-first on the acquiror.
pub fn read_verified_pairs(path: &Path) -> Result<Vec<(String, String)>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_verified_pairs(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_verified_pairs<R: Read>(reader: R) -> Result<Vec<(String, String)>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers().context("missing header row")?.clone();
    let acquiror_idx = headers.iter().position(|h| h == "Acquiror_Original");
    let conm_idx = headers.iter().position(|h| h == "Matched_Compustat_Original");
    let (acquiror_idx, conm_idx) = match (acquiror_idx, conm_idx) {
        (Some(a), Some(b)) => (a, b),
        _ => bail!("required columns Acquiror_Original and Matched_Compustat_Original not found"),
    };

    let mut seen = std::collections::HashSet::new();
    let mut pairs = Vec::new();
    for record in csv_reader.records() {
        let record = record.context("malformed CSV record")?;
        let acquiror = record.get(acquiror_idx).unwrap_or("").trim();
        let conm = record.get(conm_idx).unwrap_or("").trim();
        if acquiror.is_empty() || conm.is_empty() {
            continue;
        }
        if seen.insert(acquiror.to_string()) {
            pairs.push((acquiror.to_string(), conm.to_string()));
        }
    }
    Ok(pairs)
}

#[derive(Debug, Clone, Default)]
pub struct ApplyStats {
    pub rows_written: usize,
    pub rows_matched: usize,
    pub filled_gvkey: usize,
    pub filled_cusip: usize,
    pub filled_cik: usize,
}

const ID_COLUMNS: [&str; 4] = ["gvkey", "cusip", "cik", "compustat_name"];

/// Fill Compustat identifiers into the outcome table. Existing non-blank
/// cells are preserved; missing identifier columns are appended.
pub fn apply_verified_ids(
    outcome_path: &Path,
    out_path: &Path,
    verified: &[(String, String)],
    ids: &HashMap<String, CompustatIds>,
) -> Result<ApplyStats> {
    let outcome = File::open(outcome_path)
        .with_context(|| format!("failed to open {}", outcome_path.display()))?;
    let out = File::create(out_path)
        .with_context(|| format!("failed to create {}", out_path.display()))?;
    merge_verified_ids(BufReader::new(outcome), BufWriter::new(out), verified, ids)
        .with_context(|| format!("failed to write {}", out_path.display()))
}

pub fn merge_verified_ids<R: Read, W: Write>(
    outcome: R,
    writer: W,
    verified: &[(String, String)],
    ids: &HashMap<String, CompustatIds>,
) -> Result<ApplyStats> {
    let verified_map: HashMap<&str, &str> = verified
        .iter()
        .map(|(acquiror, conm)| (acquiror.as_str(), conm.as_str()))
        .collect();

    let mut csv_reader = csv::Reader::from_reader(outcome);
    let headers = csv_reader.headers().context("missing header row")?.clone();
    let name_idx = match headers.iter().position(|h| h == "acquiror_name") {
        Some(idx) => idx,
        None => bail!("required column acquiror_name not found"),
    };

    // Reuse existing identifier columns, append any that are missing
    let mut out_headers: Vec<String> = headers.iter().map(str::to_string).collect();
    let mut id_indices = HashMap::new();
    for column in ID_COLUMNS {
        let idx = match headers.iter().position(|h| h == column) {
            Some(idx) => idx,
            None => {
                out_headers.push(column.to_string());
                out_headers.len() - 1
            }
        };
        id_indices.insert(column, idx);
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(&out_headers)?;

    let mut stats = ApplyStats::default();
    for record in csv_reader.records() {
        let record = record.context("malformed CSV record")?;
        let mut row: Vec<String> = (0..out_headers.len())
            .map(|idx| record.get(idx).unwrap_or("").to_string())
            .collect();

        let name = record.get(name_idx).unwrap_or("").trim();
        if let Some(conm) = verified_map.get(name) {
            stats.rows_matched += 1;
            let company_ids = ids.get(*conm);
            let mut fill = |column: &str, value: &str, counter: Option<&mut usize>| {
                let idx = id_indices[column];
                if row[idx].trim().is_empty() && !value.is_empty() {
                    row[idx] = value.to_string();
                    if let Some(counter) = counter {
                        *counter += 1;
                    }
                }
            };
            if let Some(company_ids) = company_ids {
                fill("gvkey", &company_ids.gvkey, Some(&mut stats.filled_gvkey));
                fill("cusip", &company_ids.cusip, Some(&mut stats.filled_cusip));
                fill("cik", &company_ids.cik, Some(&mut stats.filled_cik));
            }
            fill("compustat_name", conm, None);
        }

        stats.rows_written += 1;
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;
    Ok(stats)
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

    #[test]
    fn outcome_targets_require_patent_evidence() {
        let csv = "acquiror_name,patent_name\nAcme Inc,Acme Corp\nZenith,\nAcme Inc,Acme Co\n";
        let targets = parse_outcome_targets(csv.as_bytes()).unwrap();
        assert_eq!(targets, vec!["Acme Inc".to_string()]);
    }

    #[test]
    fn roster_matching_splits_strict_and_fuzzy() {
        let roster = CandidateSet::from_roster(vec!["Acme Corp", "General Dynamics Corp"]);
        let targets = vec![
            "Acme Incorporated".to_string(), // cleans to ACME, strict
            "General Dynamic".to_string(),   // near miss, fuzzy
            "Completely Unrelated".to_string(),
        ];
        let logger = StageLogger::new(PipelineStage::CompustatVerify);
        let rows = match_against_roster(&targets, &roster, 90.0, &quiet_progress(), &logger);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].match_type, "Strict");
        assert_eq!(rows[0].score, 100.0);
        assert_eq!(rows[0].matched_compustat_original, "Acme Corp");
        assert_eq!(rows[1].match_type, "Fuzzy");
        assert!(rows[1].score >= 90.0 && rows[1].score < 100.0);
    }

    #[test]
    fn verification_sorts_fuzzy_and_weak_first() {
        let mut rows = vec![
            VerificationRow {
                acquiror_original: "a".into(),
                matched_compustat_original: "x".into(),
                match_type: "Strict".into(),
                score: 100.0,
                acquiror_clean: "A".into(),
                matched_compustat_clean: "X".into(),
            },
            VerificationRow {
                acquiror_original: "b".into(),
                matched_compustat_original: "y".into(),
                match_type: "Fuzzy".into(),
                score: 97.0,
                acquiror_clean: "B".into(),
                matched_compustat_clean: "Y".into(),
            },
            VerificationRow {
                acquiror_original: "c".into(),
                matched_compustat_original: "z".into(),
                match_type: "Fuzzy".into(),
                score: 91.0,
                acquiror_clean: "C".into(),
                matched_compustat_clean: "Z".into(),
            },
        ];
        sort_verification(&mut rows);
        assert_eq!(rows[0].acquiror_original, "c");
        assert_eq!(rows[1].acquiror_original, "b");
        assert_eq!(rows[2].acquiror_original, "a");
    }

    #[test]
    fn compustat_ids_keep_first_and_preserve_leading_zeros() {
        let csv = "conm,gvkey,cusip,cik\nAcme Corp,001234,03783310,0000320193\nAcme Corp,999999,,\n";
        let ids = parse_compustat_ids(csv.as_bytes()).unwrap();
        let acme = &ids["Acme Corp"];
        assert_eq!(acme.gvkey, "001234");
        assert_eq!(acme.cusip, "03783310");
        assert_eq!(acme.cik, "0000320193");
    }

    #[test]
    fn apply_fills_only_blank_cells() {
        let outcome = "acquiror_name,deal_year,gvkey\nAcme Inc,1998,\nZenith,1999,555\nOther,2000,\n";
        let verified = vec![
            ("Acme Inc".to_string(), "Acme Corp".to_string()),
            ("Zenith".to_string(), "Zenith Co".to_string()),
        ];
        let mut ids = HashMap::new();
        ids.insert(
            "Acme Corp".to_string(),
            CompustatIds {
                gvkey: "001234".into(),
                cusip: "03783310".into(),
                cik: "".into(),
            },
        );
        ids.insert(
            "Zenith Co".to_string(),
            CompustatIds {
                gvkey: "777".into(),
                cusip: "888".into(),
                cik: "999".into(),
            },
        );

        let mut buffer = Vec::new();
        let stats = merge_verified_ids(outcome.as_bytes(), &mut buffer, &verified, &ids).unwrap();

        assert_eq!(stats.rows_written, 3);
        assert_eq!(stats.rows_matched, 2);
        assert_eq!(stats.filled_gvkey, 1); // Zenith's existing 555 untouched
        assert_eq!(stats.filled_cusip, 2);

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "acquiror_name,deal_year,gvkey,cusip,cik,compustat_name");
        assert_eq!(lines[1], "Acme Inc,1998,001234,03783310,,Acme Corp");
        assert_eq!(lines[2], "Zenith,1999,555,888,999,Zenith Co");
        assert_eq!(lines[3], "Other,2000,,,,");
    }
}
