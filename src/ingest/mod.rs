// src/ingest/mod.rs - CSV readers for the pipeline's upstream datasets

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::models::core::PatentRecord;

/// Number of inventor_nameN columns the patent schema may carry.
const INVENTOR_NAME_COLUMNS: usize = 10;

/// Read the acquiror registry: the ordered list of display names with
/// exact duplicates removed (first occurrence kept). Requires an
/// `acquiror_name` column.
pub fn read_acquiror_names(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_acquiror_names(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_acquiror_names<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers().context("missing header row")?.clone();
    let name_idx = match headers.iter().position(|h| h == "acquiror_name") {
        Some(idx) => idx,
        None => bail!("required column acquiror_name not found"),
    };

    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for record in csv_reader.records() {
        let record = record.context("malformed CSV record")?;
        let name = record.get(name_idx).unwrap_or("").trim();
        if name.is_empty() {
            continue;
        }
        if seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

/// Read the patent database. Requires an `assignee` column; rows with a
/// blank assignee are dropped. Year, declared inventor count and the
/// inventor name columns are optional and tolerated in any order.
pub fn read_patent_records(path: &Path) -> Result<Vec<PatentRecord>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_patent_records(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_patent_records<R: Read>(reader: R) -> Result<Vec<PatentRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader.headers().context("missing header row")?.clone();

    let assignee_idx = match headers.iter().position(|h| h == "assignee") {
        Some(idx) => idx,
        None => bail!("required column assignee not found"),
    };
    let year_idx = headers.iter().position(|h| h == "application_year");
    let inventors_idx = headers.iter().position(|h| h == "inventors");
    let name_indices: Vec<usize> = (1..=INVENTOR_NAME_COLUMNS)
        .filter_map(|i| {
            let column = format!("inventor_name{}", i);
            headers.iter().position(|h| h == column)
        })
        .collect();

    let mut records = Vec::new();
    for record in csv_reader.records() {
        let record = record.context("malformed CSV record")?;
        let assignee = record.get(assignee_idx).unwrap_or("").trim();
        if assignee.is_empty() {
            continue;
        }

        let application_year = year_idx
            .and_then(|idx| record.get(idx))
            .and_then(parse_year);
        let inventors = inventors_idx
            .and_then(|idx| record.get(idx))
            .and_then(|value| value.trim().parse::<f64>().ok());
        let inventor_names: Vec<String> = name_indices
            .iter()
            .filter_map(|&idx| record.get(idx))
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        records.push(PatentRecord {
            assignee: assignee.to_string(),
            application_year,
            inventors,
            inventor_names,
        });
    }
    Ok(records)
}

/// Years arrive as integers or as float renderings like "1995.0".
fn parse_year(value: &str) -> Option<i32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|year| year.is_finite() && *year > 0.0)
        .map(|year| year as i32)
}
