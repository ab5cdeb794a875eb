// src/models/core.rs - Source-record shapes shared across pipeline stages

use serde::{Deserialize, Serialize};

/// One row of the patent database, reduced to the fields the pipeline
/// consumes. The raw assignee string is never mutated; cleaned forms are
/// derived from it on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatentRecord {
    pub assignee: String,
    pub application_year: Option<i32>,
    /// Value of the numeric "inventors" column, when present and parseable.
    pub inventors: Option<f64>,
    /// Non-blank entries of the inventor_name1..inventor_name10 columns.
    pub inventor_names: Vec<String>,
}

impl PatentRecord {
    /// Inventor count for this patent: the larger of the declared count
    /// column and the number of named inventors.
    pub fn inventor_count(&self) -> u64 {
        let from_column = self.inventors.unwrap_or(0.0).max(0.0);
        let from_names = self.inventor_names.len() as f64;
        from_column.max(from_names) as u64
    }
}

/// Per-company activity summary: one row per distinct (assignee, cleaned
/// name) pair, carrying the volume metrics the tiering step ranks by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyActivity {
    pub assignee: String,
    pub clean_name: String,
    pub patent_count: u64,
    pub inventor_sum: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(inventors: Option<f64>, names: &[&str]) -> PatentRecord {
        PatentRecord {
            assignee: "ACME".to_string(),
            application_year: Some(1995),
            inventors,
            inventor_names: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn inventor_count_uses_larger_of_column_and_names() {
        assert_eq!(record(Some(3.0), &["a"]).inventor_count(), 3);
        assert_eq!(record(Some(1.0), &["a", "b", "c"]).inventor_count(), 3);
        assert_eq!(record(None, &["a", "b"]).inventor_count(), 2);
        assert_eq!(record(None, &[]).inventor_count(), 0);
    }

    #[test]
    fn inventor_count_ignores_negative_column_values() {
        assert_eq!(record(Some(-4.0), &["a"]).inventor_count(), 1);
    }
}
