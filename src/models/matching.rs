// src/models/matching.rs - Match results and tier definitions

use serde::{Deserialize, Serialize};

/// How a match was found. `Exact` is reserved for byte-identical cleaned
/// names; a token-set score of 100 on differing strings stays
/// `Approximate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    Exact,
    Approximate,
}

impl MatchKind {
    pub fn is_exact(&self) -> bool {
        matches!(self, MatchKind::Exact)
    }
}

/// Volume-based bucket of assignees. Tiers partition the ranked activity
/// list and each carries its own matching policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Tier {
    Tier1,
    Tier2,
    Tier3,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Tier1 => "Tier 1",
            Tier::Tier2 => "Tier 2",
            Tier::Tier3 => "Tier 3",
        }
    }
}

/// One successful match between a patent assignee and an acquiror roster
/// entry. Unmatched assignees produce no record at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub assignee_original: String,
    pub assignee_clean: String,
    pub matched_acquiror_clean: String,
    pub kind: MatchKind,
    /// Similarity in [0, 100]. Always 100.0 for exact matches.
    pub similarity: f64,
    /// Fuzzy threshold the match had to clear; None for exact matches.
    pub fuzzy_floor: Option<u32>,
    pub tier: Tier,
    /// Display-form acquiror name behind the matched cleaned form. Empty
    /// when the roster carried no display name for it.
    pub acquiror_original: String,
}

impl MatchRecord {
    /// Label written to the Match_Type column of batch artifacts.
    pub fn match_type_label(&self) -> String {
        match self.kind {
            MatchKind::Exact => "Strict".to_string(),
            MatchKind::Approximate => match self.fuzzy_floor {
                Some(floor) => format!("Fuzzy (>={})", floor),
                None => "Fuzzy".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_labels() {
        assert_eq!(Tier::Tier1.as_str(), "Tier 1");
        assert_eq!(Tier::Tier3.as_str(), "Tier 3");
    }

    #[test]
    fn match_type_label_formats() {
        let mut record = MatchRecord {
            assignee_original: "Acme Corp.".to_string(),
            assignee_clean: "ACME".to_string(),
            matched_acquiror_clean: "ACME".to_string(),
            kind: MatchKind::Exact,
            similarity: 100.0,
            fuzzy_floor: None,
            tier: Tier::Tier1,
            acquiror_original: "Acme Corporation".to_string(),
        };
        assert_eq!(record.match_type_label(), "Strict");

        record.kind = MatchKind::Approximate;
        record.fuzzy_floor = Some(90);
        assert_eq!(record.match_type_label(), "Fuzzy (>=90)");
    }
}
