// src/matching/engine.rs - Exact and approximate matching over a normalized roster

use std::collections::{BTreeSet, HashMap, HashSet};

use strsim::normalized_levenshtein;

use crate::models::matching::MatchKind;
use crate::normalize::clean_company_name;

/// Deduplicated, read-only collection of cleaned acquiror names, built
/// once per run. Candidates are enumerated in lexicographic order of
/// their cleaned form so that score ties always resolve the same way.
#[derive(Debug, Clone)]
pub struct CandidateSet {
    cleaned: HashSet<String>,
    ordered: Vec<String>,
    /// Cleaned form -> first display name observed for it.
    display_names: HashMap<String, String>,
}

/// Result of a single engine lookup; the orchestrator wraps it into a
/// full MatchRecord with tier and provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineMatch {
    pub matched_clean: String,
    pub similarity: f64,
    pub kind: MatchKind,
}

impl CandidateSet {
    /// Build the set from display names as they appear in the roster.
    /// Names normalizing to the empty string are dropped; the first
    /// display name per cleaned form is kept for later resolution.
    pub fn from_roster<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cleaned = HashSet::new();
        let mut display_names = HashMap::new();
        for name in names {
            let display = name.as_ref().trim();
            if display.is_empty() {
                continue;
            }
            let clean = clean_company_name(display);
            if clean.is_empty() {
                continue;
            }
            display_names.entry(clean.clone()).or_insert_with(|| display.to_string());
            cleaned.insert(clean);
        }
        let mut ordered: Vec<String> = cleaned.iter().cloned().collect();
        ordered.sort_unstable();
        Self { cleaned, ordered, display_names }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn contains(&self, clean: &str) -> bool {
        self.cleaned.contains(clean)
    }

    /// Display-form name behind a cleaned form, when known.
    pub fn display_name(&self, clean: &str) -> Option<&str> {
        self.display_names.get(clean).map(String::as_str)
    }

    /// Membership test. Score 100 and kind Exact, by definition.
    pub fn exact_match(&self, query_clean: &str) -> Option<EngineMatch> {
        if query_clean.is_empty() || !self.cleaned.contains(query_clean) {
            return None;
        }
        Some(EngineMatch {
            matched_clean: query_clean.to_string(),
            similarity: 100.0,
            kind: MatchKind::Exact,
        })
    }

    /// Score every candidate with the token-set ratio and keep the best
    /// one at or above `threshold`. A strictly-greater comparison keeps
    /// the first (lexicographically smallest) candidate on ties. Returns
    /// kind Exact only when the winner is byte-identical to the query.
    pub fn fuzzy_match(&self, query_clean: &str, threshold: f64) -> Option<EngineMatch> {
        if query_clean.is_empty() {
            return None;
        }
        let mut best: Option<(f64, &String)> = None;
        for candidate in &self.ordered {
            let score = token_set_ratio(query_clean, candidate);
            if best.as_ref().map_or(true, |(top, _)| score > *top) {
                best = Some((score, candidate));
            }
        }
        let (score, candidate) = best?;
        if score < threshold {
            return None;
        }
        let kind = if candidate == query_clean {
            MatchKind::Exact
        } else {
            MatchKind::Approximate
        };
        Some(EngineMatch {
            matched_clean: candidate.clone(),
            similarity: if kind.is_exact() { 100.0 } else { score },
            kind,
        })
    }
}

/// Order-independent token-set similarity in [0, 100].
///
/// Both strings are split into whitespace token sets; the score is the
/// best normalized Levenshtein similarity among the intersection string
/// and the two intersection-plus-difference strings. A token subset
/// therefore scores 100, and identical token sets score 100 regardless
/// of word order.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 100.0;
    }
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    if !intersection.is_empty() && only_a.is_empty() && only_b.is_empty() {
        return 100.0;
    }

    let sect = intersection.join(" ");
    let combined_a = join_parts(&sect, &only_a);
    let combined_b = join_parts(&sect, &only_b);

    let ratio = normalized_levenshtein(&sect, &combined_a)
        .max(normalized_levenshtein(&sect, &combined_b))
        .max(normalized_levenshtein(&combined_a, &combined_b));
    ratio * 100.0
}

fn join_parts(sect: &str, rest: &[&str]) -> String {
    if rest.is_empty() {
        return sect.to_string();
    }
    if sect.is_empty() {
        return rest.join(" ");
    }
    format!("{} {}", sect, rest.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> CandidateSet {
        CandidateSet::from_roster(vec![
            "Acme Corporation",
            "Acme Technology Inc",
            "General Dynamics Corp.",
            "Boise Cascade Co",
        ])
    }

    #[test]
    fn roster_dedupes_on_cleaned_form() {
        let set = CandidateSet::from_roster(vec!["Acme Corp.", "ACME CORPORATION", "Acme Inc"]);
        assert_eq!(set.len(), 1);
        // First display name per cleaned form wins
        assert_eq!(set.display_name("ACME"), Some("Acme Corp."));
    }

    #[test]
    fn roster_drops_suffix_only_names() {
        let set = CandidateSet::from_roster(vec!["Inc.", "  ", "Acme Corp"]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn exact_match_requires_membership() {
        let set = roster();
        let hit = set.exact_match("ACME").unwrap();
        assert_eq!(hit.similarity, 100.0);
        assert_eq!(hit.kind, MatchKind::Exact);
        assert_eq!(hit.matched_clean, "ACME");
        assert!(set.exact_match("ACME WIDGETS").is_none());
        assert!(set.exact_match("").is_none());
    }

    #[test]
    fn abbreviation_expansion_turns_fuzzy_into_exact() {
        // "ACME TECH" cleans to "ACME TECHNOLOGY", which is in the set
        let set = roster();
        let clean = clean_company_name("Acme Tech");
        assert_eq!(clean, "ACME TECHNOLOGY");
        let hit = set.exact_match(&clean).unwrap();
        assert_eq!(hit.kind, MatchKind::Exact);
        assert_eq!(hit.similarity, 100.0);
    }

    #[test]
    fn token_set_ratio_is_order_independent() {
        assert_eq!(token_set_ratio("GENERAL DYNAMICS", "DYNAMICS GENERAL"), 100.0);
    }

    #[test]
    fn token_set_ratio_subset_scores_100() {
        assert_eq!(token_set_ratio("ACME", "ACME TECHNOLOGY"), 100.0);
    }

    #[test]
    fn token_set_ratio_disjoint_is_low() {
        assert!(token_set_ratio("ACME", "ZENITH") < 50.0);
        assert_eq!(token_set_ratio("ACME", ""), 0.0);
        assert_eq!(token_set_ratio("", ""), 100.0);
    }

    #[test]
    fn fuzzy_match_respects_threshold() {
        let set = roster();
        assert!(set.fuzzy_match("ZZZZZZ QQQQQQ", 90.0).is_none());
        let hit = set.fuzzy_match("GENERAL DYNAMIC", 80.0).unwrap();
        assert_eq!(hit.matched_clean, "GENERAL DYNAMICS");
        assert!(hit.similarity >= 80.0);
        assert_eq!(hit.kind, MatchKind::Approximate);
    }

    #[test]
    fn fuzzy_match_identical_query_reports_exact() {
        let set = roster();
        let hit = set.fuzzy_match("ACME", 90.0).unwrap();
        assert_eq!(hit.kind, MatchKind::Exact);
        assert_eq!(hit.similarity, 100.0);
        assert_eq!(hit.matched_clean, "ACME");
    }

    #[test]
    fn fuzzy_tie_breaks_lexicographically() {
        // Both candidates contain the query as a token subset, so both
        // score 100; the lexicographically smaller one must win.
        let set = CandidateSet::from_roster(vec!["Acme Beta", "Acme Alpha"]);
        let hit = set.fuzzy_match("ACME", 90.0).unwrap();
        assert_eq!(hit.matched_clean, "ACME ALPHA");
    }

    #[test]
    fn no_approximate_match_below_threshold() {
        let set = roster();
        for query in ["ACME WIDGET WORKS", "BOISE", "GENERAL ATOMICS"] {
            if let Some(hit) = set.fuzzy_match(query, 90.0) {
                assert!(hit.similarity >= 90.0, "{:?} -> {:?}", query, hit);
            }
        }
    }
}
