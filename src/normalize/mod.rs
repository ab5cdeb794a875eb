// src/normalize/mod.rs - Company name canonicalization
//
// Shared by every stage so that assignee, acquiror and Compustat names
// all collapse to the same comparable form. The transform is total and
// idempotent; suffix-only names collapse to the empty string, which
// callers treat as "nothing to match".

use once_cell::sync::Lazy;
use regex::Regex;

/// One whole-word rewrite, applied in table order.
struct RewriteRule {
    pattern: Regex,
    replacement: &'static str,
}

/// Common abbreviations expanded to their full form before suffix
/// stripping, so that abbreviated legal suffixes are recognized.
static ABBREVIATIONS: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    [
        (r"\bINTL\b", "INTERNATIONAL"),
        (r"\bNATL\b", "NATIONAL"),
        (r"\bCORP\b", "CORPORATION"),
        (r"\bINC\b", "INCORPORATED"),
        (r"\bMFG\b", "MANUFACTURING"),
        (r"\bTECH\b", "TECHNOLOGY"),
        (r"\bSYS\b", "SYSTEMS"),
    ]
    .iter()
    .map(|(pattern, replacement)| RewriteRule {
        pattern: Regex::new(pattern).unwrap(),
        replacement,
    })
    .collect()
});

/// Legal-entity suffixes, stripped in order. Full forms come first so a
/// shorter overlapping form never corrupts a longer one (stripping CORP
/// before CORPORATION would leave ORATION behind).
static LEGAL_SUFFIXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Full forms first
        r"\bINCORPORATED\b",
        r"\bCORPORATION\b",
        r"\bCOMPANY\b",
        r"\bLIMITED\b",
        r"\bGROUP\b",
        // Dotted abbreviations
        r"\bCORP\.?\b",
        r"\bINC\.?\b",
        r"\bLTD\.?\b",
        r"\bCO\.?\b",
        r"\bL\.L\.C\.?\b",
        r"\bPLC\.?\b",
        // Bare forms
        r"\bLLC\b",
        r"\bS\.A\.\b",
        r"\bNV\b",
        r"\bGMBH\b",
        r"\bSA\b",
        r"\bAG\b",
        r"\bKK\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).unwrap())
    .collect()
});

static NON_ALPHANUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Z0-9\s]").unwrap());
static WHITESPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Canonicalize a raw company name. Steps run in a fixed order; later
/// steps assume earlier ones already ran.
pub fn clean_company_name(raw: &str) -> String {
    let mut name = raw.trim().to_uppercase();
    if name.is_empty() {
        return String::new();
    }

    // Symbol handling
    name = name.replace('&', " AND ");
    name = name.replace('-', " ");
    name = name.replace('\'', "");

    // Abbreviation expansion (improves the match rate and turns e.g.
    // INC into INCORPORATED so the suffix pass below catches it)
    for rule in ABBREVIATIONS.iter() {
        name = rule.pattern.replace_all(&name, rule.replacement).into_owned();
    }

    // Legal suffix stripping
    for suffix in LEGAL_SUFFIXES.iter() {
        name = suffix.replace_all(&name, "").into_owned();
    }

    // Keep only uppercase letters, digits and whitespace
    name = NON_ALPHANUMERIC.replace_all(&name, " ").into_owned();

    // Collapse whitespace runs
    WHITESPACE_RUNS.replace_all(&name, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_legal_suffixes() {
        assert_eq!(clean_company_name("Acme Corp."), "ACME");
        assert_eq!(clean_company_name("Acme Corporation"), "ACME");
        assert_eq!(clean_company_name("Acme Inc"), "ACME");
        assert_eq!(clean_company_name("Acme GmbH"), "ACME");
    }

    #[test]
    fn substitutes_symbols() {
        assert_eq!(clean_company_name("AT&T Inc"), "AT AND T");
        assert_eq!(clean_company_name("O'Brien & Sons, LLC"), "OBRIEN AND SONS");
        assert_eq!(clean_company_name("Smith-Jones Ltd."), "SMITH JONES");
    }

    #[test]
    fn expands_abbreviations_before_suffix_stripping() {
        assert_eq!(clean_company_name("Acme Tech"), "ACME TECHNOLOGY");
        assert_eq!(clean_company_name("Intl Widgets Co."), "INTERNATIONAL WIDGETS");
        assert_eq!(clean_company_name("Natl Mfg Sys Corp"), "NATIONAL MANUFACTURING SYSTEMS");
    }

    #[test]
    fn suffix_only_names_collapse_to_empty() {
        assert_eq!(clean_company_name("Inc."), "");
        assert_eq!(clean_company_name("Corp Co Ltd"), "");
        assert_eq!(clean_company_name(""), "");
        assert_eq!(clean_company_name("   "), "");
    }

    #[test]
    fn keeps_digits() {
        assert_eq!(clean_company_name("3M"), "3M");
        assert_eq!(clean_company_name("7-Eleven Inc"), "7 ELEVEN");
    }

    #[test]
    fn non_ascii_characters_become_spaces() {
        assert_eq!(clean_company_name("Café Münster AG"), "CAF M NSTER");
    }

    #[test]
    fn idempotent() {
        let samples = [
            "Acme Corp.",
            "AT&T Inc",
            "O'Brien & Sons, LLC",
            "Intl Widgets Co.",
            "3M",
            "Nippon Denki K.K.",
            "Siemens AG",
            "  spaced   out  name  ",
            "Inc.",
        ];
        for raw in samples {
            let once = clean_company_name(raw);
            assert_eq!(clean_company_name(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn deterministic() {
        let raw = "General Dynamics Corp.";
        assert_eq!(clean_company_name(raw), clean_company_name(raw));
    }
}
