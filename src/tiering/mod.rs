// src/tiering/mod.rs - Volume-ranked tier partitioning
//
// The few highest-volume assignees justify full manual review; the long
// tail only gets exact matching. The cutoffs here decide which policy a
// company falls under, so the ranking must be deterministic.

use std::collections::HashMap;

use crate::models::core::{CompanyActivity, PatentRecord};
use crate::normalize::clean_company_name;
use crate::utils::constants::{TAIL_MAX_PATENT_COUNT, TOP_TIER_PERCENT};

/// Group patent records into per-company activity rows and rank them by
/// patent count descending. Records whose assignee cleans to the empty
/// string are dropped. Ties rank by cleaned name ascending, then
/// assignee, so tier membership never depends on input row order.
pub fn rank_company_activity(records: &[PatentRecord]) -> Vec<CompanyActivity> {
    let mut grouped: HashMap<(String, String), (u64, u64)> = HashMap::new();
    for record in records {
        let assignee = record.assignee.trim();
        if assignee.is_empty() {
            continue;
        }
        let clean = clean_company_name(assignee);
        if clean.is_empty() {
            continue;
        }
        let entry = grouped.entry((assignee.to_string(), clean)).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += record.inventor_count();
    }

    let mut ranked: Vec<CompanyActivity> = grouped
        .into_iter()
        .map(|((assignee, clean_name), (patent_count, inventor_sum))| CompanyActivity {
            assignee,
            clean_name,
            patent_count,
            inventor_sum,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.patent_count
            .cmp(&a.patent_count)
            .then_with(|| a.clean_name.cmp(&b.clean_name))
            .then_with(|| a.assignee.cmp(&b.assignee))
    });
    ranked
}

/// Split a ranked activity list into the three matching tiers.
///
/// Tier 1 is the top 5% by truncation; of the remainder, Tier 2 holds
/// companies with more than five patents and Tier 3 the rest. The tiers
/// are disjoint and together cover the whole input.
pub fn partition_by_volume(
    mut ranked: Vec<CompanyActivity>,
) -> (Vec<CompanyActivity>, Vec<CompanyActivity>, Vec<CompanyActivity>) {
    let cutoff = ranked.len() * TOP_TIER_PERCENT / 100;
    let remainder = ranked.split_off(cutoff);
    let (tier2, tier3): (Vec<_>, Vec<_>) = remainder
        .into_iter()
        .partition(|company| company.patent_count > TAIL_MAX_PATENT_COUNT);
    (ranked, tier2, tier3)
}
