//! Run statistics: pure reporting over accumulated findings.
//!
//! Decoupled from scheduling — these functions only fold over the run's
//! snapshot and, for the final report, the seed corpus baseline.

use std::collections::BTreeMap;

use listscout_shared::{ProjectIdea, Resource, RunStats};

/// Per-category counts for an intermediate checkpoint.
pub fn snapshot_stats(resources: &[Resource], ideas: &[ProjectIdea]) -> RunStats {
    let mut resources_by_category: BTreeMap<String, usize> = BTreeMap::new();
    for resource in resources {
        *resources_by_category
            .entry(resource.category.clone())
            .or_default() += 1;
    }

    let mut ideas_by_category: BTreeMap<String, usize> = BTreeMap::new();
    for idea in ideas {
        *ideas_by_category.entry(idea.category.clone()).or_default() += 1;
    }

    RunStats {
        resources_count: resources.len(),
        ideas_count: ideas.len(),
        resources_by_category,
        ideas_by_category,
        seed_by_category: BTreeMap::new(),
        growth_pct_by_category: BTreeMap::new(),
    }
}

/// Final-checkpoint statistics: snapshot counts plus the seed baseline and
/// growth percentage per category.
///
/// Growth for a category with no seed items is reported as 100% when
/// anything was accepted and 0% otherwise.
pub fn final_stats(
    resources: &[Resource],
    ideas: &[ProjectIdea],
    seed_by_category: &BTreeMap<String, usize>,
) -> RunStats {
    let mut stats = snapshot_stats(resources, ideas);

    let mut growth: BTreeMap<String, f64> = BTreeMap::new();
    for (category, accepted) in &stats.resources_by_category {
        let seed = seed_by_category.get(category).copied().unwrap_or(0);
        let pct = if seed > 0 {
            (*accepted as f64) * 100.0 / (seed as f64)
        } else if *accepted > 0 {
            100.0
        } else {
            0.0
        };
        growth.insert(category.clone(), pct);
    }

    stats.seed_by_category = seed_by_category.clone();
    stats.growth_pct_by_category = growth;
    stats
}
