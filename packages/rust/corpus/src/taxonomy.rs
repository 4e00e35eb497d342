//! The category forest plus per-category item lists.
//!
//! Loaded once at run start; read-mostly afterwards. Only the run's
//! accumulator grows — the taxonomy itself is never mutated during a run.

use std::collections::{BTreeMap, HashSet};

use listscout_shared::{Category, ListScoutError, Resource, Result};

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// The full category forest with the existing items of the curated catalog.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    /// Categories keyed by identifier.
    categories: BTreeMap<String, Category>,
    /// Category identifiers in corpus order.
    order: Vec<String>,
    /// Existing items keyed by category identifier.
    items: BTreeMap<String, Vec<Resource>>,
    /// SHA-256 fingerprint of the raw corpus content.
    fingerprint: String,
}

impl Taxonomy {
    /// Build a taxonomy from parsed categories and items, validating the
    /// forest structure (parents must exist, no cycles) and deriving the
    /// `children` lists.
    pub fn build(
        mut categories: Vec<Category>,
        items: BTreeMap<String, Vec<Resource>>,
        fingerprint: String,
    ) -> Result<Self> {
        let ids: HashSet<String> = categories.iter().map(|c| c.id.clone()).collect();

        // Parent references must resolve.
        for category in &categories {
            if let Some(parent) = &category.parent {
                if !ids.contains(parent) {
                    return Err(ListScoutError::corpus(format!(
                        "category '{}' references unknown parent '{parent}'",
                        category.id
                    )));
                }
            }
        }

        // Derive children from parent links.
        let mut children: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for category in &categories {
            if let Some(parent) = &category.parent {
                children
                    .entry(parent.clone())
                    .or_default()
                    .push(category.id.clone());
            }
        }
        for category in &mut categories {
            if let Some(kids) = children.remove(&category.id) {
                category.children = kids;
            }
        }

        let order: Vec<String> = categories.iter().map(|c| c.id.clone()).collect();
        let by_id: BTreeMap<String, Category> =
            categories.into_iter().map(|c| (c.id.clone(), c)).collect();

        let taxonomy = Self {
            categories: by_id,
            order,
            items,
            fingerprint,
        };
        taxonomy.check_acyclic()?;
        Ok(taxonomy)
    }

    /// Walk parent chains and reject cycles.
    fn check_acyclic(&self) -> Result<()> {
        for start in self.categories.keys() {
            let mut seen = HashSet::new();
            let mut current = Some(start.clone());
            while let Some(id) = current {
                if !seen.insert(id.clone()) {
                    return Err(ListScoutError::corpus(format!(
                        "category parent cycle involving '{id}'"
                    )));
                }
                current = self
                    .categories
                    .get(&id)
                    .and_then(|c| c.parent.clone());
            }
        }
        Ok(())
    }

    /// Category identifiers in corpus order.
    pub fn category_ids(&self) -> &[String] {
        &self.order
    }

    /// Look up a category by identifier.
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.get(id)
    }

    /// Display title for a category, falling back to the identifier.
    pub fn title_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.categories.get(id).map(|c| c.title.as_str()).unwrap_or(id)
    }

    /// Existing items for a category (empty slice if none).
    pub fn items_for(&self, id: &str) -> &[Resource] {
        self.items.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Up to `n` existing items for a category, used as collaborator context.
    pub fn sample_items(&self, id: &str, n: usize) -> &[Resource] {
        let items = self.items_for(id);
        &items[..items.len().min(n)]
    }

    /// Total number of existing items across all categories.
    pub fn total_items(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }

    /// Per-category existing item counts.
    pub fn seed_counts(&self) -> BTreeMap<String, usize> {
        self.order
            .iter()
            .map(|id| (id.clone(), self.items_for(id).len()))
            .collect()
    }

    /// The normalized identity keys of every existing item, used to seed
    /// the deduplication index.
    pub fn seed_keys(&self) -> Vec<String> {
        self.items
            .values()
            .flatten()
            .map(Resource::identity_key)
            .collect()
    }

    /// SHA-256 fingerprint of the raw corpus content, for checkpoint
    /// provenance.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Generic search terms for a category the plan left uncovered.
    pub fn fallback_terms(&self, id: &str) -> Vec<String> {
        let title = self.title_of(id);
        vec![
            format!("best {title} tools"),
            format!("{title} software"),
            format!("{title} tutorials"),
            format!("github {title}"),
            format!("{title} for video"),
        ]
    }
}

// ---------------------------------------------------------------------------
// CorpusStats
// ---------------------------------------------------------------------------

/// Summary statistics over a loaded corpus.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CorpusStats {
    /// Number of categories.
    pub category_count: usize,
    /// Number of categories with no parent.
    pub top_level_count: usize,
    /// Total existing items.
    pub total_items: usize,
    /// Existing item counts keyed by category.
    pub counts_by_category: BTreeMap<String, usize>,
}

/// Compute summary statistics for a taxonomy.
pub fn corpus_stats(taxonomy: &Taxonomy) -> CorpusStats {
    let top_level_count = taxonomy
        .category_ids()
        .iter()
        .filter(|id| taxonomy.category(id).is_some_and(|c| c.parent.is_none()))
        .count();

    CorpusStats {
        category_count: taxonomy.category_ids().len(),
        top_level_count,
        total_items: taxonomy.total_items(),
        counts_by_category: taxonomy.seed_counts(),
    }
}
