//! Deterministic collaborators for tests and offline runs.
//!
//! These satisfy the same capability interfaces as the LLM-backed agent,
//! so the engine can run end-to-end with no network at all.

use std::collections::HashMap;

use async_trait::async_trait;

use listscout_corpus::Taxonomy;
use listscout_shared::{ProjectIdea, ResearchPlan, Resource, Result};

use crate::traits::{IdeaWriter, Planner, Searcher};

// ---------------------------------------------------------------------------
// ScriptedPlanner
// ---------------------------------------------------------------------------

/// Rule-based planner: every category in corpus order, generic fallback
/// search terms per category.
#[derive(Debug, Default)]
pub struct ScriptedPlanner;

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, taxonomy: &Taxonomy) -> Result<ResearchPlan> {
        let priority_categories: Vec<String> = taxonomy.category_ids().to_vec();
        let search_terms = priority_categories
            .iter()
            .map(|id| (id.clone(), taxonomy.fallback_terms(id)))
            .collect();

        Ok(ResearchPlan {
            priority_categories,
            search_terms,
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedSearcher
// ---------------------------------------------------------------------------

/// Searcher returning canned results keyed by search term.
///
/// Terms with no entry yield an empty result set.
#[derive(Debug, Default)]
pub struct ScriptedSearcher {
    results: HashMap<String, Vec<Resource>>,
}

impl ScriptedSearcher {
    /// Register canned results for a term.
    pub fn with_results(mut self, term: impl Into<String>, results: Vec<Resource>) -> Self {
        self.results.insert(term.into(), results);
        self
    }
}

#[async_trait]
impl Searcher for ScriptedSearcher {
    async fn search(&self, term: &str, _category: &str) -> Result<Vec<Resource>> {
        Ok(self.results.get(term).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// ScriptedIdeaWriter
// ---------------------------------------------------------------------------

/// Idea writer producing one templated idea per fresh resource.
#[derive(Debug, Default)]
pub struct ScriptedIdeaWriter;

#[async_trait]
impl IdeaWriter for ScriptedIdeaWriter {
    async fn generate_ideas(
        &self,
        category: &str,
        _existing: &[Resource],
        fresh: &[Resource],
    ) -> Result<Vec<ProjectIdea>> {
        Ok(fresh
            .iter()
            .map(|r| ProjectIdea {
                title: format!("Build on {}", r.title),
                description: format!("Explore an integration based on {}.", r.url),
                category: category.to_string(),
                tags: r.tags.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_taxonomy() -> Taxonomy {
        let fixture =
            std::fs::read_to_string("../../../fixtures/json/contents.fixture.json")
                .expect("read corpus fixture");
        listscout_corpus::parse_contents(&fixture).expect("parse fixture")
    }

    #[tokio::test]
    async fn scripted_planner_covers_all_categories() {
        let taxonomy = test_taxonomy();
        let plan = ScriptedPlanner.plan(&taxonomy).await.expect("plan");
        assert_eq!(plan.priority_categories.len(), 3);
        assert!(plan.search_terms.values().all(|terms| !terms.is_empty()));
    }

    #[tokio::test]
    async fn scripted_searcher_returns_canned_results() {
        let searcher = ScriptedSearcher::default().with_results(
            "encoder",
            vec![Resource {
                title: "SVT-AV1".into(),
                url: "https://gitlab.com/AOMediaCodec/SVT-AV1".into(),
                description: String::new(),
                category: String::new(),
                tags: vec![],
            }],
        );

        let hits = searcher.search("encoder", "encoding").await.expect("search");
        assert_eq!(hits.len(), 1);

        let misses = searcher.search("unknown", "encoding").await.expect("search");
        assert!(misses.is_empty());
    }

    #[tokio::test]
    async fn scripted_writer_templates_ideas() {
        let fresh = vec![Resource {
            title: "GStreamer".into(),
            url: "https://gstreamer.freedesktop.org/".into(),
            description: String::new(),
            category: "pipelines".into(),
            tags: vec!["streaming".into()],
        }];

        let ideas = ScriptedIdeaWriter
            .generate_ideas("pipelines", &[], &fresh)
            .await
            .expect("ideas");
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].category, "pipelines");
    }
}
