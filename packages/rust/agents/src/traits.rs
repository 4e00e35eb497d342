//! Collaborator capability interfaces.
//!
//! The research engine is written against these traits and assumes nothing
//! about how a collaborator computes its answers — rule-based, scripted,
//! and LLM-backed implementations are all substitutable.

use async_trait::async_trait;

use listscout_corpus::Taxonomy;
use listscout_shared::{ProjectIdea, ResearchPlan, Resource, Result};

/// Produces the research plan for a run: which categories to visit and
/// which search terms to use for each.
///
/// Planning failure is fatal to a run.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Build a plan from the taxonomy and its existing items.
    async fn plan(&self, taxonomy: &Taxonomy) -> Result<ResearchPlan>;
}

/// Executes one search query and returns candidate resources.
///
/// May return zero results, time out, or fail — all of which are
/// recoverable at the search-task layer.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Search for resources matching `term` within `category`.
    async fn search(&self, term: &str, category: &str) -> Result<Vec<Resource>>;
}

/// Generates project ideas for a category that yielded new resources.
///
/// An optional downstream consumer; failures are logged by the caller and
/// never abort a run.
#[async_trait]
pub trait IdeaWriter: Send + Sync {
    /// Generate ideas grounded in existing items and fresh finds.
    async fn generate_ideas(
        &self,
        category: &str,
        existing: &[Resource],
        fresh: &[Resource],
    ) -> Result<Vec<ProjectIdea>>;
}
