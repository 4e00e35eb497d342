//! Core domain types for ListScout research runs.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current schema version for the checkpoint file format.
pub const CHECKPOINT_SCHEMA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for research run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// A single node in the category forest of the curated catalog.
///
/// Categories have at most one parent; the corpus loader rejects unknown
/// parents and cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique category identifier.
    pub id: String,
    /// Display title.
    pub title: String,
    /// Parent category identifier, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Related category identifiers (advisory, used for search-term context).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
    /// Child category identifiers, derived by the loader.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
}

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// A catalog entry: an external resource with a homepage URL.
///
/// Identity for deduplication is the normalized URL, falling back to the
/// normalized title when the URL is empty — see [`Resource::identity_key`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    /// Display title.
    pub title: String,
    /// Homepage URL. Legacy corpus files use the `homepage` key.
    #[serde(alias = "homepage")]
    pub url: String,
    /// Free-text description, possibly empty.
    #[serde(default)]
    pub description: String,
    /// Owning category identifier.
    #[serde(default)]
    pub category: String,
    /// Tag list, possibly empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Resource {
    /// The normalized identity key used for deduplication.
    ///
    /// Lowercased and trimmed URL; falls back to the lowercased and trimmed
    /// title when the URL is empty. Two resources with the same key are the
    /// same entry regardless of description or category differences.
    pub fn identity_key(&self) -> String {
        let url = self.url.trim();
        if !url.is_empty() {
            url.to_lowercase()
        } else {
            self.title.trim().to_lowercase()
        }
    }
}

// ---------------------------------------------------------------------------
// ProjectIdea
// ---------------------------------------------------------------------------

/// A generated project idea, produced for categories that yielded new
/// resources during a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectIdea {
    /// Display title.
    pub title: String,
    /// Concept description.
    pub description: String,
    /// Owning category identifier.
    pub category: String,
    /// Tag list, possibly empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// SearchQuery
// ---------------------------------------------------------------------------

/// One (query, category) unit of search work, with retry bookkeeping.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Owning category identifier.
    pub category: String,
    /// Query text sent to the search collaborator.
    pub term: String,
    /// Attempts made so far.
    pub attempt: u32,
    /// Error message from the most recent failed attempt, if any.
    pub last_error: Option<String>,
}

impl SearchQuery {
    /// Create a fresh query with no attempts recorded.
    pub fn new(category: impl Into<String>, term: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            term: term.into(),
            attempt: 0,
            last_error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ResearchPlan
// ---------------------------------------------------------------------------

/// Output of the planner collaborator: which categories to visit, in what
/// order, and which search terms to use for each.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchPlan {
    /// Categories to research, in priority order.
    #[serde(default)]
    pub priority_categories: Vec<String>,
    /// Search terms keyed by category identifier.
    #[serde(default)]
    pub search_terms: BTreeMap<String, Vec<String>>,
}

impl ResearchPlan {
    /// True when the plan names no categories at all.
    pub fn is_empty(&self) -> bool {
        self.priority_categories.is_empty()
    }
}

// ---------------------------------------------------------------------------
// RunStats
// ---------------------------------------------------------------------------

/// Per-category statistics embedded in checkpoints.
///
/// Seed baseline and growth percentages are populated only on the final
/// checkpoint of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStats {
    /// Total newly accepted resources.
    pub resources_count: usize,
    /// Total generated project ideas.
    pub ideas_count: usize,
    /// Accepted resource counts keyed by category.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resources_by_category: BTreeMap<String, usize>,
    /// Idea counts keyed by category.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ideas_by_category: BTreeMap<String, usize>,
    /// Seed corpus item counts keyed by category (final checkpoint only).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub seed_by_category: BTreeMap<String, usize>,
    /// Growth vs the seed corpus, percent, keyed by category
    /// (final checkpoint only).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub growth_pct_by_category: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// CheckpointFile
// ---------------------------------------------------------------------------

/// The on-disk checkpoint shape: an immutable snapshot of accumulated
/// findings at a point in a run. Never mutated after being written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointFile {
    /// Schema version for forward compatibility.
    pub schema_version: u32,
    /// The run that produced this snapshot.
    pub run_id: RunId,
    /// Monotonically increasing sequence number within the run.
    pub sequence: u64,
    /// When the snapshot was written.
    pub timestamp: DateTime<Utc>,
    /// Whether this is the final checkpoint of the run.
    pub is_final: bool,
    /// SHA-256 fingerprint of the seed corpus, for provenance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corpus_fingerprint: Option<String>,
    /// Newly accepted resources, in acceptance order.
    pub new_resources: Vec<Resource>,
    /// Generated project ideas.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub new_project_ideas: Vec<ProjectIdea>,
    /// Run statistics at snapshot time.
    pub stats: RunStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn identity_key_prefers_url() {
        let resource = Resource {
            title: "FFmpeg".into(),
            url: "  https://FFmpeg.org/ ".into(),
            description: String::new(),
            category: "encoding".into(),
            tags: vec![],
        };
        assert_eq!(resource.identity_key(), "https://ffmpeg.org/");
    }

    #[test]
    fn identity_key_falls_back_to_title() {
        let resource = Resource {
            title: "  Video Codec Primer ".into(),
            url: String::new(),
            description: String::new(),
            category: "learning".into(),
            tags: vec![],
        };
        assert_eq!(resource.identity_key(), "video codec primer");
    }

    #[test]
    fn resource_accepts_homepage_alias() {
        let json = r#"{"title":"x264","homepage":"https://www.videolan.org/developers/x264.html","description":"H.264 encoder"}"#;
        let resource: Resource = serde_json::from_str(json).expect("deserialize");
        assert_eq!(resource.url, "https://www.videolan.org/developers/x264.html");
        assert!(resource.category.is_empty());
        assert!(resource.tags.is_empty());
    }

    #[test]
    fn plan_deserializes_with_missing_fields() {
        let json = r#"{"priority_categories":["encoding"]}"#;
        let plan: ResearchPlan = serde_json::from_str(json).expect("deserialize");
        assert_eq!(plan.priority_categories, vec!["encoding"]);
        assert!(plan.search_terms.is_empty());
        assert!(!plan.is_empty());
    }

    #[test]
    fn checkpoint_serialization_roundtrip() {
        let checkpoint = CheckpointFile {
            schema_version: CHECKPOINT_SCHEMA_VERSION,
            run_id: RunId::new(),
            sequence: 3,
            timestamp: Utc::now(),
            is_final: false,
            corpus_fingerprint: Some("deadbeef".into()),
            new_resources: vec![Resource {
                title: "GPAC".into(),
                url: "https://gpac.io".into(),
                description: "Multimedia framework".into(),
                category: "packaging".into(),
                tags: vec!["mp4".into()],
            }],
            new_project_ideas: vec![],
            stats: RunStats {
                resources_count: 1,
                ..Default::default()
            },
        };

        let json = serde_json::to_string_pretty(&checkpoint).expect("serialize");
        let parsed: CheckpointFile = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.sequence, 3);
        assert_eq!(parsed.new_resources.len(), 1);
        assert_eq!(parsed.stats.resources_count, 1);
    }

    #[test]
    fn plan_fixture_validates() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/plan.fixture.json")
            .expect("read fixture");
        let parsed: ResearchPlan =
            serde_json::from_str(&fixture).expect("deserialize fixture plan");
        assert_eq!(parsed.priority_categories.len(), 2);
        assert!(parsed.search_terms.contains_key("encoding"));
    }
}
