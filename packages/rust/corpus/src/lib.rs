//! Corpus source loading for ListScout.
//!
//! A corpus is the existing curated catalog: a category forest plus the
//! items already accepted into each category. It is loaded once at run
//! start — from a local JSON file or a remote URL — and is read-only to the
//! research engine. Failure to load is fatal for a run.

mod taxonomy;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use listscout_shared::{Category, ListScoutError, Resource, Result};

pub use taxonomy::{CorpusStats, Taxonomy, corpus_stats};

/// Default timeout in seconds for fetching a remote corpus.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum remote corpus size we consider valid (50 MB).
const MAX_RESPONSE_SIZE: u64 = 50 * 1024 * 1024;

/// User-Agent string for corpus requests.
const USER_AGENT: &str = concat!("ListScout/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Load options
// ---------------------------------------------------------------------------

/// Configuration for corpus loading.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

/// Load and validate a corpus from a local path or a remote URL.
#[instrument(skip_all, fields(source = %source))]
pub async fn load_corpus(source: &str, opts: &LoadOptions) -> Result<Taxonomy> {
    let raw = if source.starts_with("http://") || source.starts_with("https://") {
        fetch_remote(source, opts).await?
    } else {
        let path = Path::new(source);
        std::fs::read_to_string(path).map_err(|e| ListScoutError::io(path, e))?
    };

    let taxonomy = parse_contents(&raw)?;

    info!(
        categories = taxonomy.category_ids().len(),
        items = taxonomy.total_items(),
        "corpus loaded"
    );

    Ok(taxonomy)
}

/// Fetch a remote corpus document.
async fn fetch_remote(url: &str, opts: &LoadOptions) -> Result<String> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| ListScoutError::Network(format!("failed to build HTTP client: {e}")))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ListScoutError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ListScoutError::Network(format!("{url}: HTTP {status}")));
    }

    if let Some(len) = response.content_length() {
        if len > MAX_RESPONSE_SIZE {
            return Err(ListScoutError::validation(format!(
                "{url}: response too large ({len} bytes, max {MAX_RESPONSE_SIZE})"
            )));
        }
    }

    response
        .text()
        .await
        .map_err(|e| ListScoutError::Network(format!("{url}: failed to read body: {e}")))
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// An item as it appears in the corpus file: a resource plus an optional
/// multi-category assignment.
#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(flatten)]
    resource: Resource,
    /// Multi-category assignment used by some corpus variants.
    #[serde(default)]
    categories: Vec<String>,
}

/// The corpus file shape. Items live either under `projects` or, in the
/// flat legacy variant, under a top-level key per category identifier.
#[derive(Debug, Deserialize)]
struct RawContents {
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    projects: Vec<RawItem>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_json::Value>,
}

/// Parse corpus JSON into a validated [`Taxonomy`].
pub fn parse_contents(raw: &str) -> Result<Taxonomy> {
    let fingerprint = {
        let mut hasher = Sha256::new();
        hasher.update(raw.as_bytes());
        format!("{:x}", hasher.finalize())
    };

    let contents: RawContents = serde_json::from_str(raw)
        .map_err(|e| ListScoutError::corpus(format!("invalid corpus JSON: {e}")))?;

    if contents.categories.is_empty() {
        return Err(ListScoutError::corpus("corpus defines no categories"));
    }

    let known: Vec<String> = contents.categories.iter().map(|c| c.id.clone()).collect();
    let mut items: BTreeMap<String, Vec<Resource>> = BTreeMap::new();

    // Preferred shape: a single `projects` array with per-item assignment.
    for item in contents.projects {
        let assigned: Vec<String> = if !item.categories.is_empty() {
            item.categories.clone()
        } else if !item.resource.category.is_empty() {
            vec![item.resource.category.clone()]
        } else {
            warn!(title = %item.resource.title, "item has no category, skipping");
            continue;
        };

        for category in assigned {
            if !known.contains(&category) {
                warn!(
                    title = %item.resource.title,
                    %category,
                    "item references unknown category, skipping"
                );
                continue;
            }
            let mut resource = item.resource.clone();
            resource.category = category.clone();
            items.entry(category).or_default().push(resource);
        }
    }

    // Flat legacy shape: items keyed by category identifier at the top level.
    if items.is_empty() {
        for id in &known {
            let Some(value) = contents.extra.get(id) else {
                continue;
            };
            let parsed: Vec<Resource> =
                serde_json::from_value(value.clone()).map_err(|e| {
                    ListScoutError::corpus(format!("invalid item list for category '{id}': {e}"))
                })?;
            let assigned: Vec<Resource> = parsed
                .into_iter()
                .map(|mut r| {
                    r.category = id.clone();
                    r
                })
                .collect();
            if !assigned.is_empty() {
                items.insert(id.clone(), assigned);
            }
        }
    }

    Taxonomy::build(contents.categories, items, fingerprint)
}
