//! The search task: one (query, category) unit of work.
//!
//! Wraps a call to the search collaborator with a hard per-attempt timeout,
//! bounded retries with a fixed delay, and candidate validation. Exhausted
//! retries degrade to an empty result set — a failed query is never fatal.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};
use url::Url;

use listscout_agents::Searcher;
use listscout_shared::{Resource, SearchQuery};

/// Minimum plausible URL length for a candidate.
const MIN_URL_LEN: usize = 12;

/// URL substrings that identify generic "search results page" links.
/// Candidates pointing at these are listings, not resources.
const SEARCH_PAGE_PATTERNS: &[&str] = &[
    "google.com/search",
    "youtube.com/results",
    "bing.com/search",
    "search?q=",
    "search_query=",
    "amazon.com/s?",
    "search-results",
    "searchresults",
    "search.html",
];

// ---------------------------------------------------------------------------
// Options & outcome
// ---------------------------------------------------------------------------

/// Retry and validation policy for search tasks.
#[derive(Debug, Clone)]
pub struct SearchTaskOptions {
    /// Hard timeout for a single collaborator call.
    pub attempt_timeout: Duration,
    /// Maximum attempts before degrading to an empty result.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
    /// Extra denylist substrings on top of the built-ins.
    pub extra_denylist: Vec<String>,
}

impl Default for SearchTaskOptions {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(60),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            extra_denylist: Vec::new(),
        }
    }
}

/// What one search task produced, including drop accounting.
#[derive(Debug, Default)]
pub struct SearchOutcome {
    /// Validated candidates. Empty when every attempt failed.
    pub resources: Vec<Resource>,
    /// Attempts actually made.
    pub attempts: u32,
    /// Candidates dropped for malformed shape (never retried).
    pub dropped_invalid: usize,
    /// Candidates dropped for matching the search-page denylist.
    pub dropped_denylisted: usize,
}

// ---------------------------------------------------------------------------
// Candidate validation
// ---------------------------------------------------------------------------

/// Whether a URL matches the denylist of search-results pages.
pub fn is_denylisted(url: &str, extra: &[String]) -> bool {
    let lower = url.to_lowercase();
    SEARCH_PAGE_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
        || extra.iter().any(|pattern| lower.contains(pattern))
}

/// Whether a candidate has a plausible shape: non-empty title, and an
/// http(s) URL with a dotted host, long enough to be real and not
/// truncated.
pub fn has_valid_shape(resource: &Resource) -> bool {
    if resource.title.trim().is_empty() {
        return false;
    }
    let raw = resource.url.trim();
    if raw.len() < MIN_URL_LEN || raw.ends_with('.') {
        return false;
    }
    match Url::parse(raw) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| host.contains('.'))
        }
        Err(_) => false,
    }
}

/// Validate raw candidates: drop malformed and denylisted entries, force
/// the owning category, and default an empty tag list to the category.
fn filter_candidates(
    raw: Vec<Resource>,
    category: &str,
    opts: &SearchTaskOptions,
) -> (Vec<Resource>, usize, usize) {
    let mut valid = Vec::with_capacity(raw.len());
    let mut invalid = 0usize;
    let mut denylisted = 0usize;

    for mut resource in raw {
        if !has_valid_shape(&resource) {
            debug!(title = %resource.title, url = %resource.url, "dropping malformed candidate");
            invalid += 1;
            continue;
        }
        if is_denylisted(&resource.url, &opts.extra_denylist) {
            debug!(url = %resource.url, "dropping search-page candidate");
            denylisted += 1;
            continue;
        }

        resource.category = category.to_string();
        if resource.tags.is_empty() {
            resource.tags = vec![category.to_string()];
        }
        valid.push(resource);
    }

    (valid, invalid, denylisted)
}

// ---------------------------------------------------------------------------
// Task execution
// ---------------------------------------------------------------------------

/// Run one search query to completion.
///
/// Attempts are retried on collaborator error, attempt timeout, or an
/// empty validated result; drop counters accumulate across attempts.
pub async fn run_search_task(
    searcher: Arc<dyn Searcher>,
    mut query: SearchQuery,
    opts: &SearchTaskOptions,
) -> SearchOutcome {
    let mut outcome = SearchOutcome::default();

    while query.attempt < opts.max_attempts {
        query.attempt += 1;
        outcome.attempts = query.attempt;

        let call = searcher.search(&query.term, &query.category);
        match tokio::time::timeout(opts.attempt_timeout, call).await {
            Ok(Ok(raw)) => {
                let (valid, invalid, denylisted) =
                    filter_candidates(raw, &query.category, opts);
                outcome.dropped_invalid += invalid;
                outcome.dropped_denylisted += denylisted;

                if !valid.is_empty() {
                    debug!(
                        term = %query.term,
                        category = %query.category,
                        found = valid.len(),
                        attempt = query.attempt,
                        "search task succeeded"
                    );
                    outcome.resources = valid;
                    return outcome;
                }
                query.last_error = Some("no valid candidates".into());
            }
            Ok(Err(e)) => {
                warn!(
                    term = %query.term,
                    attempt = query.attempt,
                    error = %e,
                    "search attempt failed"
                );
                query.last_error = Some(e.to_string());
            }
            Err(_) => {
                warn!(
                    term = %query.term,
                    attempt = query.attempt,
                    timeout_secs = opts.attempt_timeout.as_secs(),
                    "search attempt timed out"
                );
                query.last_error = Some("attempt timed out".into());
            }
        }

        if query.attempt < opts.max_attempts {
            tokio::time::sleep(opts.retry_delay).await;
        }
    }

    warn!(
        term = %query.term,
        category = %query.category,
        attempts = outcome.attempts,
        last_error = query.last_error.as_deref().unwrap_or("none"),
        "search task exhausted retries, yielding empty result"
    );
    outcome
}
