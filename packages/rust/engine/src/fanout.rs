//! Fan-out execution of one category's search round.
//!
//! Launches every planned query for the category as a concurrent task on
//! the runtime, waits until all finish or the round's aggregate allotment
//! expires, and filters the collected candidates through the dedup index
//! in completion order. A failed or timed-out query never poisons its
//! siblings — the round returns whatever the rest produced.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use listscout_agents::Searcher;
use listscout_shared::{Resource, SearchQuery};

use crate::dedup::DedupIndex;
use crate::search::{SearchOutcome, SearchTaskOptions, run_search_task};

// ---------------------------------------------------------------------------
// RoundOutcome
// ---------------------------------------------------------------------------

/// Summary of a completed fan-out round for one category.
#[derive(Debug, Default)]
pub struct RoundOutcome {
    /// Deduplicated, validated resources accepted this round.
    pub accepted: Vec<Resource>,
    /// Raw candidates collected before dedup filtering.
    pub raw_count: usize,
    /// Candidates rejected as duplicates (corpus or same-run).
    pub duplicate_count: usize,
    /// Candidates dropped for malformed shape.
    pub dropped_invalid: usize,
    /// Candidates dropped for matching the search-page denylist.
    pub dropped_denylisted: usize,
    /// Tasks still outstanding when the round allotment expired.
    pub cancelled_tasks: usize,
    /// Tasks that panicked or were otherwise lost.
    pub failed_tasks: usize,
    /// Wall-clock duration of the round.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// FanoutExecutor
// ---------------------------------------------------------------------------

/// Runs one category's queries concurrently under an aggregate time budget.
pub struct FanoutExecutor {
    searcher: Arc<dyn Searcher>,
    opts: SearchTaskOptions,
}

impl FanoutExecutor {
    /// Create an executor over the given search collaborator.
    pub fn new(searcher: Arc<dyn Searcher>, opts: SearchTaskOptions) -> Self {
        Self { searcher, opts }
    }

    /// Execute a round: one search task per term, all concurrent, bounded
    /// by `allotment`. Outstanding tasks at expiry are cancelled and
    /// treated as empty results, not errors.
    #[instrument(skip_all, fields(category = %category, terms = terms.len()))]
    pub async fn execute(
        &self,
        category: &str,
        terms: &[String],
        allotment: Duration,
        index: &DedupIndex,
    ) -> RoundOutcome {
        let started = std::time::Instant::now();
        let deadline = tokio::time::Instant::now() + allotment;
        let mut outcome = RoundOutcome::default();

        let mut tasks: JoinSet<SearchOutcome> = JoinSet::new();
        for term in terms {
            let searcher = Arc::clone(&self.searcher);
            let opts = self.opts.clone();
            let query = SearchQuery::new(category, term.clone());
            tasks.spawn(async move { run_search_task(searcher, query, &opts).await });
        }

        info!(
            allotment_secs = allotment.as_secs(),
            "fan-out round started"
        );

        // Collect in completion order; the dedup index claims one key per
        // accepted item, so whichever task finishes first wins a contested
        // identity.
        loop {
            let joined = match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(joined)) => joined,
                Ok(None) => break, // all tasks finished
                Err(_) => {
                    outcome.cancelled_tasks = tasks.len();
                    warn!(
                        cancelled = outcome.cancelled_tasks,
                        "round allotment expired, cancelling outstanding tasks"
                    );
                    tasks.abort_all();
                    break;
                }
            };

            let task_outcome = match joined {
                Ok(task_outcome) => task_outcome,
                Err(e) => {
                    // A lost task yields nothing; siblings are unaffected.
                    warn!(error = %e, "search task failed to join");
                    outcome.failed_tasks += 1;
                    continue;
                }
            };

            outcome.raw_count += task_outcome.resources.len();
            outcome.dropped_invalid += task_outcome.dropped_invalid;
            outcome.dropped_denylisted += task_outcome.dropped_denylisted;

            for resource in task_outcome.resources {
                if index.try_insert(&resource).await {
                    outcome.accepted.push(resource);
                } else {
                    debug!(title = %resource.title, url = %resource.url, "duplicate rejected");
                    outcome.duplicate_count += 1;
                }
            }
        }

        outcome.elapsed = started.elapsed();

        info!(
            accepted = outcome.accepted.len(),
            raw = outcome.raw_count,
            duplicates = outcome.duplicate_count,
            cancelled = outcome.cancelled_tasks,
            elapsed_ms = outcome.elapsed.as_millis(),
            "fan-out round finished"
        );

        outcome
    }
}
