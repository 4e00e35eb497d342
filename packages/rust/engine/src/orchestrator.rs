//! End-to-end research run driver:
//! plan → schedule categories → fan out searches → dedupe → checkpoint.
//!
//! Planning failure is fatal and surfaces to the caller. Everything after
//! planning degrades: per-category and per-query failures are logged and
//! the run continues, the global deadline forces a final checkpoint rather
//! than an error, and a final artifact is always written — even on zero
//! yield.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument, warn};

use listscout_agents::{IdeaWriter, Planner, Searcher};
use listscout_corpus::Taxonomy;
use listscout_shared::{
    ListScoutError, ProjectIdea, Resource, Result, RunConfig, RunId, RunStats,
};

use crate::budget::RunBudget;
use crate::checkpoint::CheckpointStore;
use crate::dedup::DedupIndex;
use crate::fanout::FanoutExecutor;
use crate::scheduler::{CategoryScheduler, SchedulePolicy, Step, StopReason};
use crate::search::SearchTaskOptions;
use crate::stats;

// ---------------------------------------------------------------------------
// Phases & outcome
// ---------------------------------------------------------------------------

/// The run state machine. Loops through the middle states once per
/// category until a terminal state is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Planning,
    SchedulingCategory,
    FanningOut,
    Deduping,
    Checkpointing,
    Done,
    TimedOut,
}

impl RunPhase {
    /// Display label for progress reporting.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::SchedulingCategory => "scheduling category",
            Self::FanningOut => "fanning out",
            Self::Deduping => "deduping",
            Self::Checkpointing => "checkpointing",
            Self::Done => "done",
            Self::TimedOut => "timed out",
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Yield-driven run reached its target.
    TargetReached,
    /// Single-pass run visited every category.
    CategoriesExhausted,
    /// The global deadline arrived before either of the above.
    TimedOut,
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct RunReport {
    /// Run identifier; also names the checkpoint directory.
    pub run_id: RunId,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Accepted resources, in acceptance order.
    pub resources: Vec<Resource>,
    /// Generated project ideas.
    pub ideas: Vec<ProjectIdea>,
    /// Final per-category statistics (with seed baseline and growth).
    pub stats: RunStats,
    /// Categories fanned out.
    pub categories_visited: usize,
    /// Categories skipped for insufficient allotment.
    pub categories_skipped: usize,
    /// Full cycles completed (yield-driven mode).
    pub cycles: u64,
    /// Total wall-clock duration.
    pub elapsed: Duration,
    /// Path of the final results file, if the write succeeded.
    pub final_artifact: Option<PathBuf>,
    /// Directory holding all of the run's snapshots.
    pub checkpoint_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status.
pub trait RunProgress: Send + Sync {
    /// Called on every state transition.
    fn phase(&self, phase: RunPhase);
    /// Called when a category's round begins.
    fn category_started(&self, category: &str, visited: usize);
    /// Called when a category's round completes.
    fn round_finished(&self, category: &str, accepted_in_round: usize, total_accepted: usize);
    /// Called once with the final report.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl RunProgress for SilentProgress {
    fn phase(&self, _phase: RunPhase) {}
    fn category_started(&self, _category: &str, _visited: usize) {}
    fn round_finished(&self, _category: &str, _accepted: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The external collaborators a run is driven against.
pub struct Collaborators {
    /// Produces the research plan. Failure is fatal.
    pub planner: Arc<dyn Planner>,
    /// Executes search queries.
    pub searcher: Arc<dyn Searcher>,
    /// Optional downstream idea generation.
    pub idea_writer: Option<Arc<dyn IdeaWriter>>,
}

// ---------------------------------------------------------------------------
// ResearchOrchestrator
// ---------------------------------------------------------------------------

/// Composes budget, scheduler, fan-out, dedup, and checkpointing into a
/// complete research run.
pub struct ResearchOrchestrator {
    config: RunConfig,
    collaborators: Collaborators,
}

impl ResearchOrchestrator {
    /// Create an orchestrator for the given configuration and collaborators.
    pub fn new(config: RunConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// Run research over the taxonomy to completion.
    #[instrument(skip_all, fields(target = ?self.config.target_yield))]
    pub async fn run(
        &self,
        taxonomy: &Taxonomy,
        progress: &dyn RunProgress,
    ) -> Result<RunReport> {
        let run_id = RunId::new();
        let started = std::time::Instant::now();

        info!(%run_id, "research run starting");

        // --- Planning (fatal on failure) ---
        progress.phase(RunPhase::Planning);
        let plan = self
            .collaborators
            .planner
            .plan(taxonomy)
            .await
            .map_err(|e| ListScoutError::Plan(e.to_string()))?;

        let mut categories: Vec<String> = Vec::new();
        for id in &plan.priority_categories {
            if taxonomy.category(id).is_some() {
                categories.push(id.clone());
            } else {
                warn!(category = %id, "plan names unknown category, dropping");
            }
        }
        if categories.is_empty() {
            return Err(ListScoutError::Plan(
                "plan names no categories present in the taxonomy".into(),
            ));
        }

        info!(
            categories = categories.len(),
            terms = plan.search_terms.values().map(Vec::len).sum::<usize>(),
            "research plan ready"
        );

        // --- Run machinery ---
        let budget = RunBudget::start(
            Duration::from_secs(self.config.global_timeout_secs),
            Duration::from_secs(self.config.category_timeout_secs),
        );

        let policy = match self.config.target_yield {
            Some(target) => SchedulePolicy::YieldDriven { target },
            None => SchedulePolicy::SinglePass,
        };
        let mut scheduler = CategoryScheduler::new(categories, policy);
        if self.config.randomize {
            scheduler = scheduler.with_shuffle(self.config.random_seed);
        }

        let index = DedupIndex::seed(taxonomy.seed_keys());
        let executor = FanoutExecutor::new(
            Arc::clone(&self.collaborators.searcher),
            SearchTaskOptions {
                attempt_timeout: Duration::from_secs(self.config.attempt_timeout_secs),
                max_attempts: self.config.max_attempts,
                retry_delay: Duration::from_secs(self.config.retry_delay_secs),
                extra_denylist: self.config.extra_denylist.clone(),
            },
        );

        let checkpoint_dir = self.config.output_root.join(format!("run-{run_id}"));
        let mut store = CheckpointStore::create(&checkpoint_dir, self.config.checkpoint_every)?
            .with_corpus_fingerprint(taxonomy.fingerprint());

        let mut resources: Vec<Resource> = Vec::new();
        let mut ideas: Vec<ProjectIdea> = Vec::new();
        let mut categories_visited = 0usize;
        let mut categories_skipped = 0usize;

        // --- Category loop ---
        let stop_reason = loop {
            progress.phase(RunPhase::SchedulingCategory);
            let category = match scheduler.next(resources.len(), &budget) {
                Step::Done(reason) => break reason,
                Step::Skip(category) => {
                    categories_skipped += 1;
                    warn!(%category, "skipping category, allotment below threshold");
                    continue;
                }
                Step::Round(category) => category,
            };

            categories_visited += 1;
            progress.category_started(&category, categories_visited);
            info!(
                %category,
                visited = categories_visited,
                accepted = resources.len(),
                remaining_secs = budget.remaining().as_secs(),
                "category round starting"
            );

            let terms = match plan.search_terms.get(&category) {
                Some(terms) if !terms.is_empty() => terms.clone(),
                _ => {
                    warn!(%category, "no planned terms, using fallbacks");
                    taxonomy.fallback_terms(&category)
                }
            };

            progress.phase(RunPhase::FanningOut);
            let round = executor
                .execute(&category, &terms, budget.category_budget(), &index)
                .await;

            progress.phase(RunPhase::Deduping);
            let accepted_in_round = round.accepted.len();

            if accepted_in_round > 0 && !budget.expired() {
                if let Some(writer) = &self.collaborators.idea_writer {
                    match writer
                        .generate_ideas(&category, taxonomy.items_for(&category), &round.accepted)
                        .await
                    {
                        Ok(mut fresh) => {
                            info!(%category, ideas = fresh.len(), "project ideas generated");
                            ideas.append(&mut fresh);
                        }
                        Err(e) => {
                            warn!(%category, error = %e, "idea generation failed, continuing");
                        }
                    }
                }
            }

            resources.extend(round.accepted);
            progress.round_finished(&category, accepted_in_round, resources.len());

            progress.phase(RunPhase::Checkpointing);
            if store.should_save(resources.len()) {
                let snapshot = stats::snapshot_stats(&resources, &ideas);
                if let Err(e) = store.save(&run_id, &resources, &ideas, snapshot, false) {
                    error!(error = %e, "checkpoint write failed, in-memory state remains authoritative");
                }
            }
        };

        // --- Final checkpoint, always ---
        progress.phase(RunPhase::Checkpointing);
        let final_stats = stats::final_stats(&resources, &ideas, &taxonomy.seed_counts());
        let final_artifact =
            match store.save(&run_id, &resources, &ideas, final_stats.clone(), true) {
                Ok(path) => Some(path),
                Err(e) => {
                    error!(error = %e, "final checkpoint write failed");
                    None
                }
            };

        let outcome = match stop_reason {
            StopReason::TargetReached => RunOutcome::TargetReached,
            StopReason::Exhausted => RunOutcome::CategoriesExhausted,
            StopReason::DeadlineReached => RunOutcome::TimedOut,
        };
        progress.phase(match outcome {
            RunOutcome::TimedOut => RunPhase::TimedOut,
            _ => RunPhase::Done,
        });

        let report = RunReport {
            run_id,
            outcome,
            resources,
            ideas,
            stats: final_stats,
            categories_visited,
            categories_skipped,
            cycles: scheduler.cycles(),
            elapsed: started.elapsed(),
            final_artifact,
            checkpoint_dir,
        };

        info!(
            run_id = %report.run_id,
            outcome = ?report.outcome,
            accepted = report.resources.len(),
            ideas = report.ideas.len(),
            visited = report.categories_visited,
            skipped = report.categories_skipped,
            elapsed_ms = report.elapsed.as_millis(),
            "research run finished"
        );
        progress.done(&report);

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use listscout_agents::{ScriptedIdeaWriter, ScriptedSearcher};
    use listscout_shared::{CheckpointFile, ResearchPlan};
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_taxonomy() -> Taxonomy {
        let fixture =
            std::fs::read_to_string("../../../fixtures/json/contents.fixture.json")
                .expect("read corpus fixture");
        listscout_corpus::parse_contents(&fixture).expect("parse fixture")
    }

    fn test_config(output_root: PathBuf) -> RunConfig {
        RunConfig {
            output_root,
            global_timeout_secs: 300,
            category_timeout_secs: 60,
            target_yield: None,
            checkpoint_every: 1,
            randomize: false,
            random_seed: None,
            attempt_timeout_secs: 5,
            max_attempts: 1,
            retry_delay_secs: 0,
            extra_denylist: Vec::new(),
        }
    }

    fn temp_root(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ls-orch-{tag}-{}", RunId::new()))
    }

    struct FixedPlanner(ResearchPlan);

    #[async_trait]
    impl Planner for FixedPlanner {
        async fn plan(&self, _taxonomy: &Taxonomy) -> Result<ResearchPlan> {
            Ok(self.0.clone())
        }
    }

    struct FailingPlanner;

    #[async_trait]
    impl Planner for FailingPlanner {
        async fn plan(&self, _taxonomy: &Taxonomy) -> Result<ResearchPlan> {
            Err(ListScoutError::Agent("model unavailable".into()))
        }
    }

    fn plan(entries: &[(&str, &[&str])]) -> ResearchPlan {
        let mut search_terms = BTreeMap::new();
        let mut priority_categories = Vec::new();
        for (category, terms) in entries {
            priority_categories.push(category.to_string());
            search_terms.insert(
                category.to_string(),
                terms.iter().map(|t| t.to_string()).collect(),
            );
        }
        ResearchPlan {
            priority_categories,
            search_terms,
        }
    }

    fn resource(title: &str, url: &str) -> Resource {
        Resource {
            title: title.into(),
            url: url.into(),
            description: "desc".into(),
            category: String::new(),
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn single_pass_run_accepts_dedupes_and_checkpoints() {
        let root = temp_root("single-pass");
        let searcher = ScriptedSearcher::default()
            .with_results(
                "enc-term",
                vec![
                    resource("rav1e", "https://github.com/xiph/rav1e"),
                    // Case-variant duplicate of the seeded FFmpeg entry.
                    resource("FFmpeg again", "https://FFmpeg.org/"),
                ],
            )
            .with_results(
                "play-term",
                vec![resource("mpv", "https://mpv.io/installation")],
            );

        let orchestrator = ResearchOrchestrator::new(
            test_config(root.clone()),
            Collaborators {
                planner: Arc::new(FixedPlanner(plan(&[
                    ("encoding", &["enc-term"]),
                    ("players", &["play-term"]),
                ]))),
                searcher: Arc::new(searcher),
                idea_writer: Some(Arc::new(ScriptedIdeaWriter)),
            },
        );

        let report = orchestrator
            .run(&test_taxonomy(), &SilentProgress)
            .await
            .expect("run succeeds");

        assert_eq!(report.outcome, RunOutcome::CategoriesExhausted);
        assert_eq!(report.resources.len(), 2);
        assert_eq!(report.ideas.len(), 2);
        assert_eq!(report.categories_visited, 2);
        assert_eq!(report.stats.resources_by_category["encoding"], 1);
        // 1 accepted vs 2 seeded encoding items.
        assert_eq!(report.stats.growth_pct_by_category["encoding"], 50.0);

        // Final artifact reads back with the exact reported count.
        let artifact = report.final_artifact.as_ref().expect("final artifact");
        let parsed: CheckpointFile =
            serde_json::from_str(&std::fs::read_to_string(artifact).expect("read"))
                .expect("parse");
        assert!(parsed.is_final);
        assert_eq!(parsed.new_resources.len(), report.resources.len());
        assert_eq!(parsed.corpus_fingerprint.as_deref(), Some(test_taxonomy().fingerprint()));

        // checkpoint_every = 1 also produced intermediate snapshots.
        let snapshots: Vec<_> = std::fs::read_dir(&report.checkpoint_dir)
            .expect("list checkpoint dir")
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with("checkpoint-")
            })
            .collect();
        assert!(!snapshots.is_empty());

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn planner_failure_is_fatal() {
        let root = temp_root("plan-fail");
        let orchestrator = ResearchOrchestrator::new(
            test_config(root.clone()),
            Collaborators {
                planner: Arc::new(FailingPlanner),
                searcher: Arc::new(ScriptedSearcher::default()),
                idea_writer: None,
            },
        );

        let err = orchestrator
            .run(&test_taxonomy(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ListScoutError::Plan(_)));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn plan_with_only_unknown_categories_is_fatal() {
        let root = temp_root("plan-unknown");
        let orchestrator = ResearchOrchestrator::new(
            test_config(root.clone()),
            Collaborators {
                planner: Arc::new(FixedPlanner(plan(&[("nonexistent", &["term"])]))),
                searcher: Arc::new(ScriptedSearcher::default()),
                idea_writer: None,
            },
        );

        let err = orchestrator
            .run(&test_taxonomy(), &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ListScoutError::Plan(_)));

        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn exhausted_global_budget_still_writes_final_artifact() {
        let root = temp_root("timed-out");
        let mut config = test_config(root.clone());
        config.global_timeout_secs = 0;

        let orchestrator = ResearchOrchestrator::new(
            config,
            Collaborators {
                planner: Arc::new(FixedPlanner(plan(&[("encoding", &["enc-term"])]))),
                searcher: Arc::new(ScriptedSearcher::default()),
                idea_writer: None,
            },
        );

        let report = orchestrator
            .run(&test_taxonomy(), &SilentProgress)
            .await
            .expect("run degrades gracefully");

        assert_eq!(report.outcome, RunOutcome::TimedOut);
        assert_eq!(report.categories_visited, 0);
        assert!(report.resources.is_empty());

        let artifact = report.final_artifact.as_ref().expect("final artifact");
        let parsed: CheckpointFile =
            serde_json::from_str(&std::fs::read_to_string(artifact).expect("read"))
                .expect("parse");
        assert!(parsed.is_final);
        assert_eq!(parsed.stats.resources_count, 0);

        let _ = std::fs::remove_dir_all(&root);
    }

    /// Returns one never-before-seen resource per call.
    struct CountingSearcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Searcher for CountingSearcher {
        async fn search(&self, _term: &str, _category: &str) -> Result<Vec<Resource>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![resource(
                &format!("find-{n}"),
                &format!("https://finds.example/{n}"),
            )])
        }
    }

    #[tokio::test]
    async fn yield_driven_run_cycles_until_target() {
        let root = temp_root("yield");
        let mut config = test_config(root.clone());
        config.target_yield = Some(3);

        let orchestrator = ResearchOrchestrator::new(
            config,
            Collaborators {
                planner: Arc::new(FixedPlanner(plan(&[
                    ("encoding", &["t1"]),
                    ("players", &["t2"]),
                ]))),
                searcher: Arc::new(CountingSearcher {
                    calls: AtomicUsize::new(0),
                }),
                idea_writer: None,
            },
        );

        let report = orchestrator
            .run(&test_taxonomy(), &SilentProgress)
            .await
            .expect("run succeeds");

        // Two categories yield one each per cycle; reaching 3 requires
        // wrapping around for a second cycle.
        assert_eq!(report.outcome, RunOutcome::TargetReached);
        assert_eq!(report.resources.len(), 3);
        assert_eq!(report.categories_visited, 3);
        assert_eq!(report.cycles, 1);

        let _ = std::fs::remove_dir_all(&root);
    }
}
