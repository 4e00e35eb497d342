//! Category scheduling: which category gets the next fan-out round.
//!
//! Two policies. Single-pass visits the planned categories once, in order.
//! Yield-driven keeps cycling (reshuffling each full cycle when shuffling
//! is on) until the cumulative unique-item yield target is reached or the
//! global deadline arrives.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info};

use crate::budget::RunBudget;

// ---------------------------------------------------------------------------
// Policy & step
// ---------------------------------------------------------------------------

/// How the scheduler decides when a run is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePolicy {
    /// Visit each category once, then stop.
    SinglePass,
    /// Cycle through categories until `target` unique items are accepted.
    YieldDriven { target: usize },
}

/// Why the scheduler stopped handing out rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Single-pass mode ran out of categories.
    Exhausted,
    /// Yield-driven mode reached its target.
    TargetReached,
    /// The global deadline arrived, or every remaining allotment is below
    /// the useful threshold.
    DeadlineReached,
}

/// The scheduler's decision for the next step of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Fan out for this category.
    Round(String),
    /// Skip this category: its allotment is below the useful threshold.
    Skip(String),
    /// Stop the run.
    Done(StopReason),
}

// ---------------------------------------------------------------------------
// CategoryScheduler
// ---------------------------------------------------------------------------

/// Orders categories and decides when to advance, repeat, or stop.
#[derive(Debug)]
pub struct CategoryScheduler {
    categories: Vec<String>,
    cursor: usize,
    policy: SchedulePolicy,
    rng: Option<StdRng>,
    cycles: u64,
    skipped_in_cycle: usize,
}

impl CategoryScheduler {
    /// Create a scheduler over the planned categories, in priority order.
    pub fn new(categories: Vec<String>, policy: SchedulePolicy) -> Self {
        Self {
            categories,
            cursor: 0,
            policy,
            rng: None,
            cycles: 0,
            skipped_in_cycle: 0,
        }
    }

    /// Shuffle the category order. With a seed the order is reproducible;
    /// without one, a fresh seed is drawn from the OS.
    pub fn with_shuffle(mut self, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.categories.shuffle(&mut rng);
        info!(seed = ?seed, order = ?self.categories, "randomized category order");
        self.rng = Some(rng);
        self
    }

    /// Completed full cycles through the category list.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Decide the next step given the run's yield so far and its budget.
    pub fn next(&mut self, accepted: usize, budget: &RunBudget) -> Step {
        if budget.expired() {
            return Step::Done(StopReason::DeadlineReached);
        }

        if let SchedulePolicy::YieldDriven { target } = self.policy {
            if accepted >= target {
                return Step::Done(StopReason::TargetReached);
            }
        }

        if self.categories.is_empty() {
            return Step::Done(StopReason::Exhausted);
        }

        if self.cursor >= self.categories.len() {
            match self.policy {
                SchedulePolicy::SinglePass => return Step::Done(StopReason::Exhausted),
                SchedulePolicy::YieldDriven { .. } => {
                    // A cycle where nothing could run means the remaining
                    // budget is no longer useful for any category.
                    if self.skipped_in_cycle == self.categories.len() {
                        return Step::Done(StopReason::DeadlineReached);
                    }
                    self.cursor = 0;
                    self.cycles += 1;
                    self.skipped_in_cycle = 0;
                    if let Some(rng) = self.rng.as_mut() {
                        self.categories.shuffle(rng);
                        debug!(cycle = self.cycles, order = ?self.categories, "reshuffled for new cycle");
                    }
                }
            }
        }

        let category = self.categories[self.cursor].clone();
        self.cursor += 1;

        let allotment = budget.category_budget();
        if RunBudget::should_skip(allotment) {
            self.skipped_in_cycle += 1;
            debug!(
                %category,
                allotment_secs = allotment.as_secs(),
                "allotment below threshold, skipping category"
            );
            return Step::Skip(category);
        }

        self.skipped_in_cycle = 0;
        Step::Round(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn roomy_budget() -> RunBudget {
        RunBudget::start(Duration::from_secs(3600), Duration::from_secs(300))
    }

    fn cats(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn single_pass_visits_each_once_then_exhausts() {
        let budget = roomy_budget();
        let mut scheduler =
            CategoryScheduler::new(cats(&["a", "b", "c"]), SchedulePolicy::SinglePass);

        assert_eq!(scheduler.next(0, &budget), Step::Round("a".into()));
        assert_eq!(scheduler.next(0, &budget), Step::Round("b".into()));
        assert_eq!(scheduler.next(1, &budget), Step::Round("c".into()));
        assert_eq!(scheduler.next(2, &budget), Step::Done(StopReason::Exhausted));
    }

    #[test]
    fn yield_driven_repeats_until_target() {
        // Target 5, two categories, each round yields 2: after one full
        // cycle only 4 are accepted, so the scheduler wraps around rather
        // than stopping.
        let budget = roomy_budget();
        let mut scheduler = CategoryScheduler::new(
            cats(&["a", "b"]),
            SchedulePolicy::YieldDriven { target: 5 },
        );

        assert_eq!(scheduler.next(0, &budget), Step::Round("a".into()));
        assert_eq!(scheduler.next(2, &budget), Step::Round("b".into()));
        assert_eq!(scheduler.next(4, &budget), Step::Round("a".into()));
        assert_eq!(scheduler.cycles(), 1);
        assert_eq!(
            scheduler.next(5, &budget),
            Step::Done(StopReason::TargetReached)
        );
    }

    #[test]
    fn yield_driven_stops_at_deadline() {
        let expired = RunBudget::start(Duration::ZERO, Duration::from_secs(300));
        let mut scheduler = CategoryScheduler::new(
            cats(&["a"]),
            SchedulePolicy::YieldDriven { target: 100 },
        );
        assert_eq!(
            scheduler.next(0, &expired),
            Step::Done(StopReason::DeadlineReached)
        );
    }

    #[test]
    fn skips_when_allotment_below_threshold() {
        // 20s of global budget left: below the 30s useful threshold.
        let tight = RunBudget::start(Duration::from_secs(20), Duration::from_secs(300));
        let mut scheduler =
            CategoryScheduler::new(cats(&["a", "b"]), SchedulePolicy::SinglePass);

        assert_eq!(scheduler.next(0, &tight), Step::Skip("a".into()));
        assert_eq!(scheduler.next(0, &tight), Step::Skip("b".into()));
        assert_eq!(scheduler.next(0, &tight), Step::Done(StopReason::Exhausted));
    }

    #[test]
    fn yield_driven_ends_after_fully_skipped_cycle() {
        let tight = RunBudget::start(Duration::from_secs(20), Duration::from_secs(300));
        let mut scheduler = CategoryScheduler::new(
            cats(&["a", "b"]),
            SchedulePolicy::YieldDriven { target: 10 },
        );

        assert_eq!(scheduler.next(0, &tight), Step::Skip("a".into()));
        assert_eq!(scheduler.next(0, &tight), Step::Skip("b".into()));
        assert_eq!(
            scheduler.next(0, &tight),
            Step::Done(StopReason::DeadlineReached)
        );
    }

    #[test]
    fn seeded_shuffle_is_reproducible() {
        let names = cats(&["a", "b", "c", "d", "e", "f"]);
        let order_of = |seed: u64| {
            let budget = roomy_budget();
            let mut scheduler =
                CategoryScheduler::new(names.clone(), SchedulePolicy::SinglePass)
                    .with_shuffle(Some(seed));
            let mut order = Vec::new();
            while let Step::Round(c) = scheduler.next(0, &budget) {
                order.push(c);
            }
            order
        };

        assert_eq!(order_of(42), order_of(42));
        assert_eq!(order_of(42).len(), 6);
    }

    #[test]
    fn empty_category_list_is_exhausted_immediately() {
        let budget = roomy_budget();
        let mut scheduler = CategoryScheduler::new(
            vec![],
            SchedulePolicy::YieldDriven { target: 10 },
        );
        assert_eq!(scheduler.next(0, &budget), Step::Done(StopReason::Exhausted));
    }
}
