//! Branch-and-bound search for the cheapest assignment of matchings.
//!
//! Common contigs are fixed one per level, cheapest branching factor first.
//! The assignment under construction is a stack holding exactly the matchings
//! of the levels above the current one. Because the cost of a prefix is
//! recomputed over the whole prefix it never decreases as the prefix grows,
//! so a branch whose cost already reaches the best complete cost is dropped.

use std::time::Instant;

use indicatif::ProgressBar;
use log::{debug, info, trace, warn};
use thiserror::Error;

use crate::cost::{CostEvaluator, SplitCosts};
use crate::matching::{matching_count, matchings, Matching};
use crate::types::{ContigId, Registry};

/// How often the progress bar is refreshed, in evaluated assignments.
const PROGRESS_INTERVAL: u64 = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error(
        "Maximum number of evaluated assignments reached ({max_calls}). \
         Raise --max-calls or increase --min-len to reduce the number of shared contigs"
    )]
    BudgetExceeded { max_calls: u64 },
}

/// Best complete assignment found by the search.
#[derive(Clone, Debug)]
pub struct SearchOutcome {
    pub costs: SplitCosts,
    /// Cuts plus joins, or the a-priori upper bound when no complete
    /// assignment fell under it.
    pub total_cost: f64,
    /// Matching per common contig, in search order.
    pub assignment: Vec<(ContigId, Matching)>,
    /// Number of evaluated assignments.
    pub calls: u64,
}

#[derive(Clone, Debug)]
struct Best {
    costs: SplitCosts,
    assignment: Vec<(ContigId, Matching)>,
}

pub struct BranchAndBound<'a> {
    registry: &'a Registry,
    evaluator: CostEvaluator<'a>,
    order: Vec<ContigId>,
    max_calls: u64,
    upper_bound: f64,
    calls: u64,
    current: Vec<(ContigId, Matching)>,
    best: Option<Best>,
    progress: ProgressBar,
}

impl<'a> BranchAndBound<'a> {
    pub fn new(registry: &'a Registry, exponent: f64, max_calls: u64) -> Self {
        let mut order = registry.common_contigs();
        order.sort_by_key(|&id| {
            let c = registry.contig(id);
            matching_count(c.left_copies.len(), c.right_copies.len())
        });

        Self {
            registry,
            evaluator: CostEvaluator::new(registry, exponent),
            order,
            max_calls,
            upper_bound: upper_bound(registry),
            calls: 0,
            current: Vec::new(),
            best: None,
            progress: ProgressBar::hidden(),
        }
    }

    /// Reports the number of evaluated assignments on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Common contigs in the order they are fixed.
    pub fn order(&self) -> &[ContigId] {
        &self.order
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    /// Product of the per-contig matching counts, i.e. the size of the
    /// unpruned search space. Approximate once it exceeds `f64` precision.
    pub fn search_space(&self) -> f64 {
        self.order
            .iter()
            .map(|&id| {
                let c = self.registry.contig(id);
                matching_count(c.left_copies.len(), c.right_copies.len()) as f64
            })
            .product()
    }

    pub fn run(mut self) -> Result<SearchOutcome, SearchError> {
        info!("Common contigs: {}", self.order.len());
        info!("Maximum possible matchings: {:.0}", self.search_space());

        let start = Instant::now();
        let result = self.descend(0, SplitCosts::default());
        self.progress.set_position(self.calls);
        info!("Time taken: {:.3}s", start.elapsed().as_secs_f64());
        info!("Evaluated assignments: {}", self.calls);
        result?;

        let outcome = match self.best {
            Some(best) => SearchOutcome {
                total_cost: best.costs.total(),
                costs: best.costs,
                assignment: best.assignment,
                calls: self.calls,
            },
            None => {
                warn!(
                    "No complete assignment under the upper bound {}; reporting the bound",
                    self.upper_bound
                );
                SearchOutcome {
                    costs: SplitCosts::default(),
                    total_cost: self.upper_bound,
                    assignment: Vec::new(),
                    calls: self.calls,
                }
            }
        };
        Ok(outcome)
    }

    fn admits(&self, cost: f64) -> bool {
        match &self.best {
            Some(best) => cost < best.costs.total(),
            None => cost <= self.upper_bound,
        }
    }

    fn descend(&mut self, level: usize, costs: SplitCosts) -> Result<(), SearchError> {
        let Some(&contig) = self.order.get(level) else {
            trace!("Complete assignment with cost {}", costs.total());
            self.best = Some(Best {
                costs,
                assignment: self.current.clone(),
            });
            return Ok(());
        };

        let entry = self.registry.contig(contig);
        let (m, n) = (entry.left_copies.len(), entry.right_copies.len());
        debug!(
            "Level {}: {} matchings for {}",
            level,
            matching_count(m, n),
            entry.name
        );

        for matching in matchings(m, n) {
            self.current.push((contig, matching));
            self.calls += 1;
            if self.calls > self.max_calls {
                return Err(SearchError::BudgetExceeded {
                    max_calls: self.max_calls,
                });
            }
            if self.calls % PROGRESS_INTERVAL == 0 {
                self.progress.set_position(self.calls);
            }

            let costs = self.evaluator.evaluate(&self.current);
            trace!(
                "Level {}: cuts {} joins {}",
                level,
                costs.cuts,
                costs.joins
            );
            if self.admits(costs.total()) {
                self.descend(level + 1, costs)?;
            }
            self.current.pop();
        }
        Ok(())
    }
}

/// `Σ (copies_L + copies_R) * length` over all contigs.
pub fn upper_bound(registry: &Registry) -> f64 {
    registry
        .contigs()
        .map(|(_, c)| (c.left_copies.len() + c.right_copies.len()) as f64 * c.length as f64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;
    use itertools::Itertools;

    fn registry(left: &[(&str, &str, u64)], right: &[(&str, &str, u64)]) -> Registry {
        let mut registry = Registry::new();
        for (bin, contig, len) in left {
            registry.add_copy(Side::Left, bin, contig, *len);
        }
        for (bin, contig, len) in right {
            registry.add_copy(Side::Right, bin, contig, *len);
        }
        registry
    }

    /// Minimum cost over every combination of matchings.
    fn exhaustive_minimum(registry: &Registry, exponent: f64) -> f64 {
        let evaluator = CostEvaluator::new(registry, exponent);
        let common = registry.common_contigs();
        common
            .iter()
            .map(|&id| {
                let c = registry.contig(id);
                matchings(c.left_copies.len(), c.right_copies.len())
                    .map(|m| (id, m))
                    .collect::<Vec<_>>()
            })
            .multi_cartesian_product()
            .map(|assignment| evaluator.evaluate(&assignment).total())
            .fold(f64::INFINITY, f64::min)
    }

    fn scenario() -> Registry {
        registry(
            &[("L1", "A", 100), ("L1", "B", 50), ("L2", "A", 100)],
            &[("R1", "A", 100), ("R1", "B", 50)],
        )
    }

    #[test]
    fn test_orders_by_matching_count() {
        let reg = scenario();
        let search = BranchAndBound::new(&reg, 0.5, 1000);
        let names: Vec<_> = search
            .order()
            .iter()
            .map(|&id| reg.contig(id).name.as_str())
            .collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(search.search_space(), 2.0);
        assert_eq!(search.upper_bound(), 400.0);
    }

    #[test]
    fn test_scenario_picks_cheaper_matching() {
        let reg = scenario();
        let outcome = BranchAndBound::new(&reg, 0.5, 1000).run().unwrap();
        // B, then both matchings of A; the second is pruned
        assert_eq!(outcome.calls, 3);
        assert_eq!(outcome.total_cost, 0.0);

        let a = reg.contig_id("A").unwrap();
        let (_, matching) = outcome
            .assignment
            .iter()
            .find(|(id, _)| *id == a)
            .unwrap();
        let left_bin = reg.contig(a).left_copies[matching.left[0]].bin;
        assert_eq!(reg.left_bins.name(left_bin), Some("L1"));
    }

    #[test]
    fn test_budget_exceeded_is_fatal() {
        let reg = scenario();
        let err = BranchAndBound::new(&reg, 0.5, 2).run().unwrap_err();
        assert_eq!(err, SearchError::BudgetExceeded { max_calls: 2 });
        assert!(err.to_string().contains("--max-calls"));
    }

    #[test]
    fn test_larger_budget_never_worse() {
        let reg = registry(
            &[
                ("P1", "a", 30),
                ("P1", "b", 20),
                ("P2", "a", 30),
                ("P2", "c", 10),
                ("P3", "b", 20),
            ],
            &[
                ("Q1", "a", 30),
                ("Q1", "c", 10),
                ("Q2", "a", 30),
                ("Q2", "b", 20),
                ("Q3", "b", 20),
            ],
        );
        let full = BranchAndBound::new(&reg, 0.5, 1_000_000).run().unwrap();
        let needed = full.calls;
        assert!(BranchAndBound::new(&reg, 0.5, needed).run().is_ok());
        assert!(matches!(
            BranchAndBound::new(&reg, 0.5, needed - 1).run(),
            Err(SearchError::BudgetExceeded { .. })
        ));
        let again = BranchAndBound::new(&reg, 0.5, needed * 10).run().unwrap();
        assert_eq!(again.total_cost, full.total_cost);
    }

    #[test]
    fn test_matches_exhaustive_search() {
        let reg = registry(
            &[
                ("P1", "a", 30),
                ("P1", "b", 20),
                ("P2", "a", 30),
                ("P2", "c", 10),
                ("P3", "b", 20),
                ("P3", "d", 5),
            ],
            &[
                ("Q1", "a", 30),
                ("Q1", "c", 10),
                ("Q2", "a", 30),
                ("Q2", "b", 20),
                ("Q2", "d", 5),
                ("Q3", "b", 20),
                ("Q3", "c", 10),
            ],
        );
        for p in [0.25, 0.5, 1.0] {
            let outcome = BranchAndBound::new(&reg, p, 1_000_000).run().unwrap();
            let expected = exhaustive_minimum(&reg, p);
            assert!(
                (outcome.total_cost - expected).abs() < 1e-9,
                "p={p}: {} vs {}",
                outcome.total_cost,
                expected
            );
            assert_eq!(outcome.assignment.len(), reg.common_contigs().len());
        }
    }

    #[test]
    fn test_repeated_contig_in_one_bin() {
        let reg = registry(
            &[("P1", "a", 100), ("P1", "a", 100), ("P1", "b", 44)],
            &[("Q1", "a", 100), ("Q1", "b", 44), ("Q2", "a", 100)],
        );
        let outcome = BranchAndBound::new(&reg, 0.5, 1000).run().unwrap();
        // b, then both matchings of a; they cost the same so the second is pruned
        assert_eq!(outcome.calls, 3);
        assert!((outcome.costs.cuts - 10.0).abs() < 1e-9);
        assert_eq!(outcome.costs.joins, 0.0);
        assert!((outcome.total_cost - exhaustive_minimum(&reg, 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_huge_lengths_do_not_overflow() {
        let huge = u64::MAX / 2 + 1;
        let reg = registry(&[("P1", "a", huge)], &[("Q1", "a", huge)]);
        let search = BranchAndBound::new(&reg, 0.5, 10);
        assert_eq!(search.upper_bound(), 2.0 * huge as f64);
        assert_eq!(search.run().unwrap().total_cost, 0.0);
    }

    #[test]
    fn test_no_common_contigs() {
        let reg = registry(&[("P1", "a", 10)], &[("Q1", "b", 10)]);
        let outcome = BranchAndBound::new(&reg, 0.5, 1).run().unwrap();
        assert_eq!(outcome.calls, 0);
        assert_eq!(outcome.total_cost, 0.0);
        assert!(outcome.assignment.is_empty());
    }
}
