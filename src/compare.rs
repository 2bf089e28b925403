use indicatif::ProgressBar;
use log::{debug, info, warn};
use serde::Serialize;

use crate::search::{BranchAndBound, SearchError, SearchOutcome};
use crate::types::Registry;

/// Tunables of a comparison.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompareConfig {
    /// Exponent `p` applied to fragment lengths. Not range-checked.
    pub exponent: f64,
    /// Maximum number of assignments the search may evaluate.
    pub max_calls: u64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            exponent: 0.5,
            max_calls: 10_000_000,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Cost {
    pub absolute: f64,
    pub normalized: f64,
}

impl Cost {
    fn new(absolute: f64, denom: f64) -> Self {
        let normalized = if denom > 0.0 { absolute / denom } else { 0.0 };
        Self {
            absolute,
            normalized,
        }
    }
}

/// One matched copy pair of the optimal assignment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PairedCopy {
    pub contig: String,
    pub left_bin: String,
    pub right_bin: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub total_length: u128,
    pub total_length_alpha: f64,
    pub cuts: Cost,
    pub joins: Cost,
    pub unique_left: Cost,
    pub unique_right: Cost,
    pub dissimilarity: Cost,
    pub evaluated_assignments: u64,
    pub assignment: Vec<PairedCopy>,
}

/// Runs the matching search over `registry` and scores the result.
pub fn compare_bins(registry: &Registry, config: &CompareConfig) -> Result<Report, SearchError> {
    compare_bins_with_progress(registry, config, ProgressBar::hidden())
}

pub fn compare_bins_with_progress(
    registry: &Registry,
    config: &CompareConfig,
    progress: ProgressBar,
) -> Result<Report, SearchError> {
    if !config.exponent.is_finite() || config.exponent <= 0.0 {
        warn!(
            "Exponent {} is outside (0, 1]; costs may be meaningless",
            config.exponent
        );
    }
    info!(
        "Comparing {} contigs in {} left and {} right bins",
        registry.len(),
        registry.left_bins.len(),
        registry.right_bins.len()
    );

    let outcome = BranchAndBound::new(registry, config.exponent, config.max_calls)
        .with_progress(progress)
        .run()?;
    let report = aggregate(registry, config.exponent, &outcome);

    info!(
        "Cuts {:.4}, joins {:.4}, dissimilarity {:.4}",
        report.cuts.normalized, report.joins.normalized, report.dissimilarity.normalized
    );
    debug!("Optimal assignment: {:?}", report.assignment);
    Ok(report)
}

/// Combines the search outcome with the cost of contigs found on one side
/// only. Contigs present on both sides are never charged here, whatever
/// their copy counts.
pub fn aggregate(registry: &Registry, exponent: f64, outcome: &SearchOutcome) -> Report {
    let mut total_length = 0u128;
    let mut total_denom = 0.0;
    let mut unique_left = 0.0;
    let mut unique_right = 0.0;

    for (_, contig) in registry.contigs() {
        let l = contig.left_copies.len();
        let r = contig.right_copies.len();
        let weight = (contig.length as f64).powf(exponent);
        if l.min(r) == 0 {
            unique_left += l.saturating_sub(r) as f64 * weight;
            unique_right += r.saturating_sub(l) as f64 * weight;
        }
        total_length += (l + r) as u128 * contig.length as u128;
        total_denom += (l + r) as f64 * weight;
    }

    let dissimilarity = unique_left + unique_right + outcome.total_cost;

    Report {
        total_length,
        total_length_alpha: total_denom,
        cuts: Cost::new(outcome.costs.cuts, total_denom),
        joins: Cost::new(outcome.costs.joins, total_denom),
        unique_left: Cost::new(unique_left, total_denom),
        unique_right: Cost::new(unique_right, total_denom),
        dissimilarity: Cost::new(dissimilarity, total_denom),
        evaluated_assignments: outcome.calls,
        assignment: paired_copies(registry, outcome),
    }
}

fn paired_copies(registry: &Registry, outcome: &SearchOutcome) -> Vec<PairedCopy> {
    let mut pairs = Vec::new();
    for (id, matching) in &outcome.assignment {
        let contig = registry.contig(*id);
        for (l, r) in matching.pairs() {
            let left_bin = registry
                .left_bins
                .name(contig.left_copies[l].bin)
                .unwrap_or_default();
            let right_bin = registry
                .right_bins
                .name(contig.right_copies[r].bin)
                .unwrap_or_default();
            pairs.push(PairedCopy {
                contig: contig.name.clone(),
                left_bin: left_bin.to_string(),
                right_bin: right_bin.to_string(),
            });
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    const EPS: f64 = 1e-9;

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

    #[test]
    fn test_identical_sets() {
        let bins = [
            ("P1", "a", 1000),
            ("P1", "b", 400),
            ("P2", "a", 1000),
            ("P2", "c", 90),
        ];
        let reg = registry(&bins, &bins);
        let report = compare_bins(&reg, &CompareConfig::default()).unwrap();
        assert!(report.cuts.absolute.abs() < EPS);
        assert!(report.joins.absolute.abs() < EPS);
        assert!(report.dissimilarity.normalized.abs() < EPS);
        assert_eq!(report.total_length, 2 * 2490);
        assert_eq!(report.assignment.len(), 4);
    }

    #[test]
    fn test_disjoint_sets() {
        let reg = registry(
            &[("P1", "a", 100), ("P1", "b", 25)],
            &[("Q1", "c", 16), ("Q2", "d", 9)],
        );
        let report = compare_bins(&reg, &CompareConfig::default()).unwrap();
        assert_eq!(report.cuts.absolute, 0.0);
        assert_eq!(report.joins.absolute, 0.0);
        assert!((report.unique_left.absolute - 15.0).abs() < EPS);
        assert!((report.unique_right.absolute - 7.0).abs() < EPS);
        assert!((report.total_length_alpha - 22.0).abs() < EPS);
        assert!((report.dissimilarity.normalized - 1.0).abs() < EPS);
    }

    #[test]
    fn test_scenario() {
        // A has two left copies and one right copy; B sits with the L1 copy
        let left = [("L1", "A", 100), ("L1", "B", 50), ("L2", "A", 100)];
        let right = [("R1", "A", 100), ("R1", "B", 50)];
        let config = CompareConfig {
            exponent: 0.5,
            max_calls: 1000,
        };
        let report = compare_bins(&registry(&left, &right), &config).unwrap();
        assert_eq!(report.evaluated_assignments, 3);
        assert!(report.cuts.absolute.abs() < EPS);
        assert!(report.joins.absolute.abs() < EPS);
        // the extra copy of A is shared, so it is not charged
        assert_eq!(report.unique_left.absolute, 0.0);
        assert!(report.assignment.contains(&PairedCopy {
            contig: "A".to_string(),
            left_bin: "L1".to_string(),
            right_bin: "R1".to_string(),
        }));

        // a contig on the right only makes the score strictly positive
        let right = [("R1", "A", 100), ("R1", "B", 50), ("R2", "C", 64)];
        let report = compare_bins(&registry(&left, &right), &config).unwrap();
        assert!((report.unique_right.absolute - 8.0).abs() < EPS);
        assert!(report.dissimilarity.normalized > 0.0);
        assert!(report.dissimilarity.normalized < 1.0);
    }

    #[test]
    fn test_fragmented_prediction() {
        // left P1 = {a, b} is cut in two on the right
        let reg = registry(
            &[("P1", "a", 100), ("P1", "b", 25)],
            &[("Q1", "a", 100), ("Q2", "b", 25)],
        );
        let report = compare_bins(&reg, &CompareConfig::default()).unwrap();
        assert!((report.cuts.absolute - 5.0).abs() < EPS);
        assert_eq!(report.joins.absolute, 0.0);
        let denom = 2.0 * (10.0 + 5.0);
        assert!((report.dissimilarity.normalized - 5.0 / denom).abs() < EPS);
    }

    #[test]
    fn test_empty_input_scores_zero() {
        let reg = Registry::new();
        let report = compare_bins(&reg, &CompareConfig::default()).unwrap();
        assert_eq!(report.total_length_alpha, 0.0);
        assert_eq!(report.dissimilarity.normalized, 0.0);

        let zero_length = registry(&[("P1", "a", 0)], &[]);
        let report = compare_bins(&zero_length, &CompareConfig::default()).unwrap();
        assert!(!report.dissimilarity.normalized.is_nan());
        assert_eq!(report.dissimilarity.normalized, 0.0);
    }

    #[test]
    fn test_huge_lengths() {
        let huge = u64::MAX / 2 + 1;
        let bins = [("P1", "a", huge), ("P1", "b", huge)];
        let report = compare_bins(&registry(&bins, &bins), &CompareConfig::default()).unwrap();
        assert_eq!(report.total_length, 4 * huge as u128);
        assert!(report.dissimilarity.normalized.abs() < EPS);

        // P1 is cut in two
        let right = [("Q1", "a", huge), ("Q2", "b", huge)];
        let report = compare_bins(&registry(&bins, &right), &CompareConfig::default()).unwrap();
        let weight = (huge as f64).sqrt();
        assert!((report.cuts.absolute - weight).abs() / weight < EPS);
        assert!((report.dissimilarity.normalized - 0.25).abs() < EPS);
    }

    #[test]
    fn test_budget_exceeded_propagates() {
        let bins = [("P1", "a", 10), ("P2", "a", 10), ("P3", "a", 10)];
        let config = CompareConfig {
            exponent: 0.5,
            max_calls: 5,
        };
        let err = compare_bins(&registry(&bins, &bins), &config).unwrap_err();
        assert_eq!(err, SearchError::BudgetExceeded { max_calls: 5 });
    }
}
