use std::collections::{HashMap, HashSet};

use log::info;
use rayon::prelude::*;
use serde::Serialize;

use crate::types::{Bin, BinSet};

/// Best-matching opposite bin for one statistic.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BestMatch {
    pub value: f64,
    pub bin: Option<String>,
    pub common: u128,
    pub total: u128,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BinStat {
    pub bin: String,
    /// Fraction of contigs.
    pub unweighted: BestMatch,
    /// Fraction of contig length.
    pub weighted: BestMatch,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Overall {
    pub unweighted: f64,
    pub weighted: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Evaluation {
    pub precision: Vec<BinStat>,
    pub recall: Vec<BinStat>,
    pub overall_precision: Overall,
    pub overall_recall: Overall,
    pub f1: Overall,
}

pub(crate) fn round4(x: f64) -> f64 {
    (x * 1e4).round() / 1e4
}

fn ratio(num: u128, denom: u128) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

fn harmonic_mean(precision: f64, recall: f64) -> f64 {
    if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    }
}

struct Scorer<'a> {
    lengths: &'a HashMap<String, u64>,
    min_len: u64,
}

impl Scorer<'_> {
    /// Number and summed length of the contigs that pass the threshold.
    fn tally<'c, I>(&self, contigs: I) -> (u128, u128)
    where
        I: IntoIterator<Item = &'c String>,
    {
        contigs
            .into_iter()
            .map(|c| self.lengths.get(c).copied().unwrap_or(0))
            .filter(|&len| len >= self.min_len)
            .fold((0, 0), |(n, total), len| (n + 1, total + len as u128))
    }

    fn bin_stat(&self, bin: &Bin, opposite: &[Bin]) -> BinStat {
        let (total_n, total_len) = self.tally(&bin.contigs);
        let mut unweighted = BestMatch {
            total: total_n,
            ..BestMatch::default()
        };
        let mut weighted = BestMatch {
            total: total_len,
            ..BestMatch::default()
        };

        let members: HashSet<&String> = bin.contigs.iter().collect();
        for other in opposite {
            let common: HashSet<&String> = other
                .contigs
                .iter()
                .filter(|c| members.contains(c))
                .collect();
            let (common_n, common_len) = self.tally(common.iter().copied());

            let (n_stat, len_stat) = if total_n >= 1 {
                (ratio(common_n, total_n), ratio(common_len, total_len))
            } else {
                (0.0, 0.0)
            };
            if n_stat > unweighted.value {
                unweighted = BestMatch {
                    value: n_stat,
                    bin: Some(other.name.clone()),
                    common: common_n,
                    total: total_n,
                };
            }
            if len_stat > weighted.value {
                weighted = BestMatch {
                    value: len_stat,
                    bin: Some(other.name.clone()),
                    common: common_len,
                    total: total_len,
                };
            }
        }

        BinStat {
            bin: bin.name.clone(),
            unweighted,
            weighted,
        }
    }

    fn bin_stats(&self, bins: &[Bin], opposite: &[Bin]) -> Vec<BinStat> {
        bins.par_iter()
            .map(|bin| self.bin_stat(bin, opposite))
            .collect()
    }
}

fn overall(stats: &[BinStat]) -> Overall {
    let (mut n_common, mut n_total, mut len_common, mut len_total) = (0, 0, 0, 0);
    for stat in stats {
        n_common += stat.unweighted.common;
        n_total += stat.unweighted.total;
        len_common += stat.weighted.common;
        len_total += stat.weighted.total;
    }
    Overall {
        unweighted: round4(ratio(n_common, n_total)),
        weighted: round4(ratio(len_common, len_total)),
    }
}

/// Precision of `predicted` bins against `truth` and recall of `truth`
/// against `predicted`. Contigs shorter than `min_len` are ignored.
pub fn evaluate_bins(predicted: &BinSet, truth: &BinSet, min_len: u64) -> Evaluation {
    let mut lengths = predicted.lengths.clone();
    lengths.extend(truth.lengths.iter().map(|(c, l)| (c.clone(), *l)));
    let scorer = Scorer {
        lengths: &lengths,
        min_len,
    };

    let precision = scorer.bin_stats(&predicted.bins, &truth.bins);
    let recall = scorer.bin_stats(&truth.bins, &predicted.bins);
    let overall_precision = overall(&precision);
    let overall_recall = overall(&recall);
    let f1 = Overall {
        unweighted: round4(harmonic_mean(overall_precision.unweighted, overall_recall.unweighted)),
        weighted: round4(harmonic_mean(overall_precision.weighted, overall_recall.weighted)),
    };

    info!(
        "Precision {} / {}, recall {} / {}, F1 {} / {} (unweighted / weighted)",
        overall_precision.unweighted,
        overall_precision.weighted,
        overall_recall.unweighted,
        overall_recall.weighted,
        f1.unweighted,
        f1.weighted
    );

    Evaluation {
        precision,
        recall,
        overall_precision,
        overall_recall,
        f1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{bin_set_from_rows, MembershipRow};

    fn bin_set(rows: &[(&str, &str, u64)]) -> BinSet {
        bin_set_from_rows(
            rows.iter()
                .map(|(bin, contig, length)| MembershipRow {
                    bin: bin.to_string(),
                    contig: contig.to_string(),
                    length: *length,
                })
                .collect(),
        )
    }

    #[test]
    fn test_perfect_prediction() {
        let rows = [("P1", "a", 100), ("P1", "b", 50), ("P2", "c", 10)];
        let eval = evaluate_bins(&bin_set(&rows), &bin_set(&rows), 0);
        assert_eq!(eval.overall_precision, Overall { unweighted: 1.0, weighted: 1.0 });
        assert_eq!(eval.overall_recall, Overall { unweighted: 1.0, weighted: 1.0 });
        assert_eq!(eval.f1, Overall { unweighted: 1.0, weighted: 1.0 });
        assert_eq!(eval.precision[0].unweighted.bin.as_deref(), Some("P1"));
    }

    #[test]
    fn test_merged_prediction() {
        let pred = bin_set(&[("X", "a", 300), ("X", "b", 100)]);
        let truth = bin_set(&[("T1", "a", 300), ("T2", "b", 100)]);
        let eval = evaluate_bins(&pred, &truth, 0);

        let x = &eval.precision[0];
        assert_eq!(x.unweighted.value, 0.5);
        assert_eq!(x.unweighted.bin.as_deref(), Some("T1"));
        assert_eq!(x.weighted.value, 0.75);
        assert_eq!(x.weighted.common, 300);
        assert_eq!(eval.overall_precision, Overall { unweighted: 0.5, weighted: 0.75 });
        assert_eq!(eval.overall_recall, Overall { unweighted: 1.0, weighted: 1.0 });
        assert_eq!(eval.f1.unweighted, round4(2.0 * 0.5 / 1.5));
    }

    #[test]
    fn test_min_len_and_unmatched_bins() {
        let pred = bin_set(&[("X", "a", 5), ("Y", "z", 1000)]);
        let truth = bin_set(&[("T1", "a", 5), ("T1", "b", 200)]);
        let eval = evaluate_bins(&pred, &truth, 10);

        // all of X is below the threshold
        assert_eq!(eval.precision[0].unweighted, BestMatch::default());
        // Y shares nothing with the truth
        let y = &eval.precision[1];
        assert_eq!(y.unweighted.bin, None);
        assert_eq!(y.unweighted.total, 1);
        assert_eq!(eval.overall_precision.unweighted, 0.0);
        assert_eq!(eval.overall_recall.unweighted, 0.0);
        assert_eq!(eval.f1, Overall::default());
    }

    #[test]
    fn test_huge_lengths() {
        let huge = u64::MAX / 2 + 1;
        let rows = [("X", "a", huge), ("X", "b", huge)];
        let eval = evaluate_bins(&bin_set(&rows), &bin_set(&rows), 0);
        assert_eq!(eval.precision[0].weighted.total, 2 * huge as u128);
        assert_eq!(eval.overall_precision, Overall { unweighted: 1.0, weighted: 1.0 });
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(2.0 / 3.0), 0.6667);
        assert_eq!(round4(0.0), 0.0);
    }
}
