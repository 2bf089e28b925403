//! Dissimilarity between two sets of genome-assembly bins.
//!
//! Contigs shared by both sets may occur several times on each side. The
//! comparison pairs up those copies so that the fragmentation of bins across
//! the other set (cuts on the left, joins on the right) is minimal, then adds
//! the weight of contigs found on one side only and normalizes by the total
//! weight of all contig copies.
//!
//! The `eval` side of the crate scores predicted bins against ground truth
//! with best-match precision and recall.

pub mod cli;
pub mod compare;
pub mod cost;
pub mod evaluate;
pub mod io;
pub mod matching;
pub mod output;
pub mod search;
pub mod types;
