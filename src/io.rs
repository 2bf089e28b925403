use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use anyhow::Context;
use flate2::read::GzDecoder;
use log::{info, warn};
use thiserror::Error;

use crate::types::{Bin, BinSet, Registry, Side};

const BIN_COLUMN: &str = "plasmid";
const CONTIG_COLUMN: &str = "contig";
const LENGTH_COLUMN: &str = "contig_len";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path:?}: no header line found")]
    MissingHeader { path: PathBuf },

    #[error("{path:?}: header has no '{column}' column")]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{path:?} line {line}: expected at least {expected} fields")]
    ShortRow {
        path: PathBuf,
        line: usize,
        expected: usize,
    },

    #[error("{path:?} line {line}: invalid contig length '{value}'")]
    InvalidLength {
        path: PathBuf,
        line: usize,
        value: String,
    },
}

/// One line of a bin membership table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipRow {
    pub bin: String,
    pub contig: String,
    pub length: u64,
}

fn open_reader(path: &Path) -> Result<Box<dyn BufRead>, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader: Box<dyn BufRead> = if path.extension().map_or(false, |ext| ext == "gz") {
        Box::new(BufReader::new(GzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    Ok(reader)
}

/// Reads a tab-separated membership table, plain or gzipped.
pub fn read_membership<P>(path: P) -> Result<Vec<MembershipRow>, LoadError>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    parse_membership(open_reader(path)?, path)
}

/// Parses membership rows from `reader`. The first non-comment line is the
/// header; `plasmid`, `contig` and `contig_len` are located by name.
pub fn parse_membership<R: BufRead>(reader: R, path: &Path) -> Result<Vec<MembershipRow>, LoadError> {
    let mut columns: Option<(usize, usize, usize)> = None;
    let mut rows = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let line_num = i + 1;
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();

        let Some((bin_col, contig_col, len_col)) = columns else {
            let find = |column: &'static str| {
                fields
                    .iter()
                    .position(|f| *f == column)
                    .ok_or_else(|| LoadError::MissingColumn {
                        path: path.to_path_buf(),
                        column,
                    })
            };
            columns = Some((find(BIN_COLUMN)?, find(CONTIG_COLUMN)?, find(LENGTH_COLUMN)?));
            continue;
        };

        let expected = bin_col.max(contig_col).max(len_col) + 1;
        if fields.len() < expected {
            return Err(LoadError::ShortRow {
                path: path.to_path_buf(),
                line: line_num,
                expected,
            });
        }
        let length = fields[len_col]
            .parse::<u64>()
            .map_err(|_| LoadError::InvalidLength {
                path: path.to_path_buf(),
                line: line_num,
                value: fields[len_col].to_string(),
            })?;

        rows.push(MembershipRow {
            bin: fields[bin_col].to_string(),
            contig: fields[contig_col].to_string(),
            length,
        });
    }

    if columns.is_none() {
        return Err(LoadError::MissingHeader {
            path: path.to_path_buf(),
        });
    }
    Ok(rows)
}

/// Adds the rows of one side to `registry`, dropping contigs shorter than
/// `min_len`. Returns the number of rows kept.
pub fn add_side(registry: &mut Registry, side: Side, rows: &[MembershipRow], min_len: u64) -> usize {
    let mut kept = 0;
    for row in rows.iter().filter(|r| r.length >= min_len) {
        if !registry.add_copy(side, &row.bin, &row.contig, row.length) {
            warn!(
                "Contig {} listed with length {} in bin {}; keeping the first length seen",
                row.contig, row.length, row.bin
            );
        }
        kept += 1;
    }
    kept
}

/// Loads the two bin sets to compare. Contigs shorter than `min_len` are
/// excluded from both sides.
pub fn load_registry<P, Q>(left: P, right: Q, min_len: u64) -> anyhow::Result<Registry>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (left_path, right_path) = (left.as_ref(), right.as_ref());
    let (left_rows, right_rows) = rayon::join(
        || read_membership(left_path),
        || read_membership(right_path),
    );
    let left_rows =
        left_rows.with_context(|| format!("Failed to load left bins: {:?}", left_path))?;
    let right_rows =
        right_rows.with_context(|| format!("Failed to load right bins: {:?}", right_path))?;

    let mut registry = Registry::new();
    let kept_left = add_side(&mut registry, Side::Left, &left_rows, min_len);
    let kept_right = add_side(&mut registry, Side::Right, &right_rows, min_len);
    info!(
        "Left: {} of {} rows in {} bins; right: {} of {} rows in {} bins (min length {})",
        kept_left,
        left_rows.len(),
        registry.left_bins.len(),
        kept_right,
        right_rows.len(),
        registry.right_bins.len(),
        min_len
    );
    Ok(registry)
}

/// Groups rows into bins for evaluation. A contig is listed once per bin;
/// the last length seen for a contig is kept.
pub fn bin_set_from_rows(rows: Vec<MembershipRow>) -> BinSet {
    let mut bins: Vec<Bin> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut lengths = HashMap::new();

    for row in rows {
        lengths.insert(row.contig.clone(), row.length);
        let i = *index.entry(row.bin.clone()).or_insert_with(|| {
            bins.push(Bin {
                name: row.bin.clone(),
                contigs: Vec::new(),
            });
            bins.len() - 1
        });
        if !bins[i].contigs.contains(&row.contig) {
            bins[i].contigs.push(row.contig);
        }
    }
    BinSet { bins, lengths }
}

pub fn load_bin_set<P: AsRef<Path>>(path: P) -> anyhow::Result<BinSet> {
    let path = path.as_ref();
    let rows = read_membership(path).with_context(|| format!("Failed to load bins: {:?}", path))?;
    let set = bin_set_from_rows(rows);
    info!("{:?}: {} bins, {} contigs", path, set.bins.len(), set.lengths.len());
    Ok(set)
}
