use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::compare::CompareConfig;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Compare and evaluate sets of plasmid bins")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, default_value_t = 1, help = "Num threads")]
    pub threads: usize,

    #[arg(
        long,
        global = true,
        help = "Write log records to this file instead of stderr"
    )]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compute the dissimilarity between two sets of bins
    Comp(CompArgs),

    /// Compute precision and recall of predicted bins against ground truth
    Eval(EvalArgs),
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Tsv,
    Json,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CompArgs {
    #[arg(short, long, help = "Bin membership table of the first (left) set")]
    pub left: PathBuf,

    #[arg(short, long, help = "Bin membership table of the second (right) set")]
    pub right: PathBuf,

    #[arg(
        short = 'p',
        long,
        default_value_t = 0.5,
        allow_negative_numbers = true,
        help = "Exponent applied to contig lengths"
    )]
    pub exponent: f64,

    #[arg(long, default_value_t = 0, help = "Ignore contigs shorter than this")]
    pub min_len: u64,

    #[arg(
        long,
        default_value_t = 10_000_000,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Maximum number of assignments to evaluate"
    )]
    pub max_calls: u64,

    #[arg(short, long, default_value = "-", help = "Output file, - for stdout")]
    pub out_file: PathBuf,

    #[arg(long, value_enum, default_value_t = ReportFormat::Tsv)]
    pub format: ReportFormat,
}

impl CompArgs {
    pub fn config(&self) -> CompareConfig {
        CompareConfig {
            exponent: self.exponent,
            max_calls: self.max_calls,
        }
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct EvalArgs {
    #[arg(long, help = "Bin membership table of the predicted bins")]
    pub pred: PathBuf,

    #[arg(long, help = "Bin membership table of the ground truth bins")]
    pub gt: PathBuf,

    #[arg(long, default_value_t = 0, help = "Ignore contigs shorter than this")]
    pub min_len: u64,

    #[arg(short, long, default_value = "-", help = "Output file, - for stdout")]
    pub out_file: PathBuf,
}

pub fn parse_args() -> Args {
    Args::parse()
}
