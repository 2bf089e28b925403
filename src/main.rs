use std::{fs::File, path::Path, time::Duration};

use anyhow::{Context, Result};
use bindiff::{
    cli::{self, CompArgs, Command, EvalArgs, ReportFormat},
    compare, evaluate, io, output,
};
use env_logger::{Env, Target};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, Level};

fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));
    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Could not create directory: {:?}", parent))?;
        }
        let file =
            File::create(path).with_context(|| format!("Could not create log file: {:?}", path))?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

/// Spinner counting evaluated assignments. Hidden when per-level logging
/// would be written to the same terminal.
fn search_spinner(logs_to_file: bool) -> Result<ProgressBar> {
    if !logs_to_file && log::log_enabled!(Level::Debug) {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}] {spinner:.cyan} {pos} assignments evaluated {msg}",
    )?);
    pb.enable_steady_tick(Duration::from_millis(200));
    Ok(pb)
}

fn run_comp(args: &CompArgs, logs_to_file: bool) -> Result<()> {
    let registry = io::load_registry(&args.left, &args.right, args.min_len)?;

    let progress = search_spinner(logs_to_file)?;
    let result = compare::compare_bins_with_progress(&registry, &args.config(), progress.clone());
    progress.finish_and_clear();
    let report = result?;

    let writer = output::create_output(&args.out_file)?;
    match args.format {
        ReportFormat::Tsv => output::write_report_tsv(writer, &report)?,
        ReportFormat::Json => output::write_report_json(writer, &report)?,
    }
    info!("Report written to {:?}", args.out_file);
    Ok(())
}

fn run_eval(args: &EvalArgs) -> Result<()> {
    let predicted = io::load_bin_set(&args.pred)?;
    let truth = io::load_bin_set(&args.gt)?;
    let evaluation = evaluate::evaluate_bins(&predicted, &truth, args.min_len);

    let writer = output::create_output(&args.out_file)?;
    output::write_evaluation_tsv(writer, &evaluation)?;
    info!("Evaluation written to {:?}", args.out_file);
    Ok(())
}

fn main() -> Result<()> {
    let args = cli::parse_args();
    init_logging(args.log_file.as_deref())?;

    rayon::ThreadPoolBuilder::new()
        .num_threads(args.threads)
        .build_global()
        .context("Failed to set up the thread pool")?;

    let result = match &args.command {
        Command::Comp(comp) => run_comp(comp, args.log_file.is_some()),
        Command::Eval(eval) => run_eval(eval),
    };
    if let Err(e) = &result {
        if args.log_file.is_some() {
            error!("{:#}", e);
        }
    }
    result
}
