use std::{
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{anyhow, Context, Result};

use crate::compare::{Cost, Report};
use crate::evaluate::{round4, BestMatch, Evaluation};

/// Opens `path` for writing, creating missing parent directories. `-` and
/// `stdout` write to standard output.
pub fn create_output<P: AsRef<Path>>(path: P) -> Result<Box<dyn Write>> {
    let path = path.as_ref();
    if path == Path::new("-") || path == Path::new("stdout") {
        return Ok(Box::new(BufWriter::new(std::io::stdout())));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| anyhow!("Could not create directory: {:?}", parent))?;
    }
    let outfile =
        std::fs::File::create(path).with_context(|| anyhow!("Could not create file: {:?}", path))?;
    Ok(Box::new(BufWriter::new(outfile)))
}

fn write_cost<W: Write>(writer: &mut W, label: &str, cost: &Cost) -> Result<()> {
    writeln!(writer, "{}\t{}\t{}", label, cost.absolute, cost.normalized)?;
    Ok(())
}

pub fn write_report_tsv<W: Write>(mut writer: W, report: &Report) -> Result<()> {
    writeln!(writer, "Total_ctg_length\t{}", report.total_length)?;
    writeln!(writer, "Total_ctg_length_alpha\t{}", report.total_length_alpha)?;
    write_cost(&mut writer, "Cuts", &report.cuts)?;
    write_cost(&mut writer, "Joins", &report.joins)?;
    write_cost(&mut writer, "Extra_ctgs", &report.unique_left)?;
    write_cost(&mut writer, "Missing_ctgs", &report.unique_right)?;
    write_cost(&mut writer, "Dissimilarity", &report.dissimilarity)?;
    writer.flush()?;
    Ok(())
}

pub fn write_report_json<W: Write>(mut writer: W, report: &Report) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn match_name(best: &BestMatch) -> &str {
    best.bin.as_deref().unwrap_or("None")
}

pub fn write_evaluation_tsv<W: Write>(mut writer: W, eval: &Evaluation) -> Result<()> {
    writeln!(
        writer,
        "Level\tStatistic\tBin\tUnwtd_Stat\tWtd_Stat\tUnwtd_Match\tWtd_Match"
    )?;

    for (label, stats) in [("Precision", &eval.precision), ("Recall", &eval.recall)] {
        for s in stats {
            writeln!(
                writer,
                "Individual\t{}\t{}\t{}\t{}\t{}\t{}",
                label,
                s.bin,
                round4(s.unweighted.value),
                round4(s.weighted.value),
                match_name(&s.unweighted),
                match_name(&s.weighted)
            )?;
        }
    }

    for (label, overall) in [
        ("Precision", &eval.overall_precision),
        ("Recall", &eval.overall_recall),
        ("F1", &eval.f1),
    ] {
        writeln!(
            writer,
            "Overall\t{}\tNone\t{}\t{}\tNone\tNone",
            label, overall.unweighted, overall.weighted
        )?;
    }

    writer.flush()?;
    Ok(())
}
