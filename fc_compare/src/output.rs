use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use compress_io::compress::CompressIo;

use crate::{config::Config, matrix::LabeledMatrix, process::BenchmarkResults, rank::Ranking};

fn get_file_path(cfg: &Config, name: &str) -> PathBuf {
    let mut p = if let Some(d) = cfg.output_dir() {
        d.to_owned()
    } else {
        PathBuf::new()
    };
    p.push(format!("{}_{}.txt", cfg.output_prefix(), name));
    p
}

fn open_output(p: &Path) -> anyhow::Result<impl Write> {
    trace!("Opening {} for output", p.display());
    CompressIo::new()
        .path(p)
        .bufwriter()
        .with_context(|| format!("Failed to open output file {}", p.display()))
}

pub fn setup_output(cfg: &Config) -> anyhow::Result<()> {
    // Create output directory
    if let Some(d) = cfg.output_dir() {
        if !d.exists() {
            fs::create_dir_all(d)
                .with_context(|| format!("Error creating output directory {}", d.display()))?;
        }
    }
    Ok(())
}

/// Per benchmark and fuzzer: total regions covered, unique regions covered and the
/// location of the coverage report
pub fn output_summary(cfg: &Config, results: &[BenchmarkResults]) -> anyhow::Result<PathBuf> {
    let opath = get_file_path(cfg, "summary");
    let mut wrt = open_output(&opath)?;
    let exp = cfg.experiment();
    let write = |wrt: &mut dyn Write| -> std::io::Result<()> {
        writeln!(
            wrt,
            "benchmark\tfuzzer\taggregated_regions_covered\tunique_regions_covered\treport"
        )?;
        for res in results {
            let b = res.benchmark();
            for f in res.fuzzers() {
                writeln!(
                    wrt,
                    "{}\t{}\t{}\t{}\t{}",
                    b,
                    f,
                    res.aggregated().get(f),
                    res.unique().get(f),
                    exp.coverage_report_path(f, b)
                )?
            }
        }
        wrt.flush()
    };
    write(&mut wrt).with_context(|| format!("Error writing to {}", opath.display()))?;
    Ok(opath)
}

/// Pairwise unique coverage matrix for one benchmark
pub fn output_pairwise(
    cfg: &Config,
    benchmark: &str,
    m: &LabeledMatrix<usize>,
) -> anyhow::Result<PathBuf> {
    let opath = get_file_path(cfg, &format!("{}_pairwise", benchmark));
    let mut wrt = open_output(&opath)?;
    m.write_tsv(&mut wrt, "fuzzer")
        .and_then(|_| wrt.flush())
        .with_context(|| format!("Error writing to {}", opath.display()))?;
    Ok(opath)
}

pub fn output_ranking(cfg: &Config, ranking: &Ranking) -> anyhow::Result<PathBuf> {
    let opath = get_file_path(cfg, "ranking");
    let mut wrt = open_output(&opath)?;
    let write = |wrt: &mut dyn Write| -> std::io::Result<()> {
        writeln!(wrt, "rank\tfuzzer\t{}", ranking.method())?;
        for (i, (f, x)) in ranking.iter().enumerate() {
            writeln!(wrt, "{}\t{}\t{:.4}", i + 1, f, x)?
        }
        wrt.flush()
    };
    write(&mut wrt).with_context(|| format!("Error writing to {}", opath.display()))?;
    Ok(opath)
}
