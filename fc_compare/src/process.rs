use std::sync::Arc;

use utils::WorkerPool;

use crate::{
    aggregate::{BenchmarkCoverage, FuzzerCounts},
    config::Config,
    coverage::CoverageMap,
    experiment::Benchmark,
    filestore::filestore_for,
    key::Name,
    matrix::LabeledMatrix,
    output,
    pairwise::pairwise_unique_coverage,
    rank::{rank_by_unique_coverage, BenchmarkUniqueCoverage},
    retrieve::get_covered_regions,
};

/// Coverage comparison of the fuzzers run on one benchmark
#[derive(Debug)]
pub struct BenchmarkResults {
    benchmark: Name,
    fuzzers: Vec<Name>,
    aggregated: FuzzerCounts,
    unique: FuzzerCounts,
    pairwise: LabeledMatrix<usize>,
}

impl BenchmarkResults {
    pub fn benchmark(&self) -> &Name {
        &self.benchmark
    }

    pub fn fuzzers(&self) -> &[Name] {
        &self.fuzzers
    }

    pub fn aggregated(&self) -> &FuzzerCounts {
        &self.aggregated
    }

    pub fn unique(&self) -> &FuzzerCounts {
        &self.unique
    }

    pub fn pairwise(&self) -> &LabeledMatrix<usize> {
        &self.pairwise
    }
}

pub fn analyze_benchmark(cov: &CoverageMap, bench: &Benchmark, threshold: usize) -> BenchmarkResults {
    debug!("Analyzing coverage for {}", bench.name());
    let bc = BenchmarkCoverage::new(cov, bench.name());
    let aggregated = bc.aggregated_counts(bench.fuzzers());
    let idx = bc.unique_region_index(threshold);
    debug!(
        "{} regions on {} covered by at most {} fuzzer(s)",
        idx.len(),
        bench.name(),
        idx.threshold()
    );
    let unique = idx.unique_counts(bench.fuzzers());
    let pairwise = pairwise_unique_coverage(&bc, bench.fuzzers());
    BenchmarkResults {
        benchmark: Arc::clone(bench.name()),
        fuzzers: bench.fuzzers().to_vec(),
        aggregated,
        unique,
        pairwise,
    }
}

/// Strategy
///
/// Retrieve covered regions for all fuzzers and benchmarks from the filestore
/// For each benchmark, count total and unique covered regions for each fuzzer and
/// generate the pairwise unique coverage table
/// Rank fuzzers using the unique region counts from all benchmarks
pub fn process_experiment(cfg: &Config) -> anyhow::Result<()> {
    debug!("Starting processing");
    let exp = cfg.experiment();
    let store = filestore_for(exp.filestore());
    let pool = WorkerPool::new(cfg.threads());

    let cov = get_covered_regions(exp, &*store, &pool, cfg.tmp_dir())?;

    let results: Vec<_> = exp
        .benchmarks()
        .iter()
        .map(|b| analyze_benchmark(&cov, b, cfg.unique_threshold()))
        .collect();

    let tables: Vec<_> = results
        .iter()
        .map(|r| BenchmarkUniqueCoverage {
            benchmark: Arc::clone(&r.benchmark),
            counts: r.unique.clone(),
        })
        .collect();
    let ranking = rank_by_unique_coverage(&tables, cfg.rank_method())?;
    if ranking.is_empty() {
        warn!("No fuzzers to rank in experiment {}", exp.name())
    } else {
        debug!("Ranked {} fuzzers", ranking.len())
    }

    output::setup_output(cfg)?;
    let p = output::output_summary(cfg, &results)?;
    info!("Summary written to {}", p.display());
    for r in results.iter() {
        let p = output::output_pairwise(cfg, r.benchmark(), r.pairwise())?;
        debug!("Pairwise table for {} written to {}", r.benchmark(), p.display());
    }
    let p = output::output_ranking(cfg, &ranking)?;
    info!("Ranking written to {}", p.display());
    Ok(())
}
