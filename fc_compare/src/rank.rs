use std::{cmp::Ordering, collections::HashSet, sync::Arc};

use utils::RankMethod;

use crate::{aggregate::FuzzerCounts, key::Name, matrix::LabeledMatrix};

/// Unique coverage counts for one benchmark
#[derive(Debug, Clone)]
pub struct BenchmarkUniqueCoverage {
    pub benchmark: Name,
    pub counts: FuzzerCounts,
}

/// Combine per benchmark counts into a single table with a row per fuzzer and a column per
/// benchmark.  Fuzzers are in order of first appearance; a fuzzer missing from a benchmark
/// gets 0 for that benchmark.
pub fn combine_unique_coverage(
    tables: &[BenchmarkUniqueCoverage],
) -> anyhow::Result<LabeledMatrix<f64>> {
    let mut seen = HashSet::new();
    let mut fuzzers = Vec::new();
    for f in tables.iter().flat_map(|t| t.counts.iter().map(|(f, _)| f)) {
        if seen.insert(f) {
            fuzzers.push(Arc::clone(f))
        }
    }
    let benchmarks: Vec<Name> = tables.iter().map(|t| Arc::clone(&t.benchmark)).collect();

    let mut m = LabeledMatrix::new(fuzzers, benchmarks);
    for t in tables {
        for (f, n) in t.counts.iter() {
            m.set(f, &t.benchmark, n as f64)?
        }
    }
    Ok(m)
}

/// Final score for each fuzzer, best first
#[derive(Debug, Clone)]
pub struct Ranking {
    method: RankMethod,
    scores: Vec<(Name, f64)>,
}

impl Ranking {
    pub fn method(&self) -> RankMethod {
        self.method
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, f64)> {
        self.scores.iter().map(|(f, x)| (f, *x))
    }

    #[cfg(test)]
    pub fn get(&self, fuzzer: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|(f, _)| f.as_ref() == fuzzer)
            .map(|(_, x)| *x)
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// Rank fuzzers from a table with one row per benchmark and one column per fuzzer
pub fn rank_fuzzers(table: &LabeledMatrix<f64>, method: RankMethod) -> Ranking {
    let rows: Vec<&[f64]> = table.iter_rows().map(|(_, v)| v).collect();
    let x = method.reduce(&rows, table.n_cols());
    let mut scores: Vec<(Name, f64)> = table
        .col_labels()
        .iter()
        .cloned()
        .zip(x)
        .collect();
    let hib = method.higher_is_better();
    scores.sort_by(|(f1, x1), (f2, x2)| {
        let o = x1.partial_cmp(x2).unwrap_or(Ordering::Equal);
        (if hib { o.reverse() } else { o }).then_with(|| f1.cmp(f2))
    });
    Ranking { method, scores }
}

/// Rank fuzzers on the number of unique regions covered across benchmarks
pub fn rank_by_unique_coverage(
    tables: &[BenchmarkUniqueCoverage],
    method: RankMethod,
) -> anyhow::Result<Ranking> {
    let combined = combine_unique_coverage(tables)?;
    debug!(
        "Ranking {} fuzzers over {} benchmarks by {}",
        combined.n_rows(),
        combined.n_cols(),
        method
    );
    Ok(rank_fuzzers(&combined.transpose(), method))
}
