use crate::{aggregate::BenchmarkCoverage, key::Name, matrix::LabeledMatrix, region::RegionSet};

/// Number of regions covered by the column fuzzer but not by the row fuzzer
pub fn unique_covered(row: &RegionSet, col: &RegionSet) -> usize {
    col.iter().filter(|r| !row.contains(*r)).count()
}

/// Pairwise unique coverage table
///
/// Square matrix with a row and a column for each fuzzer in fuzzers (in the given order).  Cell
/// (row, col) is the number of regions covered by the col fuzzer that the row fuzzer did not
/// cover, so the diagonal is always 0.  A fuzzer with no data for the benchmark is treated
/// as having covered nothing.
pub fn pairwise_unique_coverage(bc: &BenchmarkCoverage, fuzzers: &[Name]) -> LabeledMatrix<usize> {
    let empty = RegionSet::new();
    let sets: Vec<&RegionSet> = fuzzers
        .iter()
        .map(|f| {
            bc.get(f).unwrap_or_else(|| {
                debug!("No coverage data for {} on {}", f, bc.benchmark());
                &empty
            })
        })
        .collect();

    let mut m = LabeledMatrix::new(fuzzers.to_vec(), fuzzers.to_vec());
    for (i, row) in sets.iter().enumerate() {
        for (j, col) in sets.iter().enumerate() {
            if i != j {
                m.set_at(i, j, unique_covered(row, col))
            }
        }
    }
    m
}
