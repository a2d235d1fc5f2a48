use std::{collections::HashMap, sync::Arc};

use crate::{
    coverage::CoverageMap,
    key::Name,
    region::{Region, RegionSet},
};

/// Default maximum number of fuzzers covering a region for the region to count as unique
pub const DEFAULT_UNIQUE_THRESHOLD: usize = 1;

/// Count for each fuzzer in a fixed order.  Look up of a fuzzer not in the
/// table gives 0
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuzzerCounts {
    counts: Vec<(Name, usize)>,
}

impl FuzzerCounts {
    pub fn get(&self, fuzzer: &str) -> usize {
        self.counts
            .iter()
            .find(|(f, _)| f.as_ref() == fuzzer)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Name, usize)> {
        self.counts.iter().map(|(f, n)| (f, *n))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(Name, usize)> for FuzzerCounts {
    fn from_iter<I: IntoIterator<Item = (Name, usize)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

/// Region sets of all fuzzers for one benchmark, borrowed from the coverage map
#[derive(Debug)]
pub struct BenchmarkCoverage<'a> {
    benchmark: &'a str,
    sets: HashMap<Name, &'a RegionSet>,
}

impl<'a> BenchmarkCoverage<'a> {
    /// Collect the entries of cov for benchmark
    pub fn new(cov: &'a CoverageMap, benchmark: &'a str) -> Self {
        let sets: HashMap<_, _> = cov
            .iter()
            .filter(|(k, _)| k.benchmark().as_ref() == benchmark)
            .map(|(k, s)| (Arc::clone(k.fuzzer()), s))
            .collect();
        trace!("Found coverage for {} fuzzers on {}", sets.len(), benchmark);
        Self { benchmark, sets }
    }

    pub fn benchmark(&self) -> &str {
        self.benchmark
    }

    /// Regions covered by fuzzer, if the fuzzer was found for this benchmark
    pub fn get(&self, fuzzer: &str) -> Option<&'a RegionSet> {
        self.sets.get(fuzzer).copied()
    }

    /// Fuzzers with coverage data on this benchmark, in name order
    pub fn fuzzers(&self) -> Vec<Name> {
        let mut v: Vec<_> = self.sets.keys().cloned().collect();
        v.sort_unstable();
        v
    }

    /// Number of covered regions for each fuzzer in fuzzers, in the same order.
    /// Fuzzers that covered nothing (or had no data) are reported with a count of 0
    pub fn aggregated_counts(&self, fuzzers: &[Name]) -> FuzzerCounts {
        fuzzers
            .iter()
            .map(|f| (Arc::clone(f), self.get(f).map_or(0, |s| s.len())))
            .collect()
    }

    /// Index of regions covered by no more than threshold fuzzers
    pub fn unique_region_index(&self, threshold: usize) -> UniqueRegionIndex<'a> {
        let mut owners: HashMap<&'a Region, Vec<Name>> = HashMap::new();
        for f in self.fuzzers() {
            let s: &'a RegionSet = self.sets[&f];
            for r in s.iter() {
                owners.entry(r).or_default().push(Arc::clone(&f))
            }
        }
        let total = owners.len();
        owners.retain(|_, v| v.len() <= threshold);
        debug!(
            "{}: {} of {} covered regions are covered by at most {} fuzzer(s)",
            self.benchmark,
            owners.len(),
            total,
            threshold
        );
        UniqueRegionIndex {
            regions: owners,
            threshold,
        }
    }
}

/// Map from region to the fuzzers covering it, for regions covered by at most
/// threshold fuzzers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueRegionIndex<'a> {
    regions: HashMap<&'a Region, Vec<Name>>,
    threshold: usize,
}

impl<'a> UniqueRegionIndex<'a> {
    /// Fuzzers covering region (in name order) if region is in the index
    #[cfg(test)]
    pub fn get(&self, region: &Region) -> Option<&[Name]> {
        self.regions.get(region).map(|v| v.as_slice())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Number of unique regions covered by each fuzzer in fuzzers.  Every fuzzer
    /// in the list is reported, fuzzers not in the list are ignored.
    pub fn unique_counts(&self, fuzzers: &[Name]) -> FuzzerCounts {
        let mut counts: HashMap<&str, usize> = fuzzers.iter().map(|f| (f.as_ref(), 0)).collect();
        for f in self.regions.values().flatten() {
            if let Some(c) = counts.get_mut(f.as_ref()) {
                *c += 1
            }
        }
        fuzzers
            .iter()
            .map(|f| (Arc::clone(f), counts[f.as_ref()]))
            .collect()
    }
}
