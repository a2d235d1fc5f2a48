use std::collections::{hash_map, HashMap};

use crate::{key::FuzzerBenchmarkKey, region::RegionSet};

/// Covered regions for every fuzzer/benchmark pair of an experiment.
/// Read only once built
#[derive(Debug, Default)]
pub struct CoverageMap {
    map: HashMap<FuzzerBenchmarkKey, RegionSet>,
}

impl CoverageMap {
    #[cfg(test)]
    pub fn get(&self, key: &FuzzerBenchmarkKey) -> Option<&RegionSet> {
        self.map.get(key)
    }

    pub fn iter(&self) -> hash_map::Iter<'_, FuzzerBenchmarkKey, RegionSet> {
        self.map.iter()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl FromIterator<(FuzzerBenchmarkKey, RegionSet)> for CoverageMap {
    fn from_iter<I: IntoIterator<Item = (FuzzerBenchmarkKey, RegionSet)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}
