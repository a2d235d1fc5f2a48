use std::path::{Path, PathBuf};

use anyhow::Context;
use compress_io::compress::CompressIo;
use tempfile::TempDir;
use utils::WorkerPool;

use crate::{
    coverage::CoverageMap,
    experiment::Experiment,
    filestore::FileStore,
    key::FuzzerBenchmarkKey,
    region::{read_regions, RegionSet},
};

/// Fetch of the covered regions for one fuzzer/benchmark pair
#[derive(Debug)]
struct RetrievalJob {
    key: FuzzerBenchmarkKey,
    src: String,  // Path in filestore
    dst: PathBuf, // Scratch file (unique per pair)
}

impl RetrievalJob {
    fn new(exp: &Experiment, key: FuzzerBenchmarkKey, tmp_dir: &Path) -> Self {
        let src = exp.coverage_data_path(key.fuzzer(), key.benchmark());
        let dst = tmp_dir.join(format!("{}-{}-coverage.json", key.fuzzer(), key.benchmark()));
        Self { key, src, dst }
    }

    /// Failure to copy or parse the data is not an error: the fuzzer is just taken to
    /// have covered nothing
    fn run(self, store: &dyn FileStore) -> (FuzzerBenchmarkKey, RegionSet) {
        trace!("Retrieving {} for {}", self.src, self.key);
        let regions = match store
            .copy(&self.src, &self.dst)
            .and_then(|_| read_region_file(&self.dst))
        {
            Ok(s) => {
                trace!("Found {} covered regions for {}", s.len(), self.key);
                s
            }
            Err(e) => {
                warn!("No coverage data for {}: {:#}", self.key, e);
                RegionSet::new()
            }
        };
        (self.key, regions)
    }
}

fn read_region_file(p: &Path) -> anyhow::Result<RegionSet> {
    let rdr = CompressIo::new()
        .path(p)
        .bufreader()
        .with_context(|| format!("Could not open {}", p.display()))?;
    read_regions(rdr).with_context(|| format!("Error reading from {}", p.display()))
}

fn scratch_dir(parent: Option<&Path>) -> anyhow::Result<TempDir> {
    let mut bld = tempfile::Builder::new();
    bld.prefix("fc_compare");
    match parent {
        Some(d) => bld
            .tempdir_in(d)
            .with_context(|| format!("Could not create scratch directory in {}", d.display())),
        None => bld
            .tempdir()
            .with_context(|| "Could not create scratch directory"),
    }
}

/// Retrieve covered regions for all fuzzer/benchmark pairs in the experiment
///
/// Benchmarks are processed in turn; the retrieval jobs for the fuzzers of a benchmark
/// are run on the worker pool and all must finish before the next benchmark starts.
/// Files are copied to a scratch directory (created in tmp_parent if given) which is
/// removed before returning.
pub fn get_covered_regions(
    exp: &Experiment,
    store: &dyn FileStore,
    pool: &WorkerPool,
    tmp_parent: Option<&Path>,
) -> anyhow::Result<CoverageMap> {
    let tmp = scratch_dir(tmp_parent)?;
    debug!("Using scratch directory {}", tmp.path().display());

    let mut v = Vec::new();
    for bench in exp.benchmarks() {
        debug!(
            "Retrieving coverage data for {} fuzzers on {}",
            bench.fuzzers().len(),
            bench.name()
        );
        let jobs = bench
            .fuzzers()
            .iter()
            .map(|f| {
                FuzzerBenchmarkKey::new(f, bench.name())
                    .map(|key| RetrievalJob::new(exp, key, tmp.path()))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let mut res = pool
            .map(jobs, |job| job.run(store))
            .with_context(|| format!("Error retrieving coverage data for {}", bench.name()))?;
        v.append(&mut res);
    }

    let path = tmp.path().to_owned();
    tmp.close()
        .with_context(|| format!("Could not remove scratch directory {}", path.display()))?;

    let cov: CoverageMap = v.into_iter().collect();
    if cov.is_empty() {
        warn!("No fuzzer/benchmark pairs found for experiment {}", exp.name())
    } else {
        info!("Retrieved coverage data for {} fuzzer/benchmark pairs", cov.len());
    }
    Ok(cov)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filestore::LocalFileStore;
    use std::{
        fs,
        sync::atomic::{AtomicUsize, Ordering},
    };

    fn key(f: &str, b: &str) -> FuzzerBenchmarkKey {
        format!("{} {}", f, b).parse().unwrap()
    }

    /// Filestore where every copy fails
    struct FailingStore(AtomicUsize);

    impl FileStore for FailingStore {
        fn copy(&self, src: &str, _dst: &Path) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("copy of {} failed with status 1", src))
        }
    }

    fn setup_filestore(root: &Path) {
        let data = root.join("exp/coverage/data");
        for (b, f, s) in [
            ("libpng", "afl", "[[0,1,1,2,3],[0,4,1,5,3]]"),
            ("libpng", "libfuzzer", "[[0,4,1,5,3],[1,1,1,9,9],[1,1,1,9,9]]"),
            ("sqlite", "afl", "[]"),
            ("sqlite", "libfuzzer", "not json"),
        ] {
            let d = data.join(b).join(f);
            fs::create_dir_all(&d).unwrap();
            fs::write(d.join("covered_regions.json"), s).unwrap();
        }
    }

    fn experiment(root: &Path) -> Experiment {
        let mut exp = Experiment::new("exp", root.to_str().unwrap());
        for (f, b) in [
            ("afl", "libpng"),
            ("libfuzzer", "libpng"),
            ("honggfuzz", "libpng"),
            ("afl", "sqlite"),
            ("libfuzzer", "sqlite"),
        ] {
            exp.add_pair(f, b).unwrap();
        }
        exp
    }

    #[test]
    fn retrieve_from_local_store() {
        let root = tempfile::tempdir().unwrap();
        setup_filestore(root.path());
        let scratch = tempfile::tempdir().unwrap();
        let exp = experiment(root.path());

        let cov = get_covered_regions(
            &exp,
            &LocalFileStore,
            &WorkerPool::new(3),
            Some(scratch.path()),
        )
        .unwrap();

        assert_eq!(cov.len(), 5);
        assert_eq!(cov.get(&key("afl", "libpng")).unwrap().len(), 2);
        assert_eq!(cov.get(&key("libfuzzer", "libpng")).unwrap().len(), 2);
        // Missing file
        assert!(cov.get(&key("honggfuzz", "libpng")).unwrap().is_empty());
        assert!(cov.get(&key("afl", "sqlite")).unwrap().is_empty());
        // Corrupt file
        assert!(cov.get(&key("libfuzzer", "sqlite")).unwrap().is_empty());

        // Scratch directory has been removed
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn failed_copies_give_empty_sets() {
        let scratch = tempfile::tempdir().unwrap();
        let mut exp = Experiment::new("exp", "gs://bucket");
        exp.add_pair("x", "y").unwrap();
        exp.add_pair("z", "y").unwrap();
        let store = FailingStore(AtomicUsize::new(0));

        let cov = get_covered_regions(&exp, &store, &WorkerPool::new(2), Some(scratch.path()))
            .unwrap();

        assert_eq!(store.0.load(Ordering::SeqCst), 2);
        assert_eq!(cov.len(), 2);
        assert!(cov.iter().all(|(_, s)| s.is_empty()));
        assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn job_paths() {
        let exp = Experiment::new("exp", "gs://bucket");
        let job = RetrievalJob::new(&exp, key("afl", "libpng"), Path::new("/tmp/x"));
        assert_eq!(
            job.src,
            "gs://bucket/exp/coverage/data/libpng/afl/covered_regions.json"
        );
        assert_eq!(job.dst, Path::new("/tmp/x/afl-libpng-coverage.json"));
    }

    #[test]
    fn bad_scratch_parent() {
        let exp = Experiment::new("exp", "/fs");
        let res = get_covered_regions(
            &exp,
            &LocalFileStore,
            &WorkerPool::new(1),
            Some(Path::new("/no/such/dir/for/scratch")),
        );
        assert!(res.is_err());
    }
}
