use std::path::{Path, PathBuf};

use utils::RankMethod;

use crate::{aggregate::DEFAULT_UNIQUE_THRESHOLD, experiment::Experiment};

/// Config
///
/// Configuration info for the program
/// This is generated from the command line arguments
/// Once set it is read only
///
/// experiment - fuzzers, benchmarks and filestore location for the experiment
/// threads - number of retrieval threads
/// tmp_dir - parent directory for scratch files [default: system temp directory]
/// unique_threshold - maximum number of fuzzers covering a region for it to be unique
/// rank_method - how fuzzers are ranked across benchmarks
/// output_dir - output directory
/// output_prefix - prefix for output file names
///
pub struct Config {
    experiment: Experiment,
    threads: usize,
    tmp_dir: Option<PathBuf>,
    unique_threshold: usize,
    rank_method: RankMethod,
    output_dir: Option<PathBuf>,
    output_prefix: String,
}

impl Config {
    pub fn new(experiment: Experiment) -> Self {
        Self {
            experiment,
            threads: 1,
            tmp_dir: None,
            unique_threshold: DEFAULT_UNIQUE_THRESHOLD,
            rank_method: RankMethod::AverageNormalizedScore,
            output_dir: None,
            output_prefix: String::from("fc"),
        }
    }

    pub fn set_threads(&mut self, x: usize) {
        self.threads = x
    }

    pub fn set_tmp_dir<P: AsRef<Path>>(&mut self, dir: P) {
        self.tmp_dir = Some(dir.as_ref().to_owned())
    }

    pub fn set_unique_threshold(&mut self, x: usize) -> anyhow::Result<()> {
        if x == 0 {
            Err(anyhow!("Invalid unique threshold - must be at least 1"))
        } else {
            self.unique_threshold = x;
            Ok(())
        }
    }

    pub fn set_rank_method(&mut self, m: RankMethod) {
        self.rank_method = m
    }

    pub fn set_output_dir<P: AsRef<Path>>(&mut self, dir: P) {
        self.output_dir = Some(dir.as_ref().to_owned())
    }

    pub fn set_output_prefix<S: AsRef<str>>(&mut self, s: S) {
        self.output_prefix = s.as_ref().to_owned()
    }

    pub fn experiment(&self) -> &Experiment {
        &self.experiment
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn tmp_dir(&self) -> Option<&Path> {
        self.tmp_dir.as_deref()
    }

    pub fn unique_threshold(&self) -> usize {
        self.unique_threshold
    }

    pub fn rank_method(&self) -> RankMethod {
        self.rank_method
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    pub fn output_prefix(&self) -> &str {
        &self.output_prefix
    }
}
