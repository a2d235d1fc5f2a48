use std::{
    collections::{hash_map::Entry, HashMap, HashSet},
    path::Path,
    sync::Arc,
};

use anyhow::Context;
use compress_io::compress::CompressIo;
use utils::{get_next_line, posix_join};

use crate::key::{check_name, Name};

/// A benchmark and the fuzzers that were run on it
#[derive(Debug)]
pub struct Benchmark {
    name: Name,
    fuzzers: Vec<Name>,
}

impl Benchmark {
    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn fuzzers(&self) -> &[Name] {
        &self.fuzzers
    }
}

/// Experiment
///
/// Which fuzzers were run on which benchmarks, and where the experiment data is stored.
/// Benchmarks and fuzzers are kept in order of first appearance.
#[derive(Debug)]
pub struct Experiment {
    name: String,
    filestore: String,
    benchmarks: Vec<Benchmark>,
    bench_idx: HashMap<Name, usize>,
    names: HashSet<Name>,
}

impl Experiment {
    pub fn new<S: AsRef<str>, T: AsRef<str>>(name: S, filestore: T) -> Self {
        Self {
            name: name.as_ref().to_owned(),
            filestore: filestore.as_ref().to_owned(),
            benchmarks: Vec::new(),
            bench_idx: HashMap::new(),
            names: HashSet::new(),
        }
    }

    fn intern(&mut self, s: &str) -> Name {
        if let Some(n) = self.names.get(s) {
            Arc::clone(n)
        } else {
            let n: Name = Arc::from(s);
            self.names.insert(Arc::clone(&n));
            n
        }
    }

    /// Record that fuzzer was run on benchmark.  Repeated pairs are ignored
    pub fn add_pair(&mut self, fuzzer: &str, benchmark: &str) -> anyhow::Result<()> {
        check_name(fuzzer).with_context(|| "Invalid fuzzer name")?;
        check_name(benchmark).with_context(|| "Invalid benchmark name")?;
        let fuzzer = self.intern(fuzzer);
        let benchmark = self.intern(benchmark);
        let ix = match self.bench_idx.entry(Arc::clone(&benchmark)) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                trace!("Adding benchmark {}", benchmark);
                let l = self.benchmarks.len();
                self.benchmarks.push(Benchmark {
                    name: benchmark,
                    fuzzers: Vec::new(),
                });
                e.insert(l);
                l
            }
        };
        let b = &mut self.benchmarks[ix];
        if !b.fuzzers.contains(&fuzzer) {
            b.fuzzers.push(fuzzer)
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn filestore(&self) -> &str {
        &self.filestore
    }

    pub fn set_filestore<S: AsRef<str>>(&mut self, filestore: S) {
        self.filestore = filestore.as_ref().to_owned()
    }

    pub fn benchmarks(&self) -> &[Benchmark] {
        &self.benchmarks
    }

    pub fn benchmark(&self, name: &str) -> Option<&Benchmark> {
        self.bench_idx.get(name).map(|i| &self.benchmarks[*i])
    }

    /// All fuzzers in the experiment
    pub fn fuzzers(&self) -> Vec<Name> {
        let mut seen = HashSet::new();
        let mut v = Vec::new();
        for f in self.benchmarks.iter().flat_map(|b| b.fuzzers.iter()) {
            if seen.insert(f) {
                v.push(Arc::clone(f))
            }
        }
        v
    }

    /// Keep only the named benchmarks.  It is an error if a name is not present
    pub fn select_benchmarks<S: AsRef<str>>(&mut self, names: &[S]) -> anyhow::Result<()> {
        for s in names {
            if self.benchmark(s.as_ref()).is_none() {
                return Err(anyhow!(
                    "Benchmark {} not found in experiment {}",
                    s.as_ref(),
                    self.name
                ));
            }
        }
        self.benchmarks
            .retain(|b| names.iter().any(|s| s.as_ref() == b.name.as_ref()));
        self.bench_idx = self
            .benchmarks
            .iter()
            .enumerate()
            .map(|(i, b)| (Arc::clone(&b.name), i))
            .collect();
        Ok(())
    }

    /// <filestore>/<experiment>
    pub fn experiment_filestore_path(&self) -> String {
        posix_join(&self.filestore, &[&self.name])
    }

    /// <filestore>/<experiment>/coverage/data/<benchmark>/<fuzzer>/covered_regions.json
    pub fn coverage_data_path(&self, fuzzer: &str, benchmark: &str) -> String {
        posix_join(
            &self.experiment_filestore_path(),
            &["coverage", "data", benchmark, fuzzer, "covered_regions.json"],
        )
    }

    /// <filestore>/<experiment>/coverage/reports/<benchmark>/<fuzzer>/index.html
    pub fn coverage_report_path(&self, fuzzer: &str, benchmark: &str) -> String {
        posix_join(
            &self.experiment_filestore_path(),
            &["coverage", "reports", benchmark, fuzzer, "index.html"],
        )
    }
}

/// Read experiment table
///
/// Each line has (at least) four tab separated columns: experiment name,
/// experiment filestore, benchmark and fuzzer.  An optional header line (with 'experiment' in
/// the first column) is skipped, as are short lines.  Only one experiment is handled; this
/// is either the one selected by exp_name or else the first one found in the file.
pub fn read_experiment_file<P: AsRef<Path>>(
    fname: P,
    exp_name: Option<&str>,
) -> anyhow::Result<Experiment> {
    debug!("Reading in experiment data from {}", fname.as_ref().display());

    trace!("Opening experiment file for reading");
    let mut rdr = CompressIo::new().path(&fname).bufreader()?;

    trace!("Reading from file");
    let mut buf = String::new();
    let mut line = 0;
    let mut exp: Option<Experiment> = None;
    let mut skipped = 0;

    while let Some(fields) = get_next_line(&mut rdr, &mut buf).with_context(|| {
        format!(
            "Error after reading {} lines from {}",
            line,
            fname.as_ref().display()
        )
    })? {
        line += 1;
        // Skip short lines and header
        if fields.len() < 4 || fields[0] == "experiment" {
            continue;
        }
        if exp_name.map(|s| s != fields[0]).unwrap_or(false) {
            skipped += 1;
            continue;
        }
        let e = exp.get_or_insert_with(|| Experiment::new(fields[0], fields[1]));
        if e.name() != fields[0] {
            skipped += 1;
            continue;
        }
        if e.filestore() != fields[1] {
            warn!(
                "{}:{} Filestore {} differs from {} for experiment {}",
                fname.as_ref().display(),
                line,
                fields[1],
                e.filestore(),
                e.name()
            )
        }
        e.add_pair(fields[3], fields[2]).with_context(|| {
            format!("{}:{} Parse error", fname.as_ref().display(), line)
        })?;
    }

    let exp = exp.ok_or_else(|| match exp_name {
        Some(s) => anyhow!(
            "No data for experiment {} found in {}",
            s,
            fname.as_ref().display()
        ),
        None => anyhow!("No experiment data found in {}", fname.as_ref().display()),
    })?;
    check_name(exp.name()).with_context(|| "Invalid experiment name")?;

    if skipped > 0 && exp_name.is_none() {
        warn!(
            "Only one experiment can be analyzed: {} lines from other experiments skipped",
            skipped
        )
    }

    debug!(
        "Finished reading in {} lines; experiment {} has {} benchmarks",
        line,
        exp.name(),
        exp.benchmarks().len()
    );

    Ok(exp)
}
