use std::{num::NonZeroUsize, path::PathBuf};

use clap::{
    crate_authors, crate_description, crate_name, crate_version, value_parser, Arg, ArgAction,
    ArgMatches, Command,
};

use anyhow::Context;

use utils::{init_log, LogLevel, RankMethod};

use crate::{config::Config, experiment::read_experiment_file};

/// Set up definition of command options for clap
fn cli_model() -> Command {
    Command::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .author(crate_authors!())
        .arg(
            Arg::new("timestamp")
                .short('X')
                .long("timestamp")
                .value_parser(value_parser!(stderrlog::Timestamp))
                .value_name("GRANULARITY")
                .default_value("none")
                .help("Prepend log entries with a timestamp"),
        )
        .arg(
            Arg::new("loglevel")
                .short('l')
                .long("loglevel")
                .value_name("LOGLEVEL")
                .value_parser(value_parser!(LogLevel))
                .ignore_case(true)
                .default_value("warn")
                .help("Set log level"),
        )
        .arg(
            Arg::new("quiet")
                .action(ArgAction::SetTrue)
                .long("quiet")
                .conflicts_with("loglevel")
                .help("Silence all output"),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_parser(value_parser!(NonZeroUsize))
                .value_name("INT")
                .help("Set number of retrieval threads [default: available cores]"),
        )
        .arg(
            Arg::new("filestore")
                .short('f')
                .long("filestore")
                .value_parser(value_parser!(String))
                .value_name("PATH")
                .help("Set filestore root [default: from experiment file]"),
        )
        .arg(
            Arg::new("experiment")
                .short('e')
                .long("experiment")
                .value_parser(value_parser!(String))
                .value_name("NAME")
                .help("Select experiment [default: first experiment in experiment file]"),
        )
        .arg(
            Arg::new("tmp_dir")
                .short('T')
                .long("tmp-dir")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Set parent directory for scratch files [default: system temp directory]"),
        )
        .arg(
            Arg::new("unique_threshold")
                .short('u')
                .long("unique-threshold")
                .value_parser(value_parser!(NonZeroUsize))
                .value_name("INT")
                .default_value("1")
                .help("Maximum number of fuzzers covering a region for the region to be unique"),
        )
        .arg(
            Arg::new("rank_method")
                .short('r')
                .long("rank-method")
                .value_parser(value_parser!(RankMethod))
                .value_name("METHOD")
                .ignore_case(true)
                .default_value("average-normalized-score")
                .help("Ranking across benchmarks [average-normalized-score, average-rank]"),
        )
        .arg(
            Arg::new("benchmark")
                .short('b')
                .long("benchmark")
                .action(ArgAction::Append)
                .value_parser(value_parser!(String))
                .value_name("NAME")
                .help("Restrict analysis to benchmark (can be repeated) [default: all benchmarks]"),
        )
        .arg(
            Arg::new("output_prefix")
                .short('p')
                .long("output-prefix")
                .value_parser(value_parser!(String))
                .value_name("STRING")
                .default_value("fc")
                .help("Set prefix for output file names"),
        )
        .arg(
            Arg::new("output_dir")
                .short('d')
                .long("output-dir")
                .value_parser(value_parser!(PathBuf))
                .value_name("PATH")
                .help("Set output directory [default: current directory]"),
        )
        .arg(
            Arg::new("experiment_file")
                .value_parser(value_parser!(PathBuf))
                .value_name("EXPERIMENT_FILE")
                .required(true)
                .help("Input file with experiment, filestore, benchmark and fuzzer columns"),
        )
}

/// Handle command line options.  Set up Config structure
pub fn handle_cli() -> anyhow::Result<Config> {
    // Get matches from command line
    let m = cli_model().get_matches();

    // Setup logging
    init_log(&m)?;

    debug!("Processing command line options");
    config_from_matches(&m)
}

fn config_from_matches(m: &ArgMatches) -> anyhow::Result<Config> {
    let nt = m
        .get_one::<NonZeroUsize>("threads")
        .map(|x| usize::from(*x))
        .unwrap_or_else(num_cpus::get);

    // Read in experiment table
    let mut exp = read_experiment_file(
        m.get_one::<PathBuf>("experiment_file")
            .expect("Missing experiment file"),
        m.get_one::<String>("experiment").map(|s| s.as_str()),
    )
    .with_context(|| "Could not read from experiment file")?;

    if let Some(s) = m.get_one::<String>("filestore") {
        exp.set_filestore(s)
    }

    if let Some(v) = m.get_many::<String>("benchmark") {
        let v: Vec<_> = v.collect();
        exp.select_benchmarks(&v)?
    }

    debug!(
        "Experiment {} at {}: {} benchmarks, {} fuzzers",
        exp.name(),
        exp.filestore(),
        exp.benchmarks().len(),
        exp.fuzzers().len()
    );

    let mut cfg = Config::new(exp);
    cfg.set_threads(nt);

    if let Some(x) = m.get_one::<NonZeroUsize>("unique_threshold") {
        cfg.set_unique_threshold(usize::from(*x))?
    }

    if let Some(x) = m.get_one::<RankMethod>("rank_method") {
        cfg.set_rank_method(*x)
    }

    if let Some(p) = m.get_one::<PathBuf>("tmp_dir") {
        cfg.set_tmp_dir(p)
    }

    if let Some(p) = m.get_one::<PathBuf>("output_dir") {
        cfg.set_output_dir(p)
    }

    cfg.set_output_prefix(
        m.get_one::<String>("output_prefix")
            .expect("Missing default output prefix"),
    );

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn experiment_file(dir: &std::path::Path) -> PathBuf {
        let p = dir.join("exp.tsv");
        fs::write(
            &p,
            "e1\tgs://bucket\tlibpng\tafl\ne1\tgs://bucket\tsqlite\tafl\ne1\tgs://bucket\tsqlite\thonggfuzz\n",
        )
        .unwrap();
        p
    }

    #[test]
    fn cli_definition() {
        cli_model().debug_assert()
    }

    #[test]
    fn defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = experiment_file(dir.path());
        let m = cli_model()
            .try_get_matches_from(["fc_compare", p.to_str().unwrap()])
            .unwrap();
        let cfg = config_from_matches(&m).unwrap();
        assert_eq!(cfg.experiment().name(), "e1");
        assert_eq!(cfg.experiment().benchmarks().len(), 2);
        assert_eq!(cfg.unique_threshold(), 1);
        assert_eq!(cfg.rank_method(), RankMethod::AverageNormalizedScore);
        assert_eq!(cfg.output_prefix(), "fc");
        assert!(cfg.output_dir().is_none());
        assert!(cfg.tmp_dir().is_none());
        assert!(cfg.threads() >= 1);
    }

    #[test]
    fn options() {
        let dir = tempfile::tempdir().unwrap();
        let p = experiment_file(dir.path());
        let m = cli_model()
            .try_get_matches_from([
                "fc_compare",
                "-t",
                "3",
                "-u",
                "2",
                "-r",
                "Average-Rank",
                "-f",
                "/local/fs",
                "-b",
                "sqlite",
                "-d",
                "out",
                "-p",
                "cmp",
                "-T",
                "/scratch",
                p.to_str().unwrap(),
            ])
            .unwrap();
        let cfg = config_from_matches(&m).unwrap();
        assert_eq!(cfg.threads(), 3);
        assert_eq!(cfg.unique_threshold(), 2);
        assert_eq!(cfg.rank_method(), RankMethod::AverageRank);
        assert_eq!(cfg.experiment().filestore(), "/local/fs");
        assert_eq!(cfg.experiment().benchmarks().len(), 1);
        assert_eq!(cfg.output_dir(), Some(std::path::Path::new("out")));
        assert_eq!(cfg.tmp_dir(), Some(std::path::Path::new("/scratch")));
        assert_eq!(cfg.output_prefix(), "cmp");
    }

    #[test]
    fn bad_options() {
        assert!(cli_model()
            .try_get_matches_from(["fc_compare", "-u", "0", "exp.tsv"])
            .is_err());
        assert!(cli_model()
            .try_get_matches_from(["fc_compare", "-r", "median", "exp.tsv"])
            .is_err());

        let dir = tempfile::tempdir().unwrap();
        let p = experiment_file(dir.path());
        let m = cli_model()
            .try_get_matches_from(["fc_compare", "-b", "zlib", p.to_str().unwrap()])
            .unwrap();
        assert!(config_from_matches(&m).is_err());
    }
}
