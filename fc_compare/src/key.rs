use std::{fmt, str::FromStr, sync::Arc};

/// Name of a fuzzer or benchmark.  Shared between the many tables that refer to it
pub type Name = Arc<str>;

/// Check that a fuzzer or benchmark name can be used in keys and file names.
/// A name must be a single path component
pub fn check_name(s: &str) -> anyhow::Result<()> {
    if s.is_empty() {
        Err(anyhow!("Empty name"))
    } else if s.contains(char::is_whitespace) {
        Err(anyhow!("Name '{}' contains white space", s))
    } else if s.contains(|c: char| c == '/' || c == '\\') {
        Err(anyhow!("Name '{}' contains a path separator", s))
    } else if s == "." || s == ".." {
        Err(anyhow!("Name '{}' is not allowed", s))
    } else {
        Ok(())
    }
}

/// Identity of the coverage data for a fuzzer on a benchmark
///
/// The string form is "<fuzzer> <benchmark>".  Names are checked on construction so
/// that this is always reversible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FuzzerBenchmarkKey {
    fuzzer: Name,
    benchmark: Name,
}

impl FuzzerBenchmarkKey {
    pub fn new(fuzzer: &Name, benchmark: &Name) -> anyhow::Result<Self> {
        check_name(fuzzer)?;
        check_name(benchmark)?;
        Ok(Self {
            fuzzer: Arc::clone(fuzzer),
            benchmark: Arc::clone(benchmark),
        })
    }

    pub fn fuzzer(&self) -> &Name {
        &self.fuzzer
    }

    pub fn benchmark(&self) -> &Name {
        &self.benchmark
    }
}

impl fmt::Display for FuzzerBenchmarkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.fuzzer, self.benchmark)
    }
}

impl FromStr for FuzzerBenchmarkKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut it = s.split_whitespace();
        match (it.next(), it.next(), it.next()) {
            (Some(fuzzer), Some(benchmark), None) => {
                Self::new(&Arc::from(fuzzer), &Arc::from(benchmark))
            }
            _ => Err(anyhow!("Malformed fuzzer benchmark key '{}'", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_string_form() {
        let k = FuzzerBenchmarkKey::new(&Arc::from("afl"), &Arc::from("libpng")).unwrap();
        assert_eq!(k.to_string(), "afl libpng");
        let k1: FuzzerBenchmarkKey = "afl libpng".parse().unwrap();
        assert_eq!(k, k1);
        assert_eq!(k1.fuzzer().as_ref(), "afl");
        assert_eq!(k1.benchmark().as_ref(), "libpng");
    }

    #[test]
    fn decode_splits_on_whitespace_run() {
        let k: FuzzerBenchmarkKey = "honggfuzz \t  sqlite3".parse().unwrap();
        assert_eq!(k.to_string(), "honggfuzz sqlite3");
    }

    #[test]
    fn malformed_keys() {
        assert!("afl".parse::<FuzzerBenchmarkKey>().is_err());
        assert!("".parse::<FuzzerBenchmarkKey>().is_err());
        assert!("afl lib png".parse::<FuzzerBenchmarkKey>().is_err());
    }

    #[test]
    fn names_with_spaces_rejected() {
        assert!(FuzzerBenchmarkKey::new(&Arc::from("afl plus"), &Arc::from("x")).is_err());
        assert!(FuzzerBenchmarkKey::new(&Arc::from("afl"), &Arc::from("")).is_err());
        assert!(check_name("aflplusplus_optimal").is_ok());
    }

    #[test]
    fn names_must_be_one_path_component() {
        for s in ["../evil", "a/b", "/abs", "dir/", ".", ".."] {
            assert!(check_name(s).is_err(), "{} accepted", s);
        }
        assert!(check_name("..hidden").is_ok());
        assert!(check_name("libpng-1.6.38").is_ok());
        assert!("../evil libpng".parse::<FuzzerBenchmarkKey>().is_err());
        assert!("afl ..".parse::<FuzzerBenchmarkKey>().is_err());
    }
}
