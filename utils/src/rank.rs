//! Ranking reductions over a score table
//!
//! The table is given as rows (one per benchmark) of scores, with one column per
//! fuzzer.  Each reduction returns one value per column.

use std::{cmp::Ordering, fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankMethod {
    AverageNormalizedScore,
    AverageRank,
}

impl FromStr for RankMethod {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "average-normalized-score" | "score" => Ok(Self::AverageNormalizedScore),
            "average-rank" | "rank" => Ok(Self::AverageRank),
            _ => Err("no match"),
        }
    }
}

impl fmt::Display for RankMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AverageNormalizedScore => f.write_str("average-normalized-score"),
            Self::AverageRank => f.write_str("average-rank"),
        }
    }
}

impl RankMethod {
    /// Reduce the table to one value per column
    pub fn reduce<R: AsRef<[f64]>>(&self, rows: &[R], n_cols: usize) -> Vec<f64> {
        match self {
            Self::AverageNormalizedScore => average_normalized_score(rows, n_cols),
            Self::AverageRank => average_rank(rows, n_cols),
        }
    }

    pub fn higher_is_better(&self) -> bool {
        matches!(self, Self::AverageNormalizedScore)
    }
}

/// Each row is scaled so that its maximum is 100, and the scaled values are averaged
/// down the columns.  Rows with no positive values cannot be scaled and are left out
/// of the average.  If no row can be scaled every column gets 0.
pub fn average_normalized_score<R: AsRef<[f64]>>(rows: &[R], n_cols: usize) -> Vec<f64> {
    let mut sum = vec![0.0; n_cols];
    let mut n = 0;
    for row in rows.iter().map(|r| r.as_ref()) {
        let max = row.iter().copied().fold(0.0, f64::max);
        if max > 0.0 {
            n += 1;
            for (s, x) in sum.iter_mut().zip(row) {
                *s += 100.0 * x / max
            }
        }
    }
    col_means(sum, n)
}

/// Columns are ranked within each row (highest value gets rank 1, ties get the
/// average of the ranks they span) and the ranks are averaged down the columns.
pub fn average_rank<R: AsRef<[f64]>>(rows: &[R], n_cols: usize) -> Vec<f64> {
    let mut sum = vec![0.0; n_cols];
    for row in rows.iter().map(|r| r.as_ref()) {
        for (s, r) in sum.iter_mut().zip(ranks_descending(row)) {
            *s += r
        }
    }
    col_means(sum, rows.len())
}

fn col_means(mut sum: Vec<f64>, n: usize) -> Vec<f64> {
    if n > 0 {
        let n = n as f64;
        for s in sum.iter_mut() {
            *s /= n
        }
    }
    sum
}

/// Rank 1 for the largest value; tied values share the mean of their ranks
pub fn ranks_descending(v: &[f64]) -> Vec<f64> {
    let mut ix: Vec<usize> = (0..v.len()).collect();
    ix.sort_by(|a, b| v[*b].partial_cmp(&v[*a]).unwrap_or(Ordering::Equal));
    let mut ranks = vec![0.0; v.len()];
    let mut i = 0;
    while i < ix.len() {
        let mut j = i + 1;
        while j < ix.len() && v[ix[j]] == v[ix[i]] {
            j += 1
        }
        // Positions i..j are tied and span ranks i+1..=j
        let r = (i + 1 + j) as f64 * 0.5;
        for k in &ix[i..j] {
            ranks[*k] = r
        }
        i = j;
    }
    ranks
}
