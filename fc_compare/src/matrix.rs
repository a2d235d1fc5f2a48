use std::{fmt, io::Write};

use crate::key::Name;

/// Table with labelled rows and columns, stored in row major order.
/// Cells are addressed by label (position is only used internally)
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMatrix<T> {
    rows: Vec<Name>,
    cols: Vec<Name>,
    data: Vec<T>,
}

impl<T: Copy + Default> LabeledMatrix<T> {
    /// New matrix with all cells set to T::default()
    pub fn new(rows: Vec<Name>, cols: Vec<Name>) -> Self {
        let data = vec![T::default(); rows.len() * cols.len()];
        Self { rows, cols, data }
    }

    #[cfg(test)]
    pub fn row_labels(&self) -> &[Name] {
        &self.rows
    }

    pub fn col_labels(&self) -> &[Name] {
        &self.cols
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.cols.len()
    }

    fn row_idx(&self, row: &str) -> Option<usize> {
        self.rows.iter().position(|s| s.as_ref() == row)
    }

    fn col_idx(&self, col: &str) -> Option<usize> {
        self.cols.iter().position(|s| s.as_ref() == col)
    }

    #[cfg(test)]
    pub fn get(&self, row: &str, col: &str) -> Option<T> {
        let i = self.row_idx(row)?;
        let j = self.col_idx(col)?;
        Some(self.data[i * self.cols.len() + j])
    }

    pub fn set(&mut self, row: &str, col: &str, x: T) -> anyhow::Result<()> {
        let i = self
            .row_idx(row)
            .ok_or_else(|| anyhow!("Unknown row label {}", row))?;
        let j = self
            .col_idx(col)
            .ok_or_else(|| anyhow!("Unknown column label {}", col))?;
        self.set_at(i, j, x);
        Ok(())
    }

    pub(crate) fn set_at(&mut self, i: usize, j: usize, x: T) {
        let nc = self.cols.len();
        self.data[i * nc + j] = x
    }

    #[cfg(test)]
    pub fn row(&self, row: &str) -> Option<&[T]> {
        self.row_idx(row).map(|i| self.row_at(i))
    }

    fn row_at(&self, i: usize) -> &[T] {
        let nc = self.cols.len();
        &self.data[i * nc..(i + 1) * nc]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = (&Name, &[T])> {
        self.rows
            .iter()
            .enumerate()
            .map(move |(i, r)| (r, self.row_at(i)))
    }

    pub fn transpose(&self) -> Self {
        let (nr, nc) = (self.rows.len(), self.cols.len());
        let mut data = Vec::with_capacity(self.data.len());
        for j in 0..nc {
            for i in 0..nr {
                data.push(self.data[i * nc + j])
            }
        }
        Self {
            rows: self.cols.clone(),
            cols: self.rows.clone(),
            data,
        }
    }
}

impl<T: Copy + Default + fmt::Display> LabeledMatrix<T> {
    /// Tab separated output with a header line of column labels.  corner
    /// is the first entry of the header line
    pub fn write_tsv<W: Write>(&self, w: &mut W, corner: &str) -> std::io::Result<()> {
        write!(w, "{}", corner)?;
        for c in self.cols.iter() {
            write!(w, "\t{}", c)?
        }
        writeln!(w)?;
        for (r, v) in self.iter_rows() {
            write!(w, "{}", r)?;
            for x in v {
                write!(w, "\t{}", x)?
            }
            writeln!(w)?
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::tests::names;

    fn mat() -> LabeledMatrix<usize> {
        let mut m = LabeledMatrix::new(names(&["a", "b"]), names(&["x", "y", "z"]));
        let mut k = 0;
        for r in ["a", "b"] {
            for c in ["x", "y", "z"] {
                m.set(r, c, k).unwrap();
                k += 1;
            }
        }
        m
    }

    #[test]
    fn lookup_by_label() {
        let m = mat();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.n_cols(), 3);
        assert_eq!(m.get("a", "x"), Some(0));
        assert_eq!(m.get("b", "y"), Some(4));
        assert_eq!(m.get("c", "y"), None);
        assert_eq!(m.get("a", "w"), None);
        assert_eq!(m.row("b"), Some(&[3, 4, 5][..]));
        let mut m = m;
        assert!(m.set("q", "x", 1).is_err());
        assert!(m.set("a", "q", 1).is_err());
    }

    #[test]
    fn transpose() {
        let t = mat().transpose();
        assert_eq!(t.row_labels(), names(&["x", "y", "z"]).as_slice());
        assert_eq!(t.col_labels(), names(&["a", "b"]).as_slice());
        for r in ["a", "b"] {
            for c in ["x", "y", "z"] {
                assert_eq!(t.get(c, r), mat().get(r, c))
            }
        }
        assert_eq!(t.transpose(), mat());
    }

    #[test]
    fn empty_columns() {
        let m: LabeledMatrix<f64> = LabeledMatrix::new(names(&["a"]), Vec::new());
        let v: Vec<_> = m.iter_rows().collect();
        assert_eq!(v.len(), 1);
        assert!(v[0].1.is_empty());
        assert_eq!(m.transpose().n_rows(), 0);
    }

    #[test]
    fn tsv_output() {
        let mut w = Vec::new();
        mat().write_tsv(&mut w, "fuzzer").unwrap();
        assert_eq!(
            String::from_utf8(w).unwrap(),
            "fuzzer\tx\ty\tz\na\t0\t1\t2\nb\t3\t4\t5\n"
        );
    }
}
