use std::{collections::HashSet, io::Read};

use anyhow::Context;
use serde_json::Value;

/// A single element of a region as decoded from JSON.  The layout of a region is not
/// interpreted: the decoded values are stored in a canonical form so that regions can be
/// hashed and compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64), // Only for values > i64::MAX
    Float(u64), // Bit pattern (-0.0 is stored as 0.0)
    Str(Box<str>),
    List(Box<[Field]>),
    Map(Box<[(Box<str>, Field)]>),
}

impl From<&Value> for Field {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    let f = n.as_f64().unwrap_or(f64::NAN);
                    Self::Float(if f == 0.0 { 0 } else { f.to_bits() })
                }
            }
            Value::String(s) => Self::Str(s.as_str().into()),
            Value::Array(a) => Self::List(a.iter().map(Field::from).collect()),
            Value::Object(m) => Self::Map(
                m.iter()
                    .map(|(k, v)| (k.as_str().into(), Field::from(v)))
                    .collect(),
            ),
        }
    }
}

/// A covered code region (i.e., file id with start and end positions).
/// Regions are only ever compared for equality
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Region(Box<[Field]>);

#[cfg(test)]
impl Region {
    pub fn new<I: IntoIterator<Item = Field>>(fields: I) -> Self {
        Self(fields.into_iter().collect())
    }

    pub fn fields(&self) -> &[Field] {
        &self.0
    }
}

impl From<&Value> for Region {
    fn from(v: &Value) -> Self {
        match v {
            Value::Array(a) => Self(a.iter().map(Field::from).collect()),
            // Not expected, but a scalar is kept as a region with a single field
            _ => Self(Box::new([Field::from(v)])),
        }
    }
}

/// Regions covered by a fuzzer on a benchmark.  An empty set means either that
/// nothing was covered or that no data could be retrieved
pub type RegionSet = HashSet<Region>;

/// Read a JSON array of regions.  Duplicate regions are merged
pub fn read_regions<R: Read>(rdr: R) -> anyhow::Result<RegionSet> {
    let v: Vec<Value> =
        serde_json::from_reader(rdr).with_context(|| "Error parsing covered regions")?;
    let n = v.len();
    let set: RegionSet = v.iter().map(Region::from).collect();
    if set.len() < n {
        trace!("Removed {} duplicate regions", n - set.len());
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_are_deduplicated() {
        let s = read_regions(&b"[[0, 1, 2, 1, 9], [0, 1, 2, 1, 9], [3, 4, 5, 6, 7]]"[..]).unwrap();
        assert_eq!(s.len(), 2);
        assert!(s.contains(&Region::new(
            [0, 1, 2, 1, 9].iter().map(|x| Field::Int(*x))
        )));
    }

    #[test]
    fn empty_array() {
        assert!(read_regions(&b"[]"[..]).unwrap().is_empty());
    }

    #[test]
    fn invalid_json() {
        assert!(read_regions(&b"[[1, 2"[..]).is_err());
        assert!(read_regions(&b"{\"a\": 1}"[..]).is_err());
    }

    #[test]
    fn field_types_kept_distinct() {
        let s = read_regions(&br#"[[1, "a"], [1.0, "a"], ["1", "a"], [1, "a", null]]"#[..])
            .unwrap();
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn nested_values() {
        let s = read_regions(&br#"[[{"b": [1, 2], "a": true}], [{"a": true, "b": [1, 2]}]]"#[..])
            .unwrap();
        assert_eq!(s.len(), 1);
        let r = s.iter().next().unwrap();
        assert!(matches!(r.fields(), [Field::Map(_)]));
    }

    #[test]
    fn scalar_region() {
        let s = read_regions(&b"[7, 7, [7]]"[..]).unwrap();
        assert_eq!(s.len(), 1);
        assert!(s.contains(&Region::new([Field::Int(7)])));
    }

    #[test]
    fn large_and_float_numbers() {
        let s = read_regions(&b"[[18446744073709551615], [-0.0], [0.0], [2.5]]"[..]).unwrap();
        assert_eq!(s.len(), 3);
        assert!(s.contains(&Region::new([Field::UInt(u64::MAX)])));
        assert!(s.contains(&Region::new([Field::Float(2.5f64.to_bits())])));
    }
}
