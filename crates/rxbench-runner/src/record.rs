use crate::error::BenchError;
use crate::params::{Simd, Toggle};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Index;

/// Column order of every serialized record.
pub const RECORD_FIELDS: [&str; 4] = ["tipinner", "siterepeats", "simd", "time"];

/// Dataset name to that dataset's records. Datasets keep the order they
/// were inserted in, which is the configured dataset order, and serialize as
/// a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    entries: Vec<(String, Vec<TimingRecord>)>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the records of an existing dataset in place, otherwise
    /// appends the dataset.
    pub fn insert(&mut self, dataset: String, records: Vec<TimingRecord>) {
        match self.entries.iter_mut().find(|(name, _)| *name == dataset) {
            Some((_, existing)) => *existing = records,
            None => self.entries.push((dataset, records)),
        }
    }

    pub fn get(&self, dataset: &str) -> Option<&[TimingRecord]> {
        self.entries
            .iter()
            .find(|(name, _)| name == dataset)
            .map(|(_, records)| records.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[TimingRecord])> {
        self.entries
            .iter()
            .map(|(name, records)| (name.as_str(), records.as_slice()))
    }

    pub fn datasets(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Index<&str> for ResultSet {
    type Output = [TimingRecord];

    fn index(&self, dataset: &str) -> &Self::Output {
        match self.get(dataset) {
            Some(records) => records,
            None => panic!("no results for dataset '{}'", dataset),
        }
    }
}

impl Serialize for ResultSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, records) in &self.entries {
            map.serialize_entry(name, records)?;
        }
        map.end()
    }
}

struct ResultSetVisitor;

impl<'de> Visitor<'de> for ResultSetVisitor {
    type Value = ResultSet;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of dataset name to timing records")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ResultSet, A::Error> {
        let mut results = ResultSet::new();
        while let Some((name, records)) = access.next_entry::<String, Vec<TimingRecord>>()? {
            results.insert(name, records);
        }
        Ok(results)
    }
}

impl<'de> Deserialize<'de> for ResultSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ResultSetVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub tipinner: Toggle,
    pub siterepeats: Toggle,
    pub simd: Simd,
    /// Wall-clock seconds, or infinity when the log held no usable timing.
    #[serde(with = "seconds")]
    pub time: f64,
}

impl TimingRecord {
    /// Builds a record from decoded cell-name attributes. The attribute keys
    /// must be exactly the parameter columns.
    pub fn from_attributes(
        cell_name: &str,
        attrs: &BTreeMap<String, String>,
        time: f64,
    ) -> Result<Self, BenchError> {
        let expected: BTreeSet<&str> = RECORD_FIELDS[..3].iter().copied().collect();
        let found: BTreeSet<&str> = attrs.keys().map(|k| k.as_str()).collect();
        if expected != found {
            return Err(BenchError::SchemaMismatch {
                name: cell_name.to_string(),
                expected: RECORD_FIELDS[..3].join(", "),
                found: found.into_iter().collect::<Vec<_>>().join(", "),
            });
        }
        Ok(Self {
            tipinner: attrs["tipinner"].parse()?,
            siterepeats: attrs["siterepeats"].parse()?,
            simd: attrs["simd"].parse()?,
            time,
        })
    }

    pub fn time_label(&self) -> String {
        format_seconds(self.time)
    }

    /// Field values in `RECORD_FIELDS` order, as printed in reports.
    pub fn fields(&self) -> [String; 4] {
        [
            self.tipinner.to_string(),
            self.siterepeats.to_string(),
            self.simd.to_string(),
            self.time_label(),
        ]
    }
}

pub fn format_seconds(value: f64) -> String {
    if value.is_infinite() && value > 0.0 {
        "inf".to_string()
    } else {
        value.to_string()
    }
}

/// JSON has no infinity, so unparseable timings are written as `"inf"`.
/// Reading also accepts `"Infinity"` and `null`.
mod seconds {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_str(&super::format_seconds(*value))
        }
    }

    struct SecondsVisitor;

    impl<'de> Visitor<'de> for SecondsVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number of seconds, \"inf\" or null")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v.trim() {
                "inf" | "+inf" | "Infinity" | "infinity" => Ok(f64::INFINITY),
                other => other.parse::<f64>().map_err(E::custom),
            }
        }

        fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
            Ok(f64::INFINITY)
        }

        fn visit_none<E: de::Error>(self) -> Result<f64, E> {
            Ok(f64::INFINITY)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(SecondsVisitor)
    }
}
