//! Named parameter overrides for a single run ("VariableSet"), collections of
//! them read from a CSV sweep file ("VariableSets"), and the deterministic
//! fingerprint used to name per-variant output directories.

use std::fs;
use std::path::Path;

use crate::error::ConfigError;

/// A single named-override row, e.g. `{beta[2]: 0.95, progress[1]: 0.19}`.
///
/// Field order is insertion order; [`VariableSet::fingerprint`] sorts by name
/// so that equal overrides in different orders produce the same fingerprint.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableSet {
    values: Vec<(String, f64)>,
    repeat_index: u32,
}

impl VariableSet {
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            repeat_index: 1,
        }
    }

    pub fn with_repeat_index(mut self, index: u32) -> Self {
        self.repeat_index = index;
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        if let Some(slot) = self.values.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.values.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn repeat_index(&self) -> u32 {
        self.repeat_index
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Deterministic string identity of this override set. Equal regardless
    /// of insertion order; does not encode `repeat_index` unless
    /// `include_index` is set, so two repeats of the same variant share a
    /// fingerprint unless the caller asks to distinguish them.
    pub fn fingerprint(&self) -> String {
        self.fingerprint_with_index(false)
    }

    pub fn fingerprint_with_index(&self, include_index: bool) -> String {
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        let mut out = sorted
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(":");
        if include_index {
            out.push_str(&format!(":repeat={}", self.repeat_index));
        }
        out
    }
}

/// An ordered collection of [`VariableSet`]s, as read from a sweep file or
/// built programmatically.
#[derive(Debug, Clone, Default)]
pub struct VariableSets(Vec<VariableSet>);

impl VariableSets {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, set: VariableSet) {
        self.0.push(set);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&VariableSet> {
        self.0.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VariableSet> {
        self.0.iter()
    }

    /// Repeat the whole collection `k` times, cycling `repeat_index` from 1
    /// to `k` across the repetitions (so the result has `k * len()` entries).
    pub fn repeat(&self, k: u32) -> VariableSets {
        let mut out = Vec::with_capacity(self.0.len() * k as usize);
        for index in 1..=k {
            for set in &self.0 {
                out.push(set.clone().with_repeat_index(index));
            }
        }
        VariableSets(out)
    }

    /// Read a variable-sweep CSV file, selecting rows by 1-based line index
    /// (header excluded). Selection is order-independent: the same set of
    /// `lines` values (in any order, with any duplication) yields the same
    /// `VariableSets`, sorted ascending by line number.
    pub fn read_variables(path: impl AsRef<Path>, lines: &[usize]) -> Result<VariableSets, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
        let headers: Vec<String> = reader
            .headers()
            .map_err(|source| ConfigError::Csv {
                path: path.to_path_buf(),
                source,
            })?
            .iter()
            .map(str::to_string)
            .collect();

        let mut wanted: Vec<usize> = lines.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let records: Vec<csv::StringRecord> = reader
            .records()
            .collect::<Result<_, _>>()
            .map_err(|source| ConfigError::Csv {
                path: path.to_path_buf(),
                source,
            })?;

        let mut out = VariableSets::new();
        for &line in &wanted {
            if line == 0 || line > records.len() {
                return Err(ConfigError::OutOfRange {
                    field: "line",
                    value: line as f64,
                });
            }
            let record = &records[line - 1];
            let mut set = VariableSet::new();
            for (name, value) in headers.iter().zip(record.iter()) {
                let parsed: f64 = value.trim().parse().map_err(|_| ConfigError::OutOfRange {
                    field: "value",
                    value: f64::NAN,
                })?;
                set.insert(name.clone(), parsed);
            }
            out.push(set);
        }
        Ok(out)
    }
}
