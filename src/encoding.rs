use crate::{Error, Result};
use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use std::{
    collections::{btree_map, BTreeMap},
    fs,
    path::Path,
};

/// Marker of the summary line listing how often each encoding was lifted.
pub const ENCODING_COUNTS_MARKER: &str = "encoding counts: ";

/// Prefix shared by the encoding names that come in lowercase-suffixed variant families.
pub const CLASSIC_PREFIX: &str = "classic_";

lazy_static! {
    static ref CLASSIC_FAMILY: Regex = Regex::new(r"^classic_(\p{Lu}*)").unwrap();
}

/// Fold an encoding name into its canonical histogram key.
///
/// Names under `classic_` are collapsed to the run of uppercase letters directly after the prefix,
/// so `classic_ADDWrs` and `classic_ADDXri` both count towards `classic_ADD`. Other names are
/// returned unchanged.
pub fn canonical_encoding(name: &str) -> String {
    match CLASSIC_FAMILY.captures(name) {
        Some(captures) => format!("{}{}", CLASSIC_PREFIX, &captures[1]),
        None => name.to_owned(),
    }
}

/// Canonical encoding name to number of occurrences.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodingHistogram(BTreeMap<String, u64>);

impl EncodingHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `count` occurrences of `name`, canonicalizing it first.
    pub fn add(&mut self, name: &str, count: u64) {
        *self.0.entry(canonical_encoding(name)).or_default() += count;
    }

    /// Count for a canonical key, zero if it never occurred.
    pub fn get(&self, key: &str) -> u64 {
        self.0.get(key).copied().unwrap_or(0)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, u64> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, u64)> for EncodingHistogram {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        let mut histogram = Self::new();
        for (name, count) in iter {
            histogram.add(&name, count);
        }
        histogram
    }
}

/// What the transformed-run log says about itself: how it was invoked and which encodings it hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingSummary {
    pub command_line: String,
    pub histogram: EncodingHistogram,
}

impl EncodingSummary {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(Error::io(path))?;
        Self::extract(path, &text)
    }

    /// Scan a transformed-run log. The first non-empty line is the command line, and only the
    /// first `encoding counts: ` line is read; scanning stops there.
    pub fn extract(path: &Path, text: &str) -> Result<Self> {
        let mut command_line: Option<&str> = None;
        let mut histogram = EncodingHistogram::new();
        let mut found_counts = false;
        for line in text.lines().map(str::trim) {
            if command_line.is_none() && !line.is_empty() {
                command_line = Some(line);
            }
            if let Some(payload) = line.strip_prefix(ENCODING_COUNTS_MARKER) {
                for term in payload.split(',') {
                    // The list is written with a trailing comma, so empty terms are expected
                    let (name, count) = match term.split_once('=') {
                        Some(pair) => pair,
                        None => continue,
                    };
                    let count = count.trim().parse::<u64>().map_err(|_| Error::BadEncodingCount {
                        path: path.to_owned(),
                        term: term.to_owned(),
                    })?;
                    histogram.add(name.trim(), count);
                }
                found_counts = true;
                break;
            }
        }

        let command_line = command_line.ok_or_else(|| Error::MissingCommandLine(path.to_owned()))?;
        if !found_counts {
            warn!("{}: no encoding counts line", path.display());
        }
        Ok(Self { command_line: command_line.to_owned(), histogram })
    }
}
