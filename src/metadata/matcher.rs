//! Match manifest entries against the metadata index
//!
//! A lookup never fails: entries outside the media root, entries without a usable key
//! and plain misses all come back as [`MatchResult::NoMetadata`].

use crate::core::manifest::ManifestEntry;
use crate::metadata::index::{MetadataIndex, MetadataRecord};
use crate::metadata::path_key::MediaRoot;
use serde::Serialize;

/// Outcome of matching one manifest entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchResult<'a> {
    Matched(&'a MetadataRecord),
    NoMetadata,
}

impl<'a> MatchResult<'a> {
    pub fn record(&self) -> Option<&'a MetadataRecord> {
        match *self {
            MatchResult::Matched(record) => Some(record),
            MatchResult::NoMetadata => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, MatchResult::Matched(_))
    }

    /// The five metadata columns of the CSV export
    pub fn columns(&self) -> MetadataColumns {
        match self {
            MatchResult::Matched(record) => MetadataColumns::from_record(record),
            MatchResult::NoMetadata => MetadataColumns::default(),
        }
    }
}

/// Metadata fields as written to the CSV file; empty strings mean "unknown"
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetadataColumns {
    pub capture_time: String,
    pub latitude: String,
    pub longitude: String,
    pub timezone: String,
    pub is_favorite: bool,
}

impl MetadataColumns {
    fn from_record(record: &MetadataRecord) -> Self {
        let decimal = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        Self {
            capture_time: record
                .capture_time
                .map(|t| t.to_iso_string())
                .unwrap_or_default(),
            latitude: decimal(record.latitude),
            longitude: decimal(record.longitude),
            timezone: record.timezone_name.clone().unwrap_or_default(),
            is_favorite: record.is_favorite,
        }
    }
}

/// Look up the metadata of one manifest entry
pub fn lookup<'a>(
    index: &'a MetadataIndex,
    root: &MediaRoot,
    entry: &ManifestEntry,
) -> MatchResult<'a> {
    if !root.contains(&entry.relative_path) {
        return MatchResult::NoMetadata;
    }

    root.derive_key(&entry.relative_path)
        .and_then(|key| index.get(&key))
        .map_or(MatchResult::NoMetadata, MatchResult::Matched)
}

/// Per-run matching counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchStats {
    pub matched: usize,
    pub unmatched: usize,
    pub outside_root: usize,
}

/// An index paired with its media root, counting outcomes as it goes
#[derive(Debug)]
pub struct MatchEngine<'a> {
    index: &'a MetadataIndex,
    root: MediaRoot,
    stats: MatchStats,
}

impl<'a> MatchEngine<'a> {
    pub fn new(index: &'a MetadataIndex, root: MediaRoot) -> Self {
        Self {
            index,
            root,
            stats: MatchStats::default(),
        }
    }

    pub fn lookup(&mut self, entry: &ManifestEntry) -> MatchResult<'a> {
        if !self.root.contains(&entry.relative_path) {
            self.stats.outside_root += 1;
            return MatchResult::NoMetadata;
        }

        let result = lookup(self.index, &self.root, entry);
        if result.is_matched() {
            self.stats.matched += 1;
        } else {
            self.stats.unmatched += 1;
        }
        result
    }

    pub fn stats(&self) -> &MatchStats {
        &self.stats
    }
}
