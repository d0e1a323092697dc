//! Compatibility gate around the metadata subsystem
//!
//! The gate moves once from `Uninitialized` to either `Available` (store found,
//! opened, schema recognized, index built) or `Unavailable`. Whatever goes wrong on
//! the way is logged a single time and turns metadata off for the run; lookups then
//! return [`MatchResult::NoMetadata`] for every entry.

use crate::core::error::MetadataError;
use crate::core::manifest::ManifestEntry;
use crate::metadata::index::{
    build_index, store_statistics, IndexOptions, IndexStats, MetadataIndex, StoreStatistics,
};
use crate::metadata::matcher::{lookup, MatchEngine, MatchResult};
use crate::metadata::path_key::MediaRoot;
use crate::metadata::schema::probe_store;
use log::{debug, info, warn};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// State of the metadata subsystem for this run
#[derive(Debug)]
pub enum GateState {
    Uninitialized,
    Available(MetadataIndex),
    Unavailable(MetadataError),
}

/// Owner of the run's metadata index
#[derive(Debug)]
pub struct MetadataGate {
    state: GateState,
    root: MediaRoot,
    store_statistics: Option<StoreStatistics>,
}

/// Open Photos.sqlite read-only
pub fn open_store(path: &Path) -> Result<Connection, MetadataError> {
    if !path.is_file() {
        return Err(MetadataError::StoreNotFound(path.display().to_string()));
    }

    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| MetadataError::StoreUnreadable(format!("{}: {}", path.display(), e)))
}

/// Open, probe and index a store. The connection is closed before returning.
fn load_store(
    path: &Path,
    options: &IndexOptions,
) -> Result<(MetadataIndex, StoreStatistics), MetadataError> {
    let conn = open_store(path)?;
    let schema = probe_store(&conn)?;
    info!(
        "Photos.sqlite schema: {} ({})",
        schema.variant.name, schema.variant.os_versions
    );

    let index = build_index(&conn, &schema, options)?;
    let statistics = store_statistics(&conn, &schema)?;
    Ok((index, statistics))
}

/// Warn about index results that leave exported files without metadata
fn warn_on_index_stats(stats: &IndexStats) {
    if stats.anomalies() > 0 {
        warn!(
            "Photos.sqlite: {} record anomalies while indexing \
             (run with --log-level debug for details)",
            stats.anomalies()
        );
    }
    if stats.cloud_only_excluded > 0 {
        warn!(
            "Photos.sqlite: {} assets excluded as cloud-only; their files get no metadata",
            stats.cloud_only_excluded
        );
    }
    if stats.indexed == 0 && stats.rows_scanned > 0 {
        warn!(
            "Photos.sqlite: none of {} asset rows were indexed; \
             check metadata.local_cloud_states",
            stats.rows_scanned
        );
    }
}

impl MetadataGate {
    pub fn new(root: MediaRoot) -> Self {
        Self {
            state: GateState::Uninitialized,
            root,
            store_statistics: None,
        }
    }

    /// Try to bring metadata online from a located store.
    ///
    /// `store` is the result of locating Photos.sqlite in the backup. Only the first
    /// call has any effect.
    pub fn initialize(
        &mut self,
        store: Result<PathBuf, MetadataError>,
        options: &IndexOptions,
    ) -> &GateState {
        if !matches!(self.state, GateState::Uninitialized) {
            debug!("Metadata gate already initialized; ignoring");
            return &self.state;
        }

        match store.and_then(|path| load_store(&path, options)) {
            Ok((index, statistics)) => {
                warn_on_index_stats(index.stats());
                self.store_statistics = Some(statistics);
                self.state = GateState::Available(index);
            }
            Err(reason) => self.mark_unavailable(reason),
        }

        &self.state
    }

    /// Turn metadata off for the run without touching the store
    pub fn disable(&mut self) {
        if matches!(self.state, GateState::Uninitialized) {
            self.mark_unavailable(MetadataError::Disabled);
        }
    }

    fn mark_unavailable(&mut self, reason: MetadataError) {
        match reason {
            MetadataError::Disabled => info!("Photos metadata enrichment disabled"),
            ref other => warn!(
                "Photos metadata unavailable: {}. Files will be exported without metadata.",
                other
            ),
        }
        self.state = GateState::Unavailable(reason);
    }

    pub fn state(&self) -> &GateState {
        &self.state
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, GateState::Available(_))
    }

    pub fn index(&self) -> Option<&MetadataIndex> {
        match &self.state {
            GateState::Available(index) => Some(index),
            _ => None,
        }
    }

    pub fn unavailable_reason(&self) -> Option<&MetadataError> {
        match &self.state {
            GateState::Unavailable(reason) => Some(reason),
            _ => None,
        }
    }

    pub fn store_statistics(&self) -> Option<&StoreStatistics> {
        self.store_statistics.as_ref()
    }

    pub fn root(&self) -> &MediaRoot {
        &self.root
    }

    /// Metadata for one entry; always `NoMetadata` unless the gate is available
    pub fn lookup(&self, entry: &ManifestEntry) -> MatchResult<'_> {
        match &self.state {
            GateState::Available(index) => lookup(index, &self.root, entry),
            _ => MatchResult::NoMetadata,
        }
    }

    /// A counting match engine, when metadata is available
    pub fn engine(&self) -> Option<MatchEngine<'_>> {
        self.index()
            .map(|index| MatchEngine::new(index, self.root.clone()))
    }
}

impl Default for MetadataGate {
    fn default() -> Self {
        Self::new(MediaRoot::default())
    }
}
