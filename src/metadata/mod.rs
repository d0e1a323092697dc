//! Photos library metadata enrichment
//!
//! Correlates Manifest.db entries with asset records in the backup's Photos.sqlite,
//! whose schema differs between iOS releases.
//!
//! # Submodules
//!
//! - `schema` - Known schema variants and the catalog prober
//! - `timestamp` - Core Data epoch and EXIF timestamp normalization
//! - `path_key` - Canonical `directory/filename` join keys
//! - `index` - The in-memory metadata index and store statistics
//! - `matcher` - Per-entry lookups and CSV metadata columns
//! - `gate` - Run-wide availability of the whole subsystem
//!
//! Metadata is strictly additive: nothing in this module aborts an extraction.

pub mod gate;
pub mod index;
pub mod matcher;
pub mod path_key;
pub mod schema;
pub mod timestamp;

pub use gate::{GateState, MetadataGate};
pub use index::{build_index, IndexOptions, MetadataIndex, MetadataRecord, StoreStatistics};
pub use matcher::{lookup, MatchEngine, MatchResult, MetadataColumns};
pub use path_key::{MediaRoot, PathKey};
pub use schema::{probe_schema, probe_store, ResolvedSchema, SchemaVariant};
