//! Photos.sqlite schema variants and the prober that picks one
//!
//! The Photos library is a Core Data store whose entity tables were renamed across
//! iOS releases (`ZGENERICASSET` became `ZASSET` in iOS 14). Each known layout is a
//! [`SchemaVariant`] constant; supporting a new release means adding one constant to
//! [`KNOWN_VARIANTS`].
//!
//! Probing is a pure function of a [`StoreCatalog`] snapshot, so it can be tested
//! without a database.

use crate::core::error::MetadataError;
use log::debug;
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet};

/// One recognized table/column layout of Photos.sqlite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaVariant {
    pub name: &'static str,
    pub os_versions: &'static str,
    pub asset_table: &'static str,
    pub attributes_table: &'static str,
    pub pk_column: &'static str,
    pub filename_column: &'static str,
    pub directory_column: &'static str,
    pub date_column: &'static str,
    pub latitude_column: &'static str,
    pub longitude_column: &'static str,
    pub attributes_foreign_key: &'static str,
    pub trashed_column: &'static str,
    pub cloud_state_column: &'static str,
    pub favorite_column: &'static str,
    pub attributes_pk_column: &'static str,
    pub exif_timestamp_column: &'static str,
    pub timezone_name_column: &'static str,
    pub timezone_offset_column: &'static str,
}

/// iOS 14 and later
pub const MODERN: SchemaVariant = SchemaVariant {
    name: "modern",
    os_versions: "iOS 14+",
    asset_table: "ZASSET",
    attributes_table: "ZADDITIONALASSETATTRIBUTES",
    pk_column: "Z_PK",
    filename_column: "ZFILENAME",
    directory_column: "ZDIRECTORY",
    date_column: "ZDATECREATED",
    latitude_column: "ZLATITUDE",
    longitude_column: "ZLONGITUDE",
    attributes_foreign_key: "ZADDITIONALATTRIBUTES",
    trashed_column: "ZTRASHEDSTATE",
    cloud_state_column: "ZCLOUDLOCALSTATE",
    favorite_column: "ZFAVORITE",
    attributes_pk_column: "Z_PK",
    exif_timestamp_column: "ZEXIFTIMESTAMPSTRING",
    timezone_name_column: "ZTIMEZONENAME",
    timezone_offset_column: "ZTIMEZONEOFFSET",
};

/// iOS 11 to 13
pub const LEGACY: SchemaVariant = SchemaVariant {
    name: "legacy",
    os_versions: "iOS 11-13",
    asset_table: "ZGENERICASSET",
    ..MODERN
};

/// Known variants, newest first
pub const KNOWN_VARIANTS: &[SchemaVariant] = &[MODERN, LEGACY];

/// Snapshot of the store catalog: table name -> column names, upper-cased
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreCatalog {
    tables: BTreeMap<String, BTreeSet<String>>,
}

impl StoreCatalog {
    /// Read the catalog of an open store
    pub fn read(conn: &Connection) -> rusqlite::Result<Self> {
        let mut stmt = conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut columns_stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
        let mut catalog = StoreCatalog::default();
        for name in names {
            let columns = columns_stmt
                .query_map([&name], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            catalog.add_table(&name, columns.iter().map(String::as_str));
        }

        Ok(catalog)
    }

    /// Add a table with its columns
    pub fn add_table<'a, I>(&mut self, table: &str, columns: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.tables.insert(
            table.to_ascii_uppercase(),
            columns.into_iter().map(|c| c.to_ascii_uppercase()).collect(),
        );
    }

    /// Builder-style [`add_table`](Self::add_table)
    pub fn with_table(mut self, table: &str, columns: &[&str]) -> Self {
        self.add_table(table, columns.iter().copied());
        self
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(&table.to_ascii_uppercase())
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.tables
            .get(&table.to_ascii_uppercase())
            .is_some_and(|cols| cols.contains(&column.to_ascii_uppercase()))
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}

/// A selected variant plus which of its optional parts exist in the opened store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSchema {
    pub variant: SchemaVariant,
    asset_columns: BTreeSet<&'static str>,
    attribute_columns: BTreeSet<&'static str>,
    attributes_joinable: bool,
}

impl ResolvedSchema {
    fn resolve(variant: SchemaVariant, catalog: &StoreCatalog) -> Self {
        let asset_columns = [
            variant.date_column,
            variant.latitude_column,
            variant.longitude_column,
            variant.attributes_foreign_key,
            variant.trashed_column,
            variant.cloud_state_column,
            variant.favorite_column,
        ]
        .into_iter()
        .filter(|c| catalog.has_column(variant.asset_table, c))
        .collect::<BTreeSet<_>>();

        let attributes_joinable = asset_columns.contains(variant.attributes_foreign_key)
            && catalog.has_column(variant.attributes_table, variant.attributes_pk_column);

        let attribute_columns = if attributes_joinable {
            [
                variant.exif_timestamp_column,
                variant.timezone_name_column,
                variant.timezone_offset_column,
            ]
            .into_iter()
            .filter(|c| catalog.has_column(variant.attributes_table, c))
            .collect()
        } else {
            BTreeSet::new()
        };

        ResolvedSchema {
            variant,
            asset_columns,
            attribute_columns,
            attributes_joinable,
        }
    }

    /// Whether an optional asset table column exists
    pub fn has_asset_column(&self, column: &str) -> bool {
        self.asset_columns.contains(column)
    }

    /// Whether an optional attributes table column exists (and the join is possible)
    pub fn has_attribute_column(&self, column: &str) -> bool {
        self.attribute_columns.contains(column)
    }

    /// Whether the attributes table can be joined at all
    pub fn attributes_joinable(&self) -> bool {
        self.attributes_joinable
    }

    /// SQL expression for an asset column, or `NULL` when it does not exist
    pub(crate) fn asset_expr(&self, alias: &str, column: &str) -> String {
        if self.has_asset_column(column) {
            format!("{}.{}", alias, column)
        } else {
            "NULL".to_string()
        }
    }

    /// SQL expression for an attributes column, or `NULL` when it does not exist
    pub(crate) fn attribute_expr(&self, alias: &str, column: &str) -> String {
        if self.has_attribute_column(column) {
            format!("{}.{}", alias, column)
        } else {
            "NULL".to_string()
        }
    }

    /// Optional columns of the variant that the store lacks, as `TABLE.COLUMN`
    pub fn missing_optional_columns(&self) -> Vec<String> {
        let v = &self.variant;
        let mut missing: Vec<String> = [
            v.date_column,
            v.latitude_column,
            v.longitude_column,
            v.attributes_foreign_key,
            v.trashed_column,
            v.cloud_state_column,
            v.favorite_column,
        ]
        .into_iter()
        .filter(|c| !self.has_asset_column(c))
        .map(|c| format!("{}.{}", v.asset_table, c))
        .collect();

        if self.attributes_joinable {
            missing.extend(
                [
                    v.exif_timestamp_column,
                    v.timezone_name_column,
                    v.timezone_offset_column,
                ]
                .into_iter()
                .filter(|c| !self.has_attribute_column(c))
                .map(|c| format!("{}.{}", v.attributes_table, c)),
            );
        } else {
            missing.push(v.attributes_table.to_string());
        }

        missing
    }
}

/// Check the identity columns a variant cannot do without
fn supports(variant: &SchemaVariant, catalog: &StoreCatalog) -> Result<(), String> {
    if !catalog.has_table(variant.asset_table) {
        return Err(format!("no {} table", variant.asset_table));
    }

    let missing: Vec<&str> = [
        variant.pk_column,
        variant.filename_column,
        variant.directory_column,
    ]
    .into_iter()
    .filter(|c| !catalog.has_column(variant.asset_table, c))
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(format!(
            "{} lacks {}",
            variant.asset_table,
            missing.join(", ")
        ))
    }
}

/// Select the newest known variant the catalog supports
pub fn probe_schema(catalog: &StoreCatalog) -> Result<ResolvedSchema, MetadataError> {
    let mut reasons = Vec::new();

    for variant in KNOWN_VARIANTS {
        match supports(variant, catalog) {
            Ok(()) => {
                let resolved = ResolvedSchema::resolve(*variant, catalog);
                debug!(
                    "Schema variant '{}' ({}) selected",
                    variant.name, variant.os_versions
                );
                return Ok(resolved);
            }
            Err(reason) => {
                debug!("Schema variant '{}' rejected: {}", variant.name, reason);
                reasons.push(format!("{}: {}", variant.name, reason));
            }
        }
    }

    Err(MetadataError::SchemaUnsupported(reasons.join("; ")))
}

/// Read the catalog of an open store and probe it
pub fn probe_store(conn: &Connection) -> Result<ResolvedSchema, MetadataError> {
    let catalog = StoreCatalog::read(conn)?;
    if catalog.table_count() == 0 {
        return Err(MetadataError::StoreUnreadable(
            "store contains no tables".to_string(),
        ));
    }
    probe_schema(&catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSET_COLUMNS: &[&str] = &[
        "Z_PK",
        "ZFILENAME",
        "ZDIRECTORY",
        "ZDATECREATED",
        "ZLATITUDE",
        "ZLONGITUDE",
        "ZADDITIONALATTRIBUTES",
        "ZTRASHEDSTATE",
        "ZCLOUDLOCALSTATE",
        "ZFAVORITE",
    ];

    const ATTRIBUTE_COLUMNS: &[&str] = &[
        "Z_PK",
        "ZEXIFTIMESTAMPSTRING",
        "ZTIMEZONENAME",
        "ZTIMEZONEOFFSET",
    ];

    #[test]
    fn test_modern_store_selects_modern() {
        let catalog = StoreCatalog::default()
            .with_table("ZASSET", ASSET_COLUMNS)
            .with_table("ZADDITIONALASSETATTRIBUTES", ATTRIBUTE_COLUMNS);

        let schema = probe_schema(&catalog).unwrap();
        assert_eq!(schema.variant.name, "modern");
        assert!(schema.attributes_joinable());
        assert!(schema.missing_optional_columns().is_empty());
    }

    #[test]
    fn test_generic_asset_only_selects_legacy() {
        let catalog = StoreCatalog::default()
            .with_table("ZGENERICASSET", ASSET_COLUMNS)
            .with_table("ZADDITIONALASSETATTRIBUTES", ATTRIBUTE_COLUMNS);

        let schema = probe_schema(&catalog).unwrap();
        assert_eq!(schema.variant, LEGACY);
        assert_eq!(schema.variant.asset_table, "ZGENERICASSET");
    }

    #[test]
    fn test_newest_variant_wins_when_both_present() {
        let catalog = StoreCatalog::default()
            .with_table("ZGENERICASSET", ASSET_COLUMNS)
            .with_table("ZASSET", ASSET_COLUMNS);

        assert_eq!(probe_schema(&catalog).unwrap().variant.name, "modern");
    }

    #[test]
    fn test_unknown_store_is_unsupported() {
        let catalog = StoreCatalog::default().with_table("ZMOMENT", &["Z_PK", "ZTITLE"]);

        let err = probe_schema(&catalog).unwrap_err();
        match err {
            MetadataError::SchemaUnsupported(reason) => {
                assert!(reason.contains("ZASSET"));
                assert!(reason.contains("ZGENERICASSET"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_identity_column_disqualifies() {
        let catalog =
            StoreCatalog::default().with_table("ZASSET", &["Z_PK", "ZFILENAME", "ZDATECREATED"]);

        assert!(matches!(
            probe_schema(&catalog),
            Err(MetadataError::SchemaUnsupported(_))
        ));
    }

    #[test]
    fn test_missing_optional_columns_tolerated() {
        let catalog = StoreCatalog::default().with_table(
            "zasset",
            &["z_pk", "zfilename", "zdirectory", "zdatecreated"],
        );

        let schema = probe_schema(&catalog).unwrap();
        assert_eq!(schema.variant.name, "modern");
        assert!(schema.has_asset_column("ZDATECREATED"));
        assert!(!schema.has_asset_column("ZTRASHEDSTATE"));
        assert!(!schema.attributes_joinable());
        assert_eq!(schema.asset_expr("a", "ZLATITUDE"), "NULL");
        assert_eq!(schema.asset_expr("a", "ZDATECREATED"), "a.ZDATECREATED");

        let missing = schema.missing_optional_columns();
        assert!(missing.contains(&"ZASSET.ZTRASHEDSTATE".to_string()));
        assert!(missing.contains(&"ZADDITIONALASSETATTRIBUTES".to_string()));
    }

    #[test]
    fn test_catalog_read_from_connection() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE ZGENERICASSET (Z_PK INTEGER PRIMARY KEY, ZFILENAME TEXT, ZDIRECTORY TEXT);",
        )
        .unwrap();

        let catalog = StoreCatalog::read(&conn).unwrap();
        assert!(catalog.has_table("ZGENERICASSET"));
        assert!(catalog.has_column("ZGENERICASSET", "zdirectory"));
        assert_eq!(probe_store(&conn).unwrap().variant.name, "legacy");
    }

    #[test]
    fn test_empty_store_is_unreadable() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            probe_store(&conn),
            Err(MetadataError::StoreUnreadable(_))
        ));
    }
}
