//! Registry coverage of an observed extension collection.
//!
//! A collection is a CSV export of extensions actually seen in a file store, with a
//! count of files per extension:
//!
//! ```csv
//! extension,file_count
//! pdf,1200
//! TIF,85
//! ```
//!
//! Each registry (and the union of all of them) is checked against the collection to
//! show how many observed extensions, and how many files, it would leave unidentified.

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};
use tabled::Tabled;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::extension::{is_numeric, normalize_extension};
use crate::registry::{ExtensionSet, RegistryCollection};

/// Label of the row covering the union of all registries
pub const ALL_REGISTRIES: &str = "_ALL_";

#[derive(Debug, Deserialize)]
struct CollectionRecord {
    extension: String,
    file_count: u64,
}

/// Observed extensions with their file counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    counts: BTreeMap<String, u64>,
    total: u64,
}

impl Collection {
    /// Reads an `extension,file_count` CSV.
    ///
    /// Rows whose extension contains a space or is purely numeric are dropped with a
    /// warning. Repeated extensions have their counts summed.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut collection = Self::default();
        let mut csv = csv::Reader::from_reader(reader);
        for record in csv.deserialize() {
            let record: CollectionRecord = record?;
            collection.add(&record.extension, record.file_count);
        }
        Ok(collection)
    }

    /// Adds `file_count` files with extension `ext`, normalized first.
    ///
    /// Returns false, with a warning, if the extension contains a space, is malformed
    /// or is purely numeric.
    pub fn add(&mut self, ext: &str, file_count: u64) -> bool {
        let raw = ext.trim();
        if raw.contains(' ') {
            warn!(extension = raw, "dropping extension containing a space");
            return false;
        }
        let Some(ext) = normalize_extension(raw) else {
            warn!(extension = raw, "dropping malformed extension");
            return false;
        };
        if is_numeric(&ext) {
            warn!(extension = %ext, "dropping extension that is just a number");
            return false;
        }
        debug!(extension = %ext, file_count, "collection extension");
        *self.counts.entry(ext).or_insert(0) += file_count;
        self.total += file_count;
        true
    }

    /// Number of distinct extensions
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Total number of files over all extensions
    #[inline]
    pub fn total_files(&self) -> u64 {
        self.total
    }

    fn coverage<F>(&self, source: &str, known: F) -> CoverageRow
    where
        F: Fn(&str) -> bool,
    {
        let mut row = CoverageRow {
            source: source.to_string(),
            common: 0,
            missing: 0,
            missing_file_count: 0,
            collection_file_count: self.total,
        };
        for (ext, count) in &self.counts {
            if known(ext) {
                row.common += 1;
            } else {
                row.missing += 1;
                row.missing_file_count += count;
            }
        }
        row
    }
}

/// Coverage of the collection by one registry, or by all of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct CoverageRow {
    pub source: String,
    /// Collection extensions the registry records
    pub common: usize,
    /// Collection extensions the registry lacks
    pub missing: usize,
    /// Files whose extension the registry lacks
    pub missing_file_count: u64,
    /// Files in the whole collection
    pub collection_file_count: u64,
}

/// Compares every registry, largest first, and then their union against `collection`
pub fn compare(registries: &RegistryCollection, collection: &Collection) -> Result<Vec<CoverageRow>> {
    if collection.is_empty() {
        return Err(Error::EmptyInput(
            "collection contains no usable extensions".to_string(),
        ));
    }

    let mut rows: Vec<CoverageRow> = registries
        .ranked()
        .into_iter()
        .map(|(name, set): (&str, &ExtensionSet)| collection.coverage(name, |ext| set.contains(ext)))
        .collect();

    let union = registries.union();
    rows.push(collection.coverage(ALL_REGISTRIES, |ext| union.contains(ext)));
    Ok(rows)
}
