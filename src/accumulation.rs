//! Species accumulation over registries.
//!
//! Each registry is treated as one sample of the unknown population of file formats,
//! with extensions as the observed species. Registries are accumulated largest first
//! (ties broken by name), keeping a running union of everything seen so far:
//!
//! | source   | num_exts | num_uniq_exts | total_exts | total_uniq_exts |
//! |----------|----------|---------------|------------|-----------------|
//! | B        | 4        | 2             | 4          | 4               |
//! | A        | 3        | 1             | 7          | 5               |
//!
//! `num_uniq_exts` is global: it counts extensions recorded by no other registry in
//! the collection, regardless of accumulation order. The running totals depend on the
//! order, but the final `total_uniq_exts` is always the size of the full union.

use std::collections::{HashMap, HashSet};
use std::hash::BuildHasherDefault;

use serde::Serialize;
use tabled::Tabled;
use tracing::{debug, info};
use wyhash::WyHash;

use crate::error::{Error, Result};
use crate::registry::RegistryCollection;

type WyBuildHasher = BuildHasherDefault<WyHash>;

/// One row of the accumulation table
#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct AccumulationRow {
    /// Registry name
    pub source: String,
    /// Size of this registry's own extension set
    pub num_exts: usize,
    /// Extensions recorded by this registry and no other
    pub num_uniq_exts: usize,
    /// `num_uniq_exts / num_exts * 100`
    #[tabled(display_with = "display_percent")]
    pub percent_uniq_exts: f64,
    /// Running sum of `num_exts` up to and including this row
    pub total_exts: usize,
    /// Size of the running union up to and including this row
    pub total_uniq_exts: usize,
    /// Extensions this registry added to the running union
    pub added_uniq_exts: usize,
    /// Sorted extensions recorded by this registry and no other
    #[tabled(skip)]
    pub uniq_exts: Vec<String>,
}

fn display_percent(value: &f64) -> String {
    format!("{value:.2}")
}

/// Ordered accumulation table, one row per registry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AccumulationTable {
    rows: Vec<AccumulationRow>,
}

impl AccumulationTable {
    /// Rows in accumulation order
    #[inline]
    pub fn rows(&self) -> &[AccumulationRow] {
        &self.rows
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cumulative sample sizes (`total_exts`), the x series of the curve
    pub fn total_exts(&self) -> Vec<usize> {
        self.rows.iter().map(|row| row.total_exts).collect()
    }

    /// Cumulative distinct extensions (`total_uniq_exts`), the y series of the curve
    pub fn total_uniq_exts(&self) -> Vec<usize> {
        self.rows.iter().map(|row| row.total_uniq_exts).collect()
    }

    /// Cardinality of the union of all registries
    pub fn union_cardinality(&self) -> usize {
        self.rows.last().map_or(0, |row| row.total_uniq_exts)
    }

    pub fn into_rows(self) -> Vec<AccumulationRow> {
        self.rows
    }
}

impl<'a> IntoIterator for &'a AccumulationTable {
    type Item = &'a AccumulationRow;
    type IntoIter = std::slice::Iter<'a, AccumulationRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Builds the accumulation table for `registries`.
///
/// Fails with [`Error::EmptyInput`] when the collection has no registries or when any
/// registry has an empty extension set; use
/// [`RegistryCollection::without_empty`] beforehand to drop those instead.
pub fn accumulate(registries: &RegistryCollection) -> Result<AccumulationTable> {
    if registries.is_empty() {
        return Err(Error::EmptyInput(
            "registry collection contains no registries".to_string(),
        ));
    }
    if let Some((name, _)) = registries.iter().find(|(_, set)| set.is_empty()) {
        return Err(Error::EmptyInput(format!(
            "registry '{name}' has no extensions"
        )));
    }

    // number of registries recording each extension
    let mut occurrences: HashMap<&str, usize, WyBuildHasher> = HashMap::default();
    for (_, set) in registries {
        for ext in set {
            *occurrences.entry(ext.as_str()).or_insert(0) += 1;
        }
    }

    let mut union: HashSet<&str, WyBuildHasher> =
        HashSet::with_capacity_and_hasher(occurrences.len(), WyBuildHasher::default());
    let mut total_exts = 0;
    let mut rows = Vec::with_capacity(registries.len());

    for (name, set) in registries.ranked() {
        let before = union.len();
        union.extend(set.iter().map(String::as_str));
        total_exts += set.len();

        let uniq_exts: Vec<String> = set
            .iter()
            .filter(|ext| occurrences.get(ext.as_str()) == Some(&1))
            .cloned()
            .collect();
        let num_uniq_exts = uniq_exts.len();
        let row = AccumulationRow {
            source: name.to_string(),
            num_exts: set.len(),
            num_uniq_exts,
            percent_uniq_exts: 100.0 * num_uniq_exts as f64 / set.len() as f64,
            total_exts,
            total_uniq_exts: union.len(),
            added_uniq_exts: union.len() - before,
            uniq_exts,
        };
        debug!(
            source = %row.source,
            num_exts = row.num_exts,
            num_uniq_exts = row.num_uniq_exts,
            total_exts = row.total_exts,
            total_uniq_exts = row.total_uniq_exts,
            "accumulated registry"
        );
        rows.push(row);
    }

    info!(
        registries = rows.len(),
        total_exts,
        distinct_exts = union.len(),
        "built accumulation table"
    );
    Ok(AccumulationTable { rows })
}
