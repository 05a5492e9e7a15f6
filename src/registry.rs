//! Registry data model.
//!
//! A [`RegistryCollection`] maps each registry name to the [`ExtensionSet`] it records.
//! Both are backed by ordered collections, so iteration order never depends on hashing
//! or on the order in which the source document listed things.

use std::cmp::Reverse;
use std::collections::{btree_map, btree_set, BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, info};

use crate::extension::normalize_extension;

/// Set of normalized, de-duplicated extensions recorded by one registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtensionSet(BTreeSet<String>);

impl ExtensionSet {
    /// Creates an empty `ExtensionSet`
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from raw registry entries.
    ///
    /// Returns the set together with the number of entries discarded as malformed.
    pub fn from_raw<I, S>(entries: I) -> (Self, usize)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        let mut dropped = 0;
        for entry in entries {
            if !set.insert_raw(entry.as_ref()) {
                dropped += 1;
            }
        }
        (set, dropped)
    }

    /// Normalizes and inserts a raw entry. Returns false if the entry was malformed.
    pub fn insert_raw(&mut self, raw: &str) -> bool {
        match normalize_extension(raw) {
            Some(ext) => {
                self.0.insert(ext);
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn contains(&self, ext: &str) -> bool {
        self.0.contains(ext)
    }

    /// Iterates extensions in ascending order
    pub fn iter(&self) -> btree_set::Iter<'_, String> {
        self.0.iter()
    }
}

impl<'a> IntoIterator for &'a ExtensionSet {
    type Item = &'a String;
    type IntoIter = btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<S: AsRef<str>> FromIterator<S> for ExtensionSet {
    /// Collects raw entries, silently discarding malformed ones
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_raw(iter).0
    }
}

/// Mapping from registry name to the extensions it records.
///
/// Loaded once per analysis run and not mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RegistryCollection(BTreeMap<String, ExtensionSet>);

impl RegistryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a registry, returning the set it replaced (if any)
    pub fn insert(&mut self, name: impl Into<String>, set: ExtensionSet) -> Option<ExtensionSet> {
        self.0.insert(name.into(), set)
    }

    /// Returns the set for `name`, creating an empty one if needed
    pub(crate) fn entry(&mut self, name: &str) -> &mut ExtensionSet {
        self.0.entry(name.to_string()).or_default()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&ExtensionSet> {
        self.0.get(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates registries in ascending name order
    pub fn iter(&self) -> btree_map::Iter<'_, String, ExtensionSet> {
        self.0.iter()
    }

    /// Returns registries ordered by descending set size, ties broken by ascending name
    pub fn ranked(&self) -> Vec<(&str, &ExtensionSet)> {
        let mut ranked: Vec<(&str, &ExtensionSet)> =
            self.0.iter().map(|(name, set)| (name.as_str(), set)).collect();
        ranked.sort_by_key(|&(name, set)| (Reverse(set.len()), name));
        ranked
    }

    /// Union of every registry's extensions
    pub fn union(&self) -> BTreeSet<&str> {
        self.0
            .values()
            .flat_map(|set| set.iter().map(String::as_str))
            .collect()
    }

    /// Returns a copy without registries that recorded no usable extensions
    pub fn without_empty(&self) -> Self {
        let mut kept = Self::new();
        for (name, set) in &self.0 {
            if set.is_empty() {
                info!(registry = %name, "skipping registry without extensions");
                continue;
            }
            kept.insert(name.clone(), set.clone());
        }
        debug!(kept = kept.len(), total = self.len(), "filtered empty registries");
        kept
    }
}

impl<'a> IntoIterator for &'a RegistryCollection {
    type Item = (&'a String, &'a ExtensionSet);
    type IntoIter = btree_map::Iter<'a, String, ExtensionSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Into<String>> FromIterator<(K, ExtensionSet)> for RegistryCollection {
    fn from_iter<I: IntoIterator<Item = (K, ExtensionSet)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
